//! AP Fixed-MTRR Sync List
//!
//! Fixed-range MTRRs must be identical on every processor. The BSP captures
//! its own values into a terminator-delimited list, applies the platform's
//! overrides, and publishes the list; each AP replays it during setup.
//!
//! Fixed MTRRs carry the RdDram/WrDram extension bits, which are only
//! readable and writable while `SYS_CFG.MtrrFixDramModEn` is set. Every walk
//! that touches the hardware runs inside [`with_fixed_mtrr_mod_enabled`].

use super::list::{ListEntry, RegisterList};
use crate::config::CcxInputBlock;
use crate::hal::msreg::{self, mtrr, SysCfg};
use crate::hal::Cpu;

pub use super::list::CPU_LIST_TERMINAL;

/// One fixed MTRR to replicate
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MtrrSetting {
    /// Fixed-range MTRR address
    pub msr_addr: u32,
    /// MTRR value
    pub msr_data: u64,
}

impl MtrrSetting {
    /// List terminator
    pub const TERMINAL: Self = Self::new(CPU_LIST_TERMINAL, 0);

    pub const fn new(msr_addr: u32, msr_data: u64) -> Self {
        Self { msr_addr, msr_data }
    }
}

impl ListEntry for MtrrSetting {
    #[inline]
    fn msr_addr(&self) -> u32 {
        self.msr_addr
    }
}

/// Every fixed-range MTRR followed by the terminator. Values are filled in
/// from the BSP at launch time.
pub const DEFAULT_AP_MTRR_SETTINGS: [MtrrSetting; 12] = [
    MtrrSetting::new(mtrr::FIX64K_00000, 0),
    MtrrSetting::new(mtrr::FIX16K_80000, 0),
    MtrrSetting::new(mtrr::FIX16K_A0000, 0),
    MtrrSetting::new(mtrr::FIX4K_C0000, 0),
    MtrrSetting::new(mtrr::FIX4K_C8000, 0),
    MtrrSetting::new(mtrr::FIX4K_D0000, 0),
    MtrrSetting::new(mtrr::FIX4K_D8000, 0),
    MtrrSetting::new(mtrr::FIX4K_E0000, 0),
    MtrrSetting::new(mtrr::FIX4K_E8000, 0),
    MtrrSetting::new(mtrr::FIX4K_F0000, 0),
    MtrrSetting::new(mtrr::FIX4K_F8000, 0),
    MtrrSetting::TERMINAL,
];

/// Runs `f` with `SYS_CFG.MtrrFixDramModEn` set, clearing it afterwards.
pub fn with_fixed_mtrr_mod_enabled<C: Cpu, R>(cpu: &mut C, f: impl FnOnce(&mut C) -> R) -> R {
    cpu.msr_or(msreg::SYS_CFG, SysCfg::MTRR_FIX_DRAM_MOD_EN.bits());
    let result = f(cpu);
    cpu.msr_and(msreg::SYS_CFG, !SysCfg::MTRR_FIX_DRAM_MOD_EN.bits());
    result
}

/// The AP fixed-MTRR list
pub type MtrrSyncList<'a> = RegisterList<'a, MtrrSetting>;

impl RegisterList<'_, MtrrSetting> {
    /// Overwrites every value with the current processor's register.
    ///
    /// Must be called with `SYS_CFG.MtrrFixDramModEn` set.
    pub fn load_from<C: Cpu>(&mut self, cpu: &mut C) {
        self.for_each_mut(|entry| entry.msr_data = cpu.read_msr(entry.msr_addr));
    }

    /// Captures the BSP's fixed MTRRs, then applies configured overrides.
    pub fn capture<C: Cpu>(&mut self, cpu: &mut C, input: &CcxInputBlock) {
        with_fixed_mtrr_mod_enabled(cpu, |cpu| {
            self.load_from(cpu);
            update_ap_mtrr_settings(self, input);
        });
    }

    /// Programs every entry into the current processor (AP side).
    pub fn replay<C: Cpu>(&self, cpu: &mut C) {
        with_fixed_mtrr_mod_enabled(cpu, |cpu| {
            for MtrrSetting { msr_addr, msr_data } in self.iter() {
                cpu.write_msr(msr_addr, msr_data);
            }
        });
    }
}

/// Applies the platform's fixed-MTRR overrides to a captured list.
pub fn update_ap_mtrr_settings(list: &mut MtrrSyncList<'_>, input: &CcxInputBlock) {
    list.for_each_mut(|entry| {
        if let Some(value) = input.fixed_mtrr_overrides.get(entry.msr_addr) {
            entry.msr_data = value;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{CpuOp, MockCpu};

    const POISON: u32 = 0xDEAD;

    fn bsp() -> MockCpu {
        let mut cpu = MockCpu::new().with_msr(msreg::SYS_CFG, 0x0004_0000);
        for (i, msr) in mtrr::FIXED.iter().enumerate() {
            cpu = cpu.with_msr(*msr, 0x1E1E_1E1E_1E1E_1E00 | i as u64);
        }
        cpu
    }

    #[test]
    fn test_empty_list() {
        let mut entries = [MtrrSetting::TERMINAL, MtrrSetting::new(POISON, 0)];
        let mut cpu = bsp();
        let mut list = MtrrSyncList::from_slice(&mut entries);
        list.capture(&mut cpu, &CcxInputBlock::default());

        assert_eq!(list.len(), 0);
        assert_eq!(list.byte_size(), 12);
        assert_eq!(cpu.reads(), [msreg::SYS_CFG, msreg::SYS_CFG]);
        assert_eq!(cpu.msr(msreg::SYS_CFG), 0x0004_0000);
    }

    #[test]
    fn test_single_entry_stops_at_terminal() {
        let mut entries = [
            MtrrSetting::new(mtrr::FIX64K_00000, 0),
            MtrrSetting::TERMINAL,
            MtrrSetting::new(POISON, 0x55),
        ];
        let mut cpu = bsp();
        MtrrSyncList::from_slice(&mut entries).capture(&mut cpu, &CcxInputBlock::default());

        assert_eq!({ entries[0].msr_data }, 0x1E1E_1E1E_1E1E_1E00);
        assert_eq!({ entries[2].msr_data }, 0x55);
        assert!(!cpu.reads().contains(&POISON));
    }

    #[test]
    fn test_full_list_with_mod_enable_bracket() {
        let mut entries = DEFAULT_AP_MTRR_SETTINGS;
        let mut cpu = bsp();
        MtrrSyncList::from_slice(&mut entries).capture(&mut cpu, &CcxInputBlock::default());

        for (i, entry) in entries[..11].iter().enumerate() {
            assert_eq!({ entry.msr_data }, 0x1E1E_1E1E_1E1E_1E00 | i as u64);
        }

        let mod_en = SysCfg::MTRR_FIX_DRAM_MOD_EN.bits();
        let first_mtrr = cpu
            .ops
            .iter()
            .position(|op| *op == CpuOp::Read(mtrr::FIX64K_00000))
            .unwrap();
        let last_mtrr = cpu
            .ops
            .iter()
            .rposition(|op| *op == CpuOp::Read(mtrr::FIX4K_F8000))
            .unwrap();
        let set = cpu
            .ops
            .iter()
            .position(|op| *op == CpuOp::Write(msreg::SYS_CFG, 0x0004_0000 | mod_en))
            .unwrap();
        let clear = cpu
            .ops
            .iter()
            .rposition(|op| *op == CpuOp::Write(msreg::SYS_CFG, 0x0004_0000))
            .unwrap();
        assert!(set < first_mtrr);
        assert!(last_mtrr < clear);
    }

    #[test]
    fn test_overrides_replace_bsp_values() {
        let mut entries = DEFAULT_AP_MTRR_SETTINGS;
        let mut input = CcxInputBlock::default();
        input.fixed_mtrr_overrides.set(mtrr::FIX16K_A0000, 0x0909_0909_0909_0909);

        MtrrSyncList::from_slice(&mut entries).capture(&mut bsp(), &input);

        assert_eq!({ entries[2].msr_data }, 0x0909_0909_0909_0909);
        assert_eq!({ entries[1].msr_data }, 0x1E1E_1E1E_1E1E_1E01);
    }

    #[test]
    fn test_replay_on_ap() {
        let mut entries = [
            MtrrSetting::new(mtrr::FIX4K_C0000, 0x0505_0505_0505_0505),
            MtrrSetting::new(mtrr::FIX4K_C8000, 0x0606_0606_0606_0606),
            MtrrSetting::TERMINAL,
        ];
        let list = MtrrSyncList::from_slice(&mut entries);
        let mut ap = MockCpu::new();
        list.replay(&mut ap);

        assert_eq!(ap.msr(mtrr::FIX4K_C0000), 0x0505_0505_0505_0505);
        assert_eq!(ap.msr(mtrr::FIX4K_C8000), 0x0606_0606_0606_0606);
        assert_eq!(ap.msr(msreg::SYS_CFG), 0);
        assert!(!ap.ops.contains(&CpuOp::Write(CPU_LIST_TERMINAL, 0)));
    }

    #[test]
    fn test_as_bytes_includes_terminal() {
        let mut entries = [MtrrSetting::new(0x250, 0x1122), MtrrSetting::TERMINAL];
        let list = MtrrSyncList::from_slice(&mut entries);
        let bytes = list.as_bytes();
        assert_eq!(bytes.len(), 24);
        assert_eq!(&bytes[0..4], &0x250u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &CPU_LIST_TERMINAL.to_le_bytes());
    }
}
