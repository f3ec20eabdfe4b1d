//! AP Misc MSR Sync
//!
//! Besides the fixed MTRRs, a handful of MSRs must match the BSP on every
//! core. Orchestration names them in a terminator-delimited list with a
//! mask of the bits that matter; the BSP captures its values and each AP
//! merges the masked bits into its own registers.

use super::global_data::ApLaunchGlobalData;
use super::list::{ListEntry, RegisterList, CPU_LIST_TERMINAL};
use crate::hal::Cpu;

/// One MSR to replicate
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsrSyncEntry {
    pub msr_addr: u32,
    pub msr_data: u64,
    /// Bits of `msr_data` copied to the AP
    pub msr_mask: u64,
}

impl MsrSyncEntry {
    pub const TERMINAL: Self = Self::new(CPU_LIST_TERMINAL, 0);

    /// Entry for `msr_addr`, value captured later
    pub const fn new(msr_addr: u32, msr_mask: u64) -> Self {
        Self {
            msr_addr,
            msr_data: 0,
            msr_mask,
        }
    }
}

impl ListEntry for MsrSyncEntry {
    #[inline]
    fn msr_addr(&self) -> u32 {
        self.msr_addr
    }
}

/// The AP misc MSR list
pub type MsrSyncList<'a> = RegisterList<'a, MsrSyncEntry>;

impl RegisterList<'_, MsrSyncEntry> {
    /// Stores the current processor's value of every listed MSR.
    pub fn capture<C: Cpu>(&mut self, cpu: &mut C) {
        self.for_each_mut(|entry| entry.msr_data = cpu.read_msr(entry.msr_addr));
    }

    /// Merges the masked bits of every entry into the current processor.
    pub fn replay<C: Cpu>(&self, cpu: &mut C) {
        for MsrSyncEntry {
            msr_addr,
            msr_data,
            msr_mask,
        } in self.iter()
        {
            cpu.msr_and_or(msr_addr, !msr_mask, msr_data & msr_mask);
        }
    }
}

/// Captures the BSP's misc MSRs into the list attached to `global`.
///
/// Does nothing when no list is attached.
pub fn sync_misc_msrs<C: Cpu>(global: &mut ApLaunchGlobalData, cpu: &mut C) {
    match global.msr_sync_list() {
        Some(mut list) => {
            list.capture(cpu);
            log::debug!("captured {} misc MSRs for APs", list.len());
        }
        None => log::debug!("no misc MSR sync list"),
    }
}
