//! CCX Input Configuration
//!
//! Platform inputs consumed while building the AP startup region. Parsing
//! these from the host firmware's configuration block happens elsewhere; this
//! module only defines their shape and the platform defaults.

use crate::hal::msreg::mtrr;

/// Default base of the PSP BIOS image, which hosts the AP startup window
pub const PSP_BIOS_BIN_BASE: u64 = 0x76CD_0000;

/// Default size of the PSP BIOS image
pub const PSP_BIOS_BIN_SIZE: u64 = 0x0003_0000;

/// Per fixed-range MTRR override values.
///
/// `None` keeps the value read from the BSP; `Some` replaces it in the list
/// handed to the APs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedMtrrOverrides {
    values: [Option<u64>; 11],
}

impl FixedMtrrOverrides {
    /// No overrides: APs mirror the BSP exactly
    pub const fn none() -> Self {
        Self { values: [None; 11] }
    }

    /// Overrides `msr` with `value`. Non fixed-range MSRs are ignored.
    pub fn set(&mut self, msr: u32, value: u64) -> &mut Self {
        if let Some(index) = Self::index_of(msr) {
            self.values[index] = Some(value);
        }
        self
    }

    /// Configured value for `msr`, if any
    pub fn get(&self, msr: u32) -> Option<u64> {
        Self::index_of(msr).and_then(|index| self.values[index])
    }

    fn index_of(msr: u32) -> Option<usize> {
        mtrr::FIXED.iter().position(|&fixed| fixed == msr)
    }
}

/// Inputs for the CCX AP launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcxInputBlock {
    /// Physical base of the boot-code region
    pub boot_code_base: u64,
    /// Size of the boot-code region; `base + size` must be 64 KiB aligned
    pub boot_code_size: u64,
    /// 32-bit physical address of the C-level AP entry trampoline
    pub ap_entry_point: u32,
    /// Fixed MTRR values that differ from the BSP's
    pub fixed_mtrr_overrides: FixedMtrrOverrides,
}

impl CcxInputBlock {
    pub const fn new(boot_code_base: u64, boot_code_size: u64, ap_entry_point: u32) -> Self {
        Self {
            boot_code_base,
            boot_code_size,
            ap_entry_point,
            fixed_mtrr_overrides: FixedMtrrOverrides::none(),
        }
    }
}

impl Default for CcxInputBlock {
    fn default() -> Self {
        Self::new(PSP_BIOS_BIN_BASE, PSP_BIOS_BIN_SIZE, 0)
    }
}

/// CCX class data block handed to the launch code by orchestration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CcxDataBlock {
    pub input: CcxInputBlock,
}

impl CcxDataBlock {
    pub const fn new(input: CcxInputBlock) -> Self {
        Self { input }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region() {
        let input = CcxInputBlock::default();
        assert_eq!(input.boot_code_base, 0x76CD_0000);
        assert_eq!(input.boot_code_size, 0x3_0000);
        assert_eq!(input.fixed_mtrr_overrides, FixedMtrrOverrides::none());
    }

    #[test]
    fn test_overrides_only_fixed_mtrrs() {
        let mut overrides = FixedMtrrOverrides::none();
        overrides.set(mtrr::FIX4K_E0000, 0x1818_1818_1818_1818).set(0x2FF, 6);

        assert_eq!(overrides.get(mtrr::FIX4K_E0000), Some(0x1818_1818_1818_1818));
        assert_eq!(overrides.get(mtrr::FIX64K_00000), None);
        assert_eq!(overrides.get(0x2FF), None);
    }
}
