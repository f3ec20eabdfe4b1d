//! Model Specific Register Definitions
//!
//! Addresses and bit layouts of the MSRs the AP launch path reads or
//! replicates:
//!
//! - **Fixed-range MTRRs**: Cacheability of the first megabyte
//! - **SYS_CFG**: AMD system configuration (MTRR extension enables)
//! - **PATCH_LEVEL**: Loaded microcode revision

use bitflags::bitflags;

// ============================================================================
// Well-Known MSR Addresses
// ============================================================================

/// Fixed-range MTRRs
pub mod mtrr {
    /// Fixed 64K 00000-7FFFF
    pub const FIX64K_00000: u32 = 0x250;
    /// Fixed 16K 80000-9FFFF
    pub const FIX16K_80000: u32 = 0x258;
    /// Fixed 16K A0000-BFFFF
    pub const FIX16K_A0000: u32 = 0x259;
    /// Fixed 4K C0000-C7FFF
    pub const FIX4K_C0000: u32 = 0x268;
    /// Fixed 4K C8000-CFFFF
    pub const FIX4K_C8000: u32 = 0x269;
    /// Fixed 4K D0000-D7FFF
    pub const FIX4K_D0000: u32 = 0x26A;
    /// Fixed 4K D8000-DFFFF
    pub const FIX4K_D8000: u32 = 0x26B;
    /// Fixed 4K E0000-E7FFF
    pub const FIX4K_E0000: u32 = 0x26C;
    /// Fixed 4K E8000-EFFFF
    pub const FIX4K_E8000: u32 = 0x26D;
    /// Fixed 4K F0000-F7FFF
    pub const FIX4K_F0000: u32 = 0x26E;
    /// Fixed 4K F8000-FFFFF
    pub const FIX4K_F8000: u32 = 0x26F;

    /// Every fixed-range MTRR, in architectural order
    pub const FIXED: [u32; 11] = [
        FIX64K_00000,
        FIX16K_80000,
        FIX16K_A0000,
        FIX4K_C0000,
        FIX4K_C8000,
        FIX4K_D0000,
        FIX4K_D8000,
        FIX4K_E0000,
        FIX4K_E8000,
        FIX4K_F0000,
        FIX4K_F8000,
    ];
}

/// Microcode patch level
pub const PATCH_LEVEL: u32 = 0x8B;

/// AMD System Configuration
pub const SYS_CFG: u32 = 0xC001_0010;

bitflags! {
    /// SYS_CFG bits touched during AP launch
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SysCfg: u64 {
        /// Fixed MTRR RdDram/WrDram attributes enabled
        const MTRR_FIX_DRAM_EN = 1 << 18;
        /// Fixed MTRR RdDram/WrDram attributes writable
        const MTRR_FIX_DRAM_MOD_EN = 1 << 19;
        /// Variable MTRR top-of-memory enable
        const MTRR_VAR_DRAM_EN = 1 << 20;
        /// TOM2 enable
        const MTRR_TOM2_EN = 1 << 21;
    }
}
