//! AP Startup Window Layout
//!
//! Every fixed offset of the startup window, relative to the startup vector:
//!
//! ```text
//! +------------------------------------+ <- vector + 0x10 (boot-code region end)
//! | launch counter (u16)               |    APs increment it when done,
//! +------------------------------------+ <- vector + 0xE    then the next one goes
//! | GDT pointer (limit u16, base u64)  |
//! +------------------------------------+ <- vector + 0x4
//! | near jump to startup code          |    first fetch
//! +------------------------------------+ <- vector = base + size - 0x10
//! | AP startup code                    |
//! +------------------------------------+ <- vector - AP_STARTUP_CODE_OFFSET
//! | (gap)                              |
//! +------------------------------------+ <- vector - BSP_GDT_OFFSET + 0x48
//! | AP GDT (9 descriptors)             |    protected mode only
//! +------------------------------------+ <- vector - BSP_GDT_OFFSET
//! | AP MTRR list copy                  |    protected mode only
//! +------------------------------------+ <- vector - BSP_MSR_OFFSET
//! ```

use crate::arch::x86_64::gdt::AP_GDT_BYTES;
use crate::error::LaunchFault;

// ============================================================================
// Constants
// ============================================================================

/// Distance from the region end back to the first fetch address
pub const STARTUP_VECTOR_BACKOFF: u64 = 0x10;

/// Room reserved below the vector for AP startup code
pub const AP_STARTUP_CODE_SIZE: usize = 0x80;

/// Offset of the startup code slot below the vector
pub const AP_STARTUP_CODE_OFFSET: u64 = AP_STARTUP_CODE_SIZE as u64;

/// Bytes saved and cleared in real mode: startup code slot plus reset vector
pub const AP_TEMP_BUFFER_SIZE: usize = AP_STARTUP_CODE_SIZE + 0x10;

/// GDT pointer, above the vector
pub const GDT_POINTER_OFFSET: u64 = 0x4;

/// Launch counter, above the vector
pub const HANDSHAKE_OFFSET: u64 = 0xE;

/// AP GDT, below the vector
pub const BSP_GDT_OFFSET: u64 = 0xD0;

/// AP MTRR list copy, below the vector
pub const BSP_MSR_OFFSET: u64 = 0x1D0;

/// Capacity of the MTRR list slot
pub const BSP_MSR_SIZE: usize = 0x100;

/// Bytes saved and cleared in protected mode: down to the MTRR slot
pub const AP_TEMP_BUFFER_SIZE_32: usize = BSP_MSR_OFFSET as usize + 0x10;

/// Size of the AP's own GDT region
pub const AP_GDT_SIZE: usize = 0x400;

/// Minimum AP stack size
pub const AP_STACK_SIZE: usize = 0x1000;

/// Windows must end on this boundary so the vector's low 16 bits are FFF0
const SEGMENT_SIZE: u64 = 0x1_0000;

// Slots must not overlap each other
const _: () = assert!(BSP_GDT_OFFSET - AP_GDT_BYTES as u64 >= AP_STARTUP_CODE_OFFSET);
const _: () = assert!(BSP_MSR_OFFSET - BSP_MSR_SIZE as u64 >= BSP_GDT_OFFSET);
const _: () = assert!(HANDSHAKE_OFFSET + 2 <= STARTUP_VECTOR_BACKOFF);
const _: () = assert!(GDT_POINTER_OFFSET + 10 <= HANDSHAKE_OFFSET);

/// Absolute addresses of every slot for one boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartupLayout {
    vector: u64,
    window_below: u64,
}

impl StartupLayout {
    /// Startup vector of a boot-code region: its last 16 bytes
    #[inline]
    pub const fn startup_vector(base: u64, size: u64) -> u64 {
        base + size - STARTUP_VECTOR_BACKOFF
    }

    /// Lays out the window at the top of `base..base + size`.
    ///
    /// The region must end on a 64 KiB boundary at or below 4 GiB and be
    /// large enough to hold the window.
    pub fn new(base: u64, size: u64, protected_mode: bool) -> Result<Self, LaunchFault> {
        let window_below = if protected_mode {
            BSP_MSR_OFFSET
        } else {
            AP_STARTUP_CODE_OFFSET
        };
        let bad = LaunchFault::BadBootCodeRegion { base, size };

        let end = base.checked_add(size).ok_or(bad)?;
        if end > 1 << 32 || end % SEGMENT_SIZE != 0 {
            return Err(bad);
        }
        if size < window_below + STARTUP_VECTOR_BACKOFF {
            return Err(LaunchFault::RegionTooSmall {
                what: "boot code",
                len: size,
                need: window_below + STARTUP_VECTOR_BACKOFF,
            });
        }

        Ok(Self {
            vector: Self::startup_vector(base, size),
            window_below,
        })
    }

    /// First fetch address of an awakening AP
    #[inline]
    pub const fn vector(&self) -> u64 {
        self.vector
    }

    /// Lowest address written by the builder
    #[inline]
    pub const fn window_base(&self) -> u64 {
        self.vector - self.window_below
    }

    /// Bytes from [`Self::window_base`] to the region end
    #[inline]
    pub const fn window_len(&self) -> usize {
        (self.window_below + STARTUP_VECTOR_BACKOFF) as usize
    }

    /// Start of the startup code slot
    #[inline]
    pub const fn startup_code(&self) -> u64 {
        self.vector - AP_STARTUP_CODE_OFFSET
    }

    #[inline]
    pub const fn gdt_pointer(&self) -> u64 {
        self.vector + GDT_POINTER_OFFSET
    }

    #[inline]
    pub const fn handshake(&self) -> u64 {
        self.vector + HANDSHAKE_OFFSET
    }

    #[inline]
    pub const fn bsp_gdt(&self) -> u64 {
        self.vector - BSP_GDT_OFFSET
    }

    #[inline]
    pub const fn bsp_msr(&self) -> u64 {
        self.vector - BSP_MSR_OFFSET
    }
}
