//! AP Reset-Vector Trampoline
//!
//! An AP released from reset fetches its first instruction at
//! `CS:FFF0`, where the hidden CS base is the 64 KiB-aligned segment that
//! holds the startup vector. Only 16 bytes are available there, so the image
//! is split in two parts that are copied together as one blob:
//!
//! ```text
//! Jump16Bit:    AP startup code (real mode)         <- startup_vector - code_size
//!                 cli / cld
//!                 lgdt  cs:[FFF4]
//!                 CR0.PE = 1
//!                 jmp   0x10:entry                  (entry patched at build time)
//! ResetVector:  jmp near Jump16Bit                  <- startup_vector (IP = FFF0)
//!               GDT pointer slot (10 bytes)         <- startup_vector + 4
//!               launch counter (2 bytes)            <- startup_vector + E
//! eResetVector:                                     <- startup_vector + 10
//! ```
//!
//! The image carries no absolute addresses except the far-jump target, so it
//! can be dropped into any segment.

/// A relocatable `Jump16Bit..eResetVector` blob.
#[derive(Debug, Clone, Copy)]
pub struct ApStartupImage {
    bytes: &'static [u8],
    reset_vector: usize,
    entry_slot: Option<usize>,
    needs_segment_table: bool,
}

impl ApStartupImage {
    /// Describes an image whose `ResetVector` label sits at `reset_vector`
    /// bytes into `bytes`. `entry_slot`, when present, is the offset of a
    /// 32-bit little-endian field receiving the AP entry point address.
    /// `needs_segment_table` marks code that loads the GDT pointer at
    /// `ResetVector + 4`, which only protected-mode launches install.
    pub const fn new(
        bytes: &'static [u8],
        reset_vector: usize,
        entry_slot: Option<usize>,
        needs_segment_table: bool,
    ) -> Self {
        Self {
            bytes,
            reset_vector,
            entry_slot,
            needs_segment_table,
        }
    }

    /// The whole blob, `Jump16Bit..eResetVector`
    #[inline]
    pub const fn bytes(&self) -> &'static [u8] {
        self.bytes
    }

    /// `eResetVector - Jump16Bit`
    #[inline]
    pub const fn stub_size(&self) -> usize {
        self.bytes.len()
    }

    /// `eResetVector - ResetVector`, zero if the label lies past the blob
    #[inline]
    pub const fn reset_vector_size(&self) -> usize {
        self.bytes.len().saturating_sub(self.reset_vector)
    }

    /// `ResetVector - Jump16Bit`: bytes of startup code placed below the vector
    #[inline]
    pub const fn code_size(&self) -> usize {
        self.reset_vector
    }

    /// Offset of the entry point field within the blob
    #[inline]
    pub const fn entry_slot(&self) -> Option<usize> {
        self.entry_slot
    }

    /// Whether the startup code loads the GDT published in the window
    #[inline]
    pub const fn needs_segment_table(&self) -> bool {
        self.needs_segment_table
    }

    /// Whether the `ResetVector` label and the entry slot lie inside the blob
    pub const fn is_well_formed(&self) -> bool {
        let entry_fits = match self.entry_slot {
            Some(slot) => slot + 4 <= self.bytes.len(),
            None => true,
        };
        self.reset_vector <= self.bytes.len() && entry_fits
    }

    /// Physical address the blob is copied to so that `ResetVector` lands
    /// exactly on `startup_vector`
    #[inline]
    pub const fn load_address(&self, startup_vector: u64) -> u64 {
        startup_vector + self.reset_vector_size() as u64 - self.stub_size() as u64
    }
}

/// Offset of the far-jump target inside [`AP_STARTUP_CODE`]
const ENTRY_SLOT: usize = 21;

/// Offset of `ResetVector` inside [`AP_STARTUP_CODE`]
const RESET_VECTOR: usize = 30;

/// Default startup code and reset vector.
#[rustfmt::skip]
static AP_STARTUP_CODE: [u8; 46] = [
    // Jump16Bit: CS:FFF0 - 0x1E, real mode
    0xFA,                                     // cli
    0xFC,                                     // cld
    0x66, 0x2E, 0x0F, 0x01, 0x16, 0xF4, 0xFF, // lgdt dword cs:[0xFFF4]
    0x0F, 0x20, 0xC0,                         // mov eax, cr0
    0x66, 0x83, 0xC8, 0x01,                   // or eax, 1
    0x0F, 0x22, 0xC0,                         // mov cr0, eax
    0x66, 0xEA, 0x00, 0x00, 0x00, 0x00,       // jmp dword 0x10:entry
    0x10, 0x00,
    0xF4,                                     // hlt
    0xEB, 0xFD,                               // jmp short hlt

    // ResetVector: CS:FFF0
    0xE9, 0xDF, 0xFF,                         // jmp near Jump16Bit
    0x90,                                     // nop
    0x00, 0x00, 0x00, 0x00, 0x00,             // GDT pointer: limit, base
    0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00,                               // launch counter
];

/// Image installed by default; enters protected mode through the window's GDT
pub static AP_STARTUP_IMAGE: ApStartupImage =
    ApStartupImage::new(&AP_STARTUP_CODE, RESET_VECTOR, Some(ENTRY_SLOT), true);
