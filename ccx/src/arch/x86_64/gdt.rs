//! AP Global Descriptor Table (GDT)
//!
//! Awakening processors leave real mode through this table. Its layout is
//! fixed: the startup code and the C-level entry trampoline load selectors by
//! number, so the entries below must not be reordered.
//!
//! | Selector | Segment |
//! |----------|---------|
//! | `0x00` | Null |
//! | `0x08` | Linear data |
//! | `0x10` | Linear code (32-bit) |
//! | `0x18` | System data |
//! | `0x20` | System code (32-bit) |
//! | `0x28` | Spare |
//! | `0x30` | System data (accessed) |
//! | `0x38` | System code (64-bit) |
//! | `0x40` | Spare |

use core::mem::size_of;

/// Linear data segment selector
pub const LINEAR_DATA_SELECTOR: u16 = 0x08;

/// Linear code segment selector, target of the startup code's far jump
pub const LINEAR_CODE_SELECTOR: u16 = 0x10;

/// 64-bit system code segment selector
pub const SYS_CODE64_SELECTOR: u16 = 0x38;

/// Descriptors installed for every AP
#[rustfmt::skip]
pub static AP_GDT_ENTRIES: [u64; 9] = [
    0x0000000000000000, // [00h] Null descriptor
    0x00CF92000000FFFF, // [08h] Linear data segment descriptor
    0x00CF9A000000FFFF, // [10h] Linear code segment descriptor
    0x00CF92000000FFFF, // [18h] System data segment descriptor
    0x00CF9A000000FFFF, // [20h] System code segment descriptor
    0x0000000000000000, // [28h] Spare segment descriptor
    0x00CF93000000FFFF, // [30h] System data segment descriptor
    0x00AF9B000000FFFF, // [38h] System code segment descriptor
    0x0000000000000000, // [40h] Spare segment descriptor
];

/// Size of the AP descriptor table in bytes
pub const AP_GDT_BYTES: usize = size_of::<[u64; 9]>();

/// Pseudo-descriptor loaded with `lgdt`
///
/// The base is stored as 64 bits; real and protected mode `lgdt` only
/// consume the low 32 of them.
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GdtDescriptor {
    /// Size of the table minus one
    pub limit: u16,
    /// Physical address of the first descriptor
    pub base: u64,
}

impl GdtDescriptor {
    /// Descriptor for a table of `len` bytes at `base`
    pub const fn new(base: u64, len: usize) -> Self {
        Self {
            limit: (len - 1) as u16,
            base,
        }
    }

    /// Descriptor for [`AP_GDT_ENTRIES`] installed at `base`
    pub const fn for_ap_gdt(base: u64) -> Self {
        Self::new(base, AP_GDT_BYTES)
    }
}

/// Byte image of [`AP_GDT_ENTRIES`] as it is laid out in memory
pub fn ap_gdt_bytes() -> [u8; AP_GDT_BYTES] {
    let mut bytes = [0u8; AP_GDT_BYTES];
    for (chunk, entry) in bytes.chunks_exact_mut(8).zip(AP_GDT_ENTRIES.iter()) {
        chunk.copy_from_slice(&entry.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_packing() {
        assert_eq!(size_of::<GdtDescriptor>(), 10);
        let desc = GdtDescriptor::for_ap_gdt(0x76CF_FF20);
        assert_eq!({ desc.limit }, 0x47);
        assert_eq!({ desc.base }, 0x76CF_FF20);
    }

    #[test]
    fn test_gdt_image() {
        let bytes = ap_gdt_bytes();
        assert_eq!(bytes.len(), 0x48);
        assert_eq!(&bytes[0x10..0x18], &0x00CF9A000000FFFFu64.to_le_bytes());
        assert_eq!(&bytes[0x38..0x40], &0x00AF9B000000FFFFu64.to_le_bytes());
    }

    #[test]
    fn test_selectors_index_code_segments() {
        let code = AP_GDT_ENTRIES[(LINEAR_CODE_SELECTOR / 8) as usize];
        assert_eq!((code >> 40) & 0xFF, 0x9A);
        let data = AP_GDT_ENTRIES[(LINEAR_DATA_SELECTOR / 8) as usize];
        assert_eq!((data >> 40) & 0xFF, 0x92);
        let long = AP_GDT_ENTRIES[(SYS_CODE64_SELECTOR / 8) as usize];
        assert_eq!((long >> 53) & 1, 1);
    }
}
