//! Physical Memory Regions
//!
//! A [`PhysicalRegion`] is a typed window over `base..base + len` in physical
//! memory, reachable through a translated virtual pointer. All accessors take
//! absolute physical addresses and are bounds-checked against the window, so
//! layout offsets are computed once (see `ap::layout`) and never re-derived
//! through raw pointer arithmetic.

use core::ptr;

use crate::error::{bug_check, LaunchFault};

/// Translates a physical address into a pointer usable by the BSP.
///
/// # Safety
/// Implementors must return a pointer through which the physical byte at
/// `physical_addr` (and the bytes following it that the caller maps) can be
/// read and written.
pub unsafe trait Translate {
    /// Virtual address of `physical_addr`
    fn translate(&self, physical_addr: u64) -> *mut u8;
}

/// Physical memory is identity mapped (flat 32-bit pre-OS environment).
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

// SAFETY: physical == virtual by construction of the boot environment
unsafe impl Translate for IdentityTranslator {
    fn translate(&self, physical_addr: u64) -> *mut u8 {
        physical_addr as usize as *mut u8
    }
}

/// All physical memory is direct-mapped at a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct OffsetTranslator {
    offset: usize,
}

impl OffsetTranslator {
    /// Creates a translator adding `offset` (wrapping) to physical addresses.
    pub const fn new(offset: usize) -> Self {
        Self { offset }
    }

    /// Translator that maps `physical_base` onto `virtual_base`.
    pub fn between(physical_base: u64, virtual_base: *mut u8) -> Self {
        Self::new((virtual_base as usize).wrapping_sub(physical_base as usize))
    }

    /// The offset applied to physical addresses
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

// SAFETY: the creator of the translator vouches for the direct map
unsafe impl Translate for OffsetTranslator {
    fn translate(&self, physical_addr: u64) -> *mut u8 {
        (physical_addr as usize).wrapping_add(self.offset) as *mut u8
    }
}

/// Bounds-checked view over a physical address range.
#[derive(Debug)]
pub struct PhysicalRegion {
    base: u64,
    len: usize,
    virt: *mut u8,
}

impl PhysicalRegion {
    /// Maps `base..base + len` through `translator`.
    ///
    /// # Safety
    /// The whole range must be backed by memory the caller may read and
    /// write for as long as the region exists, and nothing else may hold a
    /// reference into it.
    pub unsafe fn new<T: Translate>(base: u64, len: usize, translator: &T) -> Self {
        Self {
            base,
            len,
            virt: translator.translate(base),
        }
    }

    /// First physical address of the region
    #[inline]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// Length of the region in bytes
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last physical address of the region
    #[inline]
    pub const fn end(&self) -> u64 {
        self.base + self.len as u64
    }

    /// Translated address of [`Self::base`]
    #[inline]
    pub fn as_ptr(&self) -> *mut u8 {
        self.virt
    }

    /// Whether `addr..addr + len` lies entirely inside the region
    pub fn contains(&self, addr: u64, len: usize) -> bool {
        match addr.checked_add(len as u64) {
            Some(end) => addr >= self.base && end <= self.end(),
            None => false,
        }
    }

    /// Whether `base..base + len` shares at least one byte with the region
    pub fn overlaps(&self, base: u64, len: u64) -> bool {
        len != 0 && self.len != 0 && base < self.end() && self.base < base.saturating_add(len)
    }

    /// Pointer to `addr`, after checking that `len` bytes from it are mapped.
    pub fn ptr_at(&self, addr: u64, len: usize) -> *mut u8 {
        if !self.contains(addr, len) {
            bug_check(LaunchFault::OutOfBounds {
                addr,
                len,
                base: self.base,
                size: self.len,
            });
        }
        self.virt.wrapping_add((addr - self.base) as usize)
    }

    /// Copy `buf.len()` bytes starting at `addr` out of the region
    pub fn read_bytes(&self, addr: u64, buf: &mut [u8]) {
        let src = self.ptr_at(addr, buf.len());
        // SAFETY: `ptr_at` checked the range; `new` guarantees it is backed
        unsafe { ptr::copy_nonoverlapping(src, buf.as_mut_ptr(), buf.len()) }
    }

    /// Copy `bytes` into the region at `addr`
    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) {
        let dst = self.ptr_at(addr, bytes.len());
        // SAFETY: `ptr_at` checked the range; `new` guarantees it is backed
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len()) }
    }

    /// Set `len` bytes starting at `addr` to `value`
    pub fn fill(&mut self, addr: u64, len: usize, value: u8) {
        let dst = self.ptr_at(addr, len);
        // SAFETY: `ptr_at` checked the range; `new` guarantees it is backed
        unsafe { ptr::write_bytes(dst, value, len) }
    }

    /// Read a plain value at `addr` (no alignment requirement)
    pub fn read<T: Copy>(&self, addr: u64) -> T {
        let src = self.ptr_at(addr, core::mem::size_of::<T>());
        // SAFETY: range checked; `T: Copy` has no drop glue
        unsafe { ptr::read_unaligned(src.cast::<T>()) }
    }

    /// Write a plain value at `addr` (no alignment requirement)
    pub fn write<T: Copy>(&mut self, addr: u64, value: T) {
        let dst = self.ptr_at(addr, core::mem::size_of::<T>());
        // SAFETY: range checked; `T: Copy` has no drop glue
        unsafe { ptr::write_unaligned(dst.cast::<T>(), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_over(buf: &mut [u8], base: u64) -> PhysicalRegion {
        let translator = OffsetTranslator::between(base, buf.as_mut_ptr());
        // SAFETY: the buffer outlives the region in every test
        unsafe { PhysicalRegion::new(base, buf.len(), &translator) }
    }

    #[test]
    fn test_offset_translation() {
        let mut buf = [0u8; 16];
        let translator = OffsetTranslator::between(0x7000_0000, buf.as_mut_ptr());
        assert_eq!(translator.translate(0x7000_0004), buf.as_mut_ptr().wrapping_add(4));
    }

    #[test]
    fn test_identity_translation() {
        assert_eq!(IdentityTranslator.translate(0x76CF_FFF0) as usize, 0x76CF_FFF0);
    }

    #[test]
    fn test_read_write_absolute() {
        let mut buf = [0u8; 32];
        let mut region = region_over(&mut buf, 0x1000);

        region.write::<u32>(0x1003, 0xDEAD_BEEF);
        region.write_bytes(0x1010, &[1, 2, 3]);
        region.fill(0x1018, 4, 0xAA);

        assert_eq!(region.read::<u32>(0x1003), 0xDEAD_BEEF);
        let mut out = [0u8; 3];
        region.read_bytes(0x1010, &mut out);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(region.read::<u32>(0x1018), 0xAAAA_AAAA);
        drop(region);
        assert_eq!(&buf[3..7], &0xDEAD_BEEFu32.to_le_bytes());
    }

    #[test]
    fn test_contains_and_overlaps() {
        let mut buf = [0u8; 0x10];
        let region = region_over(&mut buf, 0x2000);

        assert!(region.contains(0x2000, 0x10));
        assert!(!region.contains(0x2001, 0x10));
        assert!(!region.contains(0x1FFF, 1));
        assert!(!region.contains(u64::MAX, 2));

        assert!(region.overlaps(0x200F, 1));
        assert!(region.overlaps(0x1FF0, 0x11));
        assert!(!region.overlaps(0x2010, 0x100));
        assert!(!region.overlaps(0x1FF0, 0x10));
        assert!(!region.overlaps(0x2004, 0));
    }

    #[test]
    #[should_panic(expected = "outside region")]
    fn test_out_of_bounds_write_traps() {
        let mut buf = [0u8; 8];
        let mut region = region_over(&mut buf, 0x3000);
        region.write::<u64>(0x3004, 0);
    }
}
