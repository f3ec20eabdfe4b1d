//! Startup Window Snapshot
//!
//! The startup window sits on top of live boot code. Before the builder
//! touches it, the original bytes are copied into a caller-supplied buffer;
//! once every AP has checked in, orchestration writes them back with
//! [`MemoryContentCopy::restore`].

use crate::error::{bug_check, LaunchFault};
use crate::mm::PhysicalRegion;

/// Saved contents of `base..base + len`
#[derive(Debug)]
pub struct MemoryContentCopy<'a> {
    buffer: &'a mut [u8],
    base: u64,
    len: usize,
}

impl<'a> MemoryContentCopy<'a> {
    /// Copies `len` bytes at `base` out of `region` into `buffer`.
    ///
    /// The first `len` bytes of `buffer` are cleared before the copy. A
    /// buffer shorter than `len` is a launch fault.
    pub fn capture(buffer: &'a mut [u8], region: &PhysicalRegion, base: u64, len: usize) -> Self {
        if buffer.len() < len {
            bug_check(LaunchFault::SnapshotTooSmall {
                have: buffer.len(),
                need: len,
            });
        }

        let saved = &mut buffer[..len];
        saved.fill(0);
        region.read_bytes(base, saved);

        Self { buffer, base, len }
    }

    /// Physical address of the first saved byte
    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The saved bytes
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Writes the saved bytes back into `region`.
    pub fn restore(self, region: &mut PhysicalRegion) {
        region.write_bytes(self.base, &self.buffer[..self.len]);
        log::debug!("restored {:#x} bytes at {:#x}", self.len, self.base);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::OffsetTranslator;

    const BASE: u64 = 0x76CF_FF00;

    fn region_over(buf: &mut [u8]) -> PhysicalRegion {
        let translator = OffsetTranslator::between(BASE, buf.as_mut_ptr());
        // SAFETY: the buffer outlives the region in every test
        unsafe { PhysicalRegion::new(BASE, buf.len(), &translator) }
    }

    #[test]
    fn test_capture_overwrite_restore() {
        let mut memory: Vec<u8> = (0..=0xFF).collect();
        let original = memory.clone();
        let mut region = region_over(&mut memory);

        let mut buffer = [0xEEu8; 0x100];
        let copy = MemoryContentCopy::capture(&mut buffer, &region, BASE + 0x70, 0x90);
        assert_eq!(copy.bytes(), &original[0x70..]);

        region.fill(BASE + 0x70, 0x90, 0);
        region.write_bytes(BASE + 0xF0, &[0xE9, 0xDF, 0xFF]);
        copy.restore(&mut region);

        drop(region);
        assert_eq!(memory, original);
    }

    #[test]
    fn test_buffer_tail_untouched() {
        let mut memory = [0x11u8; 0x20];
        let region = region_over(&mut memory);
        let mut buffer = [0xEEu8; 0x18];

        let copy = MemoryContentCopy::capture(&mut buffer, &region, BASE, 0x10);
        assert_eq!(copy.len(), 0x10);
        drop(copy);
        assert_eq!(&buffer[..0x10], &[0x11; 0x10]);
        assert_eq!(&buffer[0x10..], &[0xEE; 8]);
    }

    #[test]
    #[should_panic(expected = "snapshot buffer")]
    fn test_short_buffer_traps() {
        let mut memory = [0u8; 0x100];
        let region = region_over(&mut memory);
        let mut buffer = [0u8; 0x80];
        let _ = MemoryContentCopy::capture(&mut buffer, &region, BASE, 0x90);
    }
}
