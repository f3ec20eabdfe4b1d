//! Launch Throttle
//!
//! APs are released one at a time. Each AP increments a 16-bit counter in
//! the startup window once its private setup is done, and orchestration
//! waits for the counter to reach the number of APs released so far before
//! releasing the next one. The builder only publishes the counter, zeroed;
//! polling belongs to orchestration.

use core::sync::atomic::{AtomicU16, Ordering};

use crate::mm::Translate;

/// The launch counter at `startup_vector + 0xE`
#[derive(Debug, Clone, Copy)]
pub struct HandshakeLocation<'a> {
    addr: u64,
    counter: &'a AtomicU16,
}

impl<'a> HandshakeLocation<'a> {
    /// Wraps the counter at physical `addr`, reachable through `ptr`.
    ///
    /// # Safety
    /// `ptr` must be 2-byte aligned and valid for reads and writes for `'a`.
    pub unsafe fn from_ptr(addr: u64, ptr: *mut u16) -> Self {
        debug_assert!(ptr as usize % 2 == 0, "unaligned launch counter");
        Self {
            addr,
            // SAFETY: caller guarantees alignment and validity
            counter: unsafe { AtomicU16::from_ptr(ptr) },
        }
    }

    /// The counter as seen from an AP, given the published address.
    ///
    /// # Safety
    /// `translator` must map `addr` for `'a`; see [`Self::from_ptr`].
    pub unsafe fn at<T: Translate>(addr: u64, translator: &T) -> Self {
        // SAFETY: forwarded to the caller
        unsafe { Self::from_ptr(addr, translator.translate(addr).cast()) }
    }

    /// Physical address of the counter
    pub fn address(&self) -> u64 {
        self.addr
    }

    /// Number of APs that have checked in
    pub fn launched(&self) -> u16 {
        self.counter.load(Ordering::Acquire)
    }

    /// Clears the counter
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Release);
    }

    /// AP side: report private setup as done
    pub fn signal(&self) -> u16 {
        self.counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Orchestration side: spin until `expected` APs have checked in.
    ///
    /// There is no timeout; an AP that never answers hangs the boot.
    pub fn wait_for(&self, expected: u16) {
        while self.launched() < expected {
            core::hint::spin_loop();
        }
        log::debug!("{} APs checked in at {:#x}", expected, self.addr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mm::OffsetTranslator;

    #[test]
    fn test_signal_and_wait() {
        let mut cell = 0u16;
        // SAFETY: `cell` is aligned and outlives the handshake
        let handshake = unsafe { HandshakeLocation::from_ptr(0x76CF_FFFE, &mut cell) };

        assert_eq!(handshake.launched(), 0);
        assert_eq!(handshake.signal(), 1);
        assert_eq!(handshake.signal(), 2);
        handshake.wait_for(2);
        handshake.reset();
        assert_eq!(handshake.launched(), 0);
        assert_eq!(handshake.address(), 0x76CF_FFFE);
    }

    #[test]
    fn test_ap_view_through_translator() {
        let mut memory = [0u16; 8];
        let translator = OffsetTranslator::between(0x9_0000, memory.as_mut_ptr().cast());
        // SAFETY: the published address maps into `memory`
        let ap = unsafe { HandshakeLocation::at(0x9_000E, &translator) };
        ap.signal();
        assert_eq!(memory[7], 1);
    }

    #[test]
    fn test_serialized_release() {
        let mut cell = 0u16;
        // SAFETY: `cell` is aligned and outlives the handshake
        let handshake = unsafe { HandshakeLocation::from_ptr(0x1000, &mut cell) };

        std::thread::scope(|s| {
            for released in 1..=4u16 {
                s.spawn(|| {
                    handshake.signal();
                });
                handshake.wait_for(released);
            }
        });
        assert_eq!(handshake.launched(), 4);
    }
}
