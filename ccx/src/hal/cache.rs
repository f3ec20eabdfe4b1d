//! CPU Cache Control
//!
//! The only cache operation AP launch needs is a full writeback and
//! invalidate: awakening processors fetch the startup region before they
//! have a coherent view of the BSP's caches.

/// Write back and invalidate all cache levels
///
/// # Safety
/// Must run at CPL0. Stalls the processor for the duration of the flush.
#[inline]
pub unsafe fn wbinvd() {
    #[cfg(target_arch = "x86_64")]
    {
        core::arch::asm!("wbinvd", options(nostack));
    }
}
