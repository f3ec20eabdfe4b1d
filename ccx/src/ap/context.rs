//! AP Bring-Up Context
//!
//! The entry trampoline runs before an AP has a stack or any arguments, so
//! the few values it needs from the BSP live at a fixed symbol:
//! [`AP_BRING_UP_CONTEXT`]. There is one bring-up sequence per boot, hence
//! one context.

use core::sync::atomic::{AtomicU64, Ordering};

/// Values recorded for the entry trampoline
#[repr(C)]
#[derive(Debug)]
pub struct BringUpContext {
    /// Address of the shared [`ApLaunchGlobalData`](super::ApLaunchGlobalData)
    global_data: AtomicU64,
    /// BSP CR3, loaded by APs before enabling paging
    bsp_cr3: AtomicU64,
    startup_vector: AtomicU64,
}

/// Read by the entry trampoline
#[no_mangle]
pub static AP_BRING_UP_CONTEXT: BringUpContext = BringUpContext::new();

impl BringUpContext {
    pub const fn new() -> Self {
        Self {
            global_data: AtomicU64::new(0),
            bsp_cr3: AtomicU64::new(0),
            startup_vector: AtomicU64::new(0),
        }
    }

    pub fn set_global_data(&self, addr: u64) {
        self.global_data.store(addr, Ordering::Release);
    }

    pub fn set_bsp_cr3(&self, cr3: u64) {
        self.bsp_cr3.store(cr3, Ordering::Release);
    }

    pub fn set_startup_vector(&self, vector: u64) {
        self.startup_vector.store(vector, Ordering::Release);
    }

    pub fn global_data(&self) -> u64 {
        self.global_data.load(Ordering::Acquire)
    }

    pub fn bsp_cr3(&self) -> u64 {
        self.bsp_cr3.load(Ordering::Acquire)
    }

    pub fn startup_vector(&self) -> u64 {
        self.startup_vector.load(Ordering::Acquire)
    }

    /// Whether a startup region has been built this boot
    pub fn is_published(&self) -> bool {
        self.startup_vector() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish() {
        let context = BringUpContext::new();
        assert!(!context.is_published());

        context.set_global_data(0x7_1000);
        context.set_bsp_cr3(0x9C000);
        context.set_startup_vector(0x76CF_FFF0);

        assert!(context.is_published());
        assert_eq!(context.global_data(), 0x7_1000);
        assert_eq!(context.bsp_cr3(), 0x9C000);
        assert_eq!(context.startup_vector(), 0x76CF_FFF0);
    }
}
