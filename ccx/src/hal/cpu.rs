//! BSP Processor Access
//!
//! [`Cpu`] backed by the real instructions on the processor running the
//! launch code.

use x86_64::registers::control::Cr3;
use x86_64::registers::model_specific::Msr;

use super::{cache, Cpu};

/// The bootstrap processor's own registers.
pub struct BspCpu {
    _private: (),
}

impl BspCpu {
    /// # Safety
    /// The caller must be executing at CPL0 on the BSP, and every MSR later
    /// passed to this handle must exist on the processor (an absent MSR
    /// raises #GP).
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl Cpu for BspCpu {
    fn read_msr(&mut self, msr: u32) -> u64 {
        // SAFETY: constructor contract guarantees CPL0 and MSR presence
        unsafe { Msr::new(msr).read() }
    }

    fn write_msr(&mut self, msr: u32, value: u64) {
        let mut reg = Msr::new(msr);
        // SAFETY: constructor contract guarantees CPL0 and MSR presence
        unsafe { reg.write(value) }
    }

    fn read_cr3(&mut self) -> u64 {
        let (frame, flags) = Cr3::read_raw();
        frame.start_address().as_u64() | u64::from(flags)
    }

    fn wbinvd(&mut self) {
        // SAFETY: constructor contract guarantees CPL0
        unsafe { cache::wbinvd() }
    }
}
