//! Hardware Abstraction Layer (hal)
//!
//! The startup region builder touches the BSP's hardware through a small
//! collaborator surface:
//!
//! - **MSR**: 64-bit read/write with or/and masking variants
//! - **CR3**: Paging root of the BSP
//! - **Cache**: Full writeback-and-invalidate
//!
//! [`Cpu`] is that surface. [`BspCpu`] implements it with the real
//! instructions; tests substitute a recording mock.

pub mod cache;
pub mod cpu;
pub mod msreg;

#[cfg(test)]
pub(crate) mod mock;

pub use cpu::BspCpu;

/// Processor primitives consumed by the AP launch code.
///
/// All operations act on the processor currently executing.
pub trait Cpu {
    /// Read a model-specific register
    fn read_msr(&mut self, msr: u32) -> u64;

    /// Write a model-specific register
    fn write_msr(&mut self, msr: u32, value: u64);

    /// Set bits in a model-specific register (read-modify-write)
    fn msr_or(&mut self, msr: u32, bits: u64) {
        let value = self.read_msr(msr);
        self.write_msr(msr, value | bits);
    }

    /// Keep only the bits of `mask` in a model-specific register
    fn msr_and(&mut self, msr: u32, mask: u64) {
        let value = self.read_msr(msr);
        self.write_msr(msr, value & mask);
    }

    /// `msr = (msr & and_mask) | or_mask`
    fn msr_and_or(&mut self, msr: u32, and_mask: u64, or_mask: u64) {
        let value = self.read_msr(msr);
        self.write_msr(msr, (value & and_mask) | or_mask);
    }

    /// Current paging root (raw CR3)
    fn read_cr3(&mut self) -> u64;

    /// Write back and invalidate all processor caches
    fn wbinvd(&mut self);
}
