//! Recording CPU for unit tests.

use std::collections::BTreeMap;
use std::vec::Vec;

use super::Cpu;

/// One observed processor operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuOp {
    Read(u32),
    Write(u32, u64),
    ReadCr3,
    Wbinvd,
}

/// MSR file backed by a map; unknown MSRs read as zero.
#[derive(Debug, Default)]
pub struct MockCpu {
    pub msrs: BTreeMap<u32, u64>,
    pub cr3: u64,
    pub ops: Vec<CpuOp>,
}

impl MockCpu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_msr(mut self, msr: u32, value: u64) -> Self {
        self.msrs.insert(msr, value);
        self
    }

    pub fn msr(&self, msr: u32) -> u64 {
        self.msrs.get(&msr).copied().unwrap_or(0)
    }

    /// MSRs read, in order
    pub fn reads(&self) -> Vec<u32> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                CpuOp::Read(msr) => Some(*msr),
                _ => None,
            })
            .collect()
    }
}

impl Cpu for MockCpu {
    fn read_msr(&mut self, msr: u32) -> u64 {
        self.ops.push(CpuOp::Read(msr));
        self.msr(msr)
    }

    fn write_msr(&mut self, msr: u32, value: u64) {
        self.ops.push(CpuOp::Write(msr, value));
        self.msrs.insert(msr, value);
    }

    fn read_cr3(&mut self) -> u64 {
        self.ops.push(CpuOp::ReadCr3);
        self.cr3
    }

    fn wbinvd(&mut self) {
        self.ops.push(CpuOp::Wbinvd);
    }
}
