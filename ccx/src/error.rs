//! Launch Faults
//!
//! AP launch has exactly one kind of error: a violated precondition. Nothing
//! at this boot stage can unwind or retry, so every fault ends in
//! [`bug_check`], which traces the fault and stops the BSP.

use thiserror::Error;

/// A precondition the startup region builder refused to proceed without.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchFault {
    #[error("NULL argument passed to SetupApStartupRegion: {0}")]
    NullArgument(&'static str),

    #[error("boot code region {base:#x}+{size:#x} does not end on a 64 KiB boundary below 4 GiB")]
    BadBootCodeRegion { base: u64, size: u64 },

    #[error("snapshot buffer holds {have:#x} bytes, {need:#x} required")]
    SnapshotTooSmall { have: usize, need: usize },

    #[error("AP MTRR list is {size:#x} bytes, slot holds {max:#x}")]
    MtrrListTooLarge { size: u32, max: usize },

    #[error("AP startup image is {code:#x}+{reset:#x} bytes, slot holds {max:#x}+0x10")]
    ImageTooLarge { code: usize, reset: usize, max: usize },

    #[error("AP startup image labels lie outside its {len:#x} bytes")]
    MalformedImage { len: usize },

    #[error("AP startup image is built for {image} mode, launch is in {launch} mode")]
    ImageModeMismatch {
        image: &'static str,
        launch: &'static str,
    },

    #[error("{what} at {base:#x}+{len:#x} overlaps the {other}")]
    RegionOverlap {
        what: &'static str,
        other: &'static str,
        base: u64,
        len: u64,
    },

    #[error("{what} region is {len:#x} bytes, {need:#x} required")]
    RegionTooSmall { what: &'static str, len: u64, need: u64 },

    #[error("access {addr:#x}+{len:#x} outside region {base:#x}+{size:#x}")]
    OutOfBounds { addr: u64, len: usize, base: u64, size: usize },
}

/// Stops the boot flow on an unrecoverable launch fault.
///
/// The fault is traced at error level first so that it reaches the debug
/// console before the BSP goes down.
#[cold]
#[track_caller]
pub fn bug_check(fault: LaunchFault) -> ! {
    log::error!("{}", fault);
    panic!("CCX launch fault: {}", fault);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_messages() {
        let fault = LaunchFault::MtrrListTooLarge { size: 0x200, max: 0x100 };
        assert_eq!(fault.to_string(), "AP MTRR list is 0x200 bytes, slot holds 0x100");

        let fault = LaunchFault::NullArgument("ApMtrrSyncList");
        assert!(fault.to_string().contains("ApMtrrSyncList"));

        let fault = LaunchFault::ImageModeMismatch { image: "protected", launch: "real" };
        assert_eq!(
            fault.to_string(),
            "AP startup image is built for protected mode, launch is in real mode"
        );
    }

    #[test]
    #[should_panic(expected = "CCX launch fault")]
    fn test_bug_check_panics() {
        bug_check(LaunchFault::SnapshotTooSmall { have: 0x10, need: 0x90 });
    }
}
