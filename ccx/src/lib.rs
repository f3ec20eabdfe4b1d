//! CCX Application Processor Launch
//!
//! Early-boot support for releasing secondary logical processors on a
//! multi-core x86 system. The bootstrap processor (BSP) uses this crate to
//! build the AP startup region at the top of the boot-code window:
//!
//! - **ap** - Startup region builder, MTRR/MSR sync lists, handshake, snapshot
//! - **arch** - Relocatable trampoline fragments and the AP descriptor table
//! - **hal** - CPU collaborator trait, MSR definitions, cache control
//! - **mm** - Physical region views over translated physical memory
//! - **config** - CCX input block (boot-code window, MTRR overrides)
//! - **trace** - Diagnostic trace sink on the serial console
//!
//! # Launch Sequence
//!
//! 1. Orchestration calls [`ap::StartupRegionBuilder::build`] once per boot
//! 2. The builder snapshots the window, installs the trampoline and the shared
//!    data, then flushes caches
//! 3. Orchestration releases APs one at a time, polling the handshake
//! 4. Once all APs have checked in, orchestration restores the window

#![cfg_attr(not(test), no_std)]
#![allow(clippy::missing_safety_doc)]
#![allow(clippy::new_without_default)]

pub mod ap;
pub mod arch;
pub mod config;
pub mod error;
pub mod hal;
pub mod mm;
pub mod serial;
pub mod trace;

pub use ap::{ApLaunchGlobalData, ApStartupRegion, LaunchMode, StartupRegionBuilder};
pub use config::{CcxDataBlock, CcxInputBlock};
pub use error::LaunchFault;
