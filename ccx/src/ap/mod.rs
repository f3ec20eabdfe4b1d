//! Application Processor Launch (ap)
//!
//! Everything the BSP prepares before releasing secondary processors:
//!
//! - **startup**: Builds the startup window and publishes the shared data
//! - **layout**: Fixed offsets of the window around the startup vector
//! - **snapshot**: Saves and restores the boot code the window covers
//! - **mtrr**: Fixed-MTRR list captured on the BSP, replayed on each AP
//! - **msr_sync**: Misc MSRs replicated with a per-entry mask
//! - **handshake**: Launch counter serializing AP releases
//! - **global_data**: Shared block read by every AP
//! - **context**: Values the entry trampoline reads from a fixed symbol
//!
//! # Release Protocol
//!
//! ```text
//! BSP                                    AP n
//! ---                                    ----
//! build()  -> window, global data, wbinvd
//! release AP n                   ------> fetch at startup vector
//!                                        jmp startup code, load GDT
//!                                        replay MTRRs / MSRs
//! wait_for(n)                    <------ counter += 1
//! release AP n + 1 ...
//! restore()
//! ```

pub mod context;
pub mod global_data;
pub mod handshake;
pub mod layout;
pub mod list;
pub mod msr_sync;
pub mod mtrr;
pub mod snapshot;
pub mod startup;

pub use context::{BringUpContext, AP_BRING_UP_CONTEXT};
pub use global_data::ApLaunchGlobalData;
pub use handshake::HandshakeLocation;
pub use layout::StartupLayout;
pub use msr_sync::{sync_misc_msrs, MsrSyncEntry, MsrSyncList};
pub use mtrr::{MtrrSetting, MtrrSyncList, DEFAULT_AP_MTRR_SETTINGS};
pub use snapshot::MemoryContentCopy;
pub use startup::{
    setup_ap_startup_region, ApStartupRegion, LaunchMode, ProtectedModeResources,
    StartupRegionBuilder,
};
