//! x86_64 architecture support
//!
//! - **trampoline**: Relocatable AP reset-vector stub and startup code
//! - **gdt**: Descriptor table used by APs entering protected mode

pub mod gdt;
pub mod trampoline;

pub use gdt::{GdtDescriptor, AP_GDT_ENTRIES};
pub use trampoline::{ApStartupImage, AP_STARTUP_IMAGE};
