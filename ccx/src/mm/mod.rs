//! Memory Manager (mm)
//!
//! Before paging belongs to anyone but firmware, the AP launch code still
//! needs to write at fixed physical addresses. This module provides:
//!
//! - **Translate**: Physical to virtual address translation
//! - **PhysicalRegion**: Bounds-checked view over a physical address range

pub mod physical;

pub use physical::{IdentityTranslator, OffsetTranslator, PhysicalRegion, Translate};
