//! AP Launch Global Data
//!
//! The block every awakening processor reads during its private setup. The
//! BSP fills it in completely before the first AP is released; from then on
//! it is read-only. Its layout is shared with the C-level entry trampoline,
//! so it is `repr(C, packed)` and fields must not be reordered.

use core::ptr;

use super::list::RegisterList;
use super::msr_sync::{MsrSyncEntry, MsrSyncList};
use super::mtrr::{MtrrSetting, MtrrSyncList};
use crate::arch::x86_64::gdt::GdtDescriptor;

/// Number of CAC weight registers replicated to each core
pub const MAX_CAC_WEIGHT_NUM: usize = 22;

/// Criteria selecting which register-table entries apply at reset
#[repr(C, packed)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryCriteria {
    /// Criteria type
    pub kind: u32,
    /// Type-specific match data
    pub data: [u32; 3],
}

/// Shared state block handed to every AP
#[repr(C, packed)]
#[derive(Debug, Clone, Copy)]
pub struct ApLaunchGlobalData {
    ap_mtrr_sync_list: *mut MtrrSetting,
    /// ACPI sleep type being resumed from, 0 on a cold boot
    pub sleep_type: u8,
    /// Bytes of the MTRR list including its terminator
    pub size_of_ap_mtrr: u32,
    ap_msr_sync_list: *mut MsrSyncEntry,
    /// Microcode revision loaded on the BSP
    pub bsp_patch_level: u64,
    /// Physical address of the microcode patch to load
    pub ucode_patch_addr: u64,
    pub reset_table_criteria: EntryCriteria,
    pub cac_weights: [u64; MAX_CAC_WEIGHT_NUM],
    /// Register table replayed at the AP's time point (opaque here)
    pub reg_table_list: *const u8,
    /// BSP paging root, reused by APs that enable paging
    pub bsp_cr3: u64,
    /// Lowest address of the stack region APs run on
    pub ap_stack_base: u64,
    /// Launch counter each AP increments when done
    pub allow_to_launch_next_thread_location: u32,
    /// Copy of the MTRR list inside the startup window
    pub bsp_msr_location: u32,
    /// Descriptor of the AP's own copy of the GDT
    pub ap_gdt_descriptor: GdtDescriptor,
}

impl ApLaunchGlobalData {
    /// An empty block; no sync lists attached.
    pub const fn new() -> Self {
        Self {
            ap_mtrr_sync_list: ptr::null_mut(),
            sleep_type: 0,
            size_of_ap_mtrr: 0,
            ap_msr_sync_list: ptr::null_mut(),
            bsp_patch_level: 0,
            ucode_patch_addr: 0,
            reset_table_criteria: EntryCriteria {
                kind: 0,
                data: [0; 3],
            },
            cac_weights: [0; MAX_CAC_WEIGHT_NUM],
            reg_table_list: ptr::null(),
            bsp_cr3: 0,
            ap_stack_base: 0,
            allow_to_launch_next_thread_location: 0,
            bsp_msr_location: 0,
            ap_gdt_descriptor: GdtDescriptor { limit: 0, base: 0 },
        }
    }

    /// Attaches the fixed-MTRR list.
    ///
    /// # Safety
    /// `head` must be null or point to a [`MtrrSetting`] sequence containing
    /// a terminator, valid for reads and writes for as long as this block is
    /// in use and not accessed through any other path meanwhile.
    pub unsafe fn set_mtrr_sync_list(&mut self, head: *mut MtrrSetting) {
        self.ap_mtrr_sync_list = head;
    }

    /// Attaches the misc MSR list.
    ///
    /// # Safety
    /// Same contract as [`Self::set_mtrr_sync_list`], for [`MsrSyncEntry`].
    pub unsafe fn set_msr_sync_list(&mut self, head: *mut MsrSyncEntry) {
        self.ap_msr_sync_list = head;
    }

    /// Raw address of the MTRR list as published to APs
    pub fn mtrr_sync_list_ptr(&self) -> *mut MtrrSetting {
        self.ap_mtrr_sync_list
    }

    /// The fixed-MTRR list, `None` if none is attached
    pub fn mtrr_sync_list(&mut self) -> Option<MtrrSyncList<'_>> {
        // SAFETY: `set_mtrr_sync_list` is the only writer of the pointer
        unsafe { RegisterList::from_raw(self.ap_mtrr_sync_list) }
    }

    /// The misc MSR list, `None` if none is attached
    pub fn msr_sync_list(&mut self) -> Option<MsrSyncList<'_>> {
        // SAFETY: `set_msr_sync_list` is the only writer of the pointer
        unsafe { RegisterList::from_raw(self.ap_msr_sync_list) }
    }
}

impl Default for ApLaunchGlobalData {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ap::mtrr::DEFAULT_AP_MTRR_SETTINGS;

    #[test]
    fn test_empty_block_has_no_lists() {
        let mut global = ApLaunchGlobalData::new();
        assert!(global.mtrr_sync_list().is_none());
        assert!(global.msr_sync_list().is_none());
        assert_eq!({ global.allow_to_launch_next_thread_location }, 0);
    }

    #[test]
    fn test_attached_mtrr_list() {
        let mut entries = DEFAULT_AP_MTRR_SETTINGS;
        let mut global = ApLaunchGlobalData::default();
        // SAFETY: `entries` outlives `global` and is terminated
        unsafe { global.set_mtrr_sync_list(entries.as_mut_ptr()) };

        let list = global.mtrr_sync_list().unwrap();
        assert_eq!(list.len(), 11);
        assert_eq!(list.byte_size(), 12 * 12);
    }
}
