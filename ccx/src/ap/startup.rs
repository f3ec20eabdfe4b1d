//! AP Startup Region Builder
//!
//! Builds everything an AP needs between reset and the C-level entry point,
//! at the top of the boot-code region:
//!
//! 1. Compute the startup vector (`base + size - 0x10`)
//! 2. Save the window the trampoline will cover, then clear it
//! 3. Copy the startup image so its reset vector lands on the vector
//! 4. Capture the BSP's fixed MTRRs and apply the configured overrides
//! 5. Publish the BSP microcode patch level and paging root
//! 6. Protected mode only: GDT, GDT pointer, MTRR list copy, launch counter,
//!    AP stack and the AP's own GDT
//! 7. Write back and invalidate caches, last
//!
//! All preconditions are checked before the first byte of the window is
//! touched. The window is handed back as an [`ApStartupRegion`], which must
//! be restored once every AP has checked in.

use core::mem::size_of;
use core::slice;

use super::context::{BringUpContext, AP_BRING_UP_CONTEXT};
use super::global_data::ApLaunchGlobalData;
use super::handshake::HandshakeLocation;
use super::layout::{
    StartupLayout, AP_STACK_SIZE, AP_STARTUP_CODE_SIZE, BSP_MSR_SIZE, STARTUP_VECTOR_BACKOFF,
};
use super::snapshot::MemoryContentCopy;
use crate::arch::x86_64::gdt::{ap_gdt_bytes, GdtDescriptor, AP_GDT_BYTES};
use crate::arch::x86_64::trampoline::{ApStartupImage, AP_STARTUP_IMAGE};
use crate::config::CcxDataBlock;
use crate::error::{bug_check, LaunchFault};
use crate::hal::{msreg, Cpu};
use crate::mm::{PhysicalRegion, Translate};

/// Memory an AP needs to come up in 32-bit protected mode
#[derive(Debug)]
pub struct ProtectedModeResources {
    /// Stack shared by every AP; launches are serialized
    pub stack: PhysicalRegion,
    /// Receives the AP's own copy of the GDT
    pub ap_gdt: PhysicalRegion,
}

/// Processor mode the startup image leaves real mode for
#[derive(Debug)]
pub enum LaunchMode {
    /// The image needs nothing beyond the reset vector and startup code
    Real,
    /// The image loads a GDT and runs on a BSP-provided stack
    Protected(ProtectedModeResources),
}

impl LaunchMode {
    /// Whether the window carries a GDT, its pointer and the launch counter
    pub fn needs_segment_table(&self) -> bool {
        matches!(self, Self::Protected(_))
    }
}

/// A built startup window.
///
/// Holds the bytes the window covered before the build. Orchestration
/// releases the APs, waits on [`Self::handshake`], then calls
/// [`Self::restore`].
#[must_use = "the startup window covers live boot code and must be restored"]
#[derive(Debug)]
pub struct ApStartupRegion<'a> {
    layout: StartupLayout,
    window: PhysicalRegion,
    saved: MemoryContentCopy<'a>,
    protected: bool,
}

impl<'a> ApStartupRegion<'a> {
    /// First fetch address of an awakening AP
    pub fn vector(&self) -> u64 {
        self.layout.vector()
    }

    pub fn layout(&self) -> &StartupLayout {
        &self.layout
    }

    /// The live window
    pub fn window(&self) -> &PhysicalRegion {
        &self.window
    }

    /// What the window held before the build
    pub fn saved(&self) -> &MemoryContentCopy<'a> {
        &self.saved
    }

    /// The launch counter; only protected-mode windows carry one
    pub fn handshake(&self) -> Option<HandshakeLocation<'_>> {
        if !self.protected {
            return None;
        }
        let addr = self.layout.handshake();
        let ptr = self.window.ptr_at(addr, size_of::<u16>()).cast::<u16>();
        // SAFETY: `ptr_at` checked the range, the window stays mapped while
        // `self` lives, and the vector's 16-byte alignment keeps it aligned
        Some(unsafe { HandshakeLocation::from_ptr(addr, ptr) })
    }

    /// Puts the original boot code back.
    ///
    /// Call only after every released AP has checked in: an AP still
    /// executing from the window would fetch the restored bytes.
    pub fn restore(self) {
        let Self {
            mut window, saved, ..
        } = self;
        log::info!("restoring AP startup window at {:#x}", saved.base());
        saved.restore(&mut window);
    }
}

/// Builds the AP startup region on the BSP.
pub struct StartupRegionBuilder<'a, C: Cpu, T: Translate> {
    cpu: &'a mut C,
    translator: &'a T,
    image: &'a ApStartupImage,
    context: &'a BringUpContext,
}

impl<'a, C: Cpu, T: Translate> StartupRegionBuilder<'a, C, T> {
    /// Builder installing [`AP_STARTUP_IMAGE`] and publishing to
    /// [`AP_BRING_UP_CONTEXT`].
    ///
    /// # Safety
    /// `translator` must map the top of the configured boot-code region,
    /// and nothing else may access that memory until the built region is
    /// restored.
    pub unsafe fn new(cpu: &'a mut C, translator: &'a T) -> Self {
        Self {
            cpu,
            translator,
            image: &AP_STARTUP_IMAGE,
            context: &AP_BRING_UP_CONTEXT,
        }
    }

    /// Install `image` instead of the default startup image
    pub fn with_image(mut self, image: &'a ApStartupImage) -> Self {
        self.image = image;
        self
    }

    /// Publish to `context` instead of the global bring-up context
    pub fn with_context(mut self, context: &'a BringUpContext) -> Self {
        self.context = context;
        self
    }

    /// Builds the startup region described by `data_block`.
    ///
    /// `snapshot` receives the window's previous contents and must hold at
    /// least the window length (`AP_TEMP_BUFFER_SIZE` in real mode,
    /// `AP_TEMP_BUFFER_SIZE_32` in protected mode). Any violated
    /// precondition stops the boot through [`bug_check`].
    pub fn build<'s>(
        self,
        global: &mut ApLaunchGlobalData,
        snapshot: &'s mut [u8],
        data_block: &CcxDataBlock,
        mode: LaunchMode,
    ) -> ApStartupRegion<'s> {
        let Self {
            cpu,
            translator,
            image,
            context,
        } = self;
        let input = &data_block.input;
        let protected = mode.needs_segment_table();

        let layout = StartupLayout::new(input.boot_code_base, input.boot_code_size, protected)
            .unwrap_or_else(|fault| bug_check(fault));
        let vector = layout.vector();
        log::info!("ApStartupVector = {:#x}", vector);

        check_image(image, protected, input.ap_entry_point);
        let mtrr_size = check_mtrr_list(global, protected);
        if let LaunchMode::Protected(resources) = &mode {
            check_resources(&layout, resources, snapshot);
        }

        // SAFETY: `new` requires the translator to map the boot-code
        // region, and the layout keeps the window inside it
        let mut window =
            unsafe { PhysicalRegion::new(layout.window_base(), layout.window_len(), translator) };

        let (window_base, window_len) = (layout.window_base(), layout.window_len());
        let saved = MemoryContentCopy::capture(snapshot, &window, window_base, window_len);
        window.fill(window_base, window_len, 0);

        install_image(&mut window, image, vector, input.ap_entry_point);

        if let Some(mut list) = global.mtrr_sync_list() {
            list.capture(cpu, input);
        }
        global.size_of_ap_mtrr = mtrr_size as u32;

        global.bsp_patch_level = cpu.read_msr(msreg::PATCH_LEVEL);
        let cr3 = cpu.read_cr3();
        global.bsp_cr3 = cr3;
        context.set_bsp_cr3(cr3);

        if let LaunchMode::Protected(resources) = mode {
            install_protected_mode(&mut window, &layout, global, resources);
        }

        context.set_global_data(global as *mut ApLaunchGlobalData as u64);
        context.set_startup_vector(vector);

        // APs fetch the window without a coherent view of the BSP caches
        cpu.wbinvd();

        ApStartupRegion {
            layout,
            window,
            saved,
            protected,
        }
    }
}

fn mode_name(protected: bool) -> &'static str {
    if protected {
        "protected"
    } else {
        "real"
    }
}

fn check_image(image: &ApStartupImage, protected: bool, entry_point: u32) {
    if !image.is_well_formed() {
        bug_check(LaunchFault::MalformedImage {
            len: image.stub_size(),
        });
    }
    if image.needs_segment_table() != protected {
        bug_check(LaunchFault::ImageModeMismatch {
            image: mode_name(image.needs_segment_table()),
            launch: mode_name(protected),
        });
    }
    if image.entry_slot().is_some() && entry_point == 0 {
        bug_check(LaunchFault::NullArgument("ApEntryPoint"));
    }
    if image.code_size() > AP_STARTUP_CODE_SIZE
        || image.reset_vector_size() > STARTUP_VECTOR_BACKOFF as usize
    {
        bug_check(LaunchFault::ImageTooLarge {
            code: image.code_size(),
            reset: image.reset_vector_size(),
            max: AP_STARTUP_CODE_SIZE,
        });
    }
}

/// Returns the MTRR list size in bytes, terminator included.
fn check_mtrr_list(global: &mut ApLaunchGlobalData, protected: bool) -> usize {
    let declared = global.size_of_ap_mtrr;
    let Some(list) = global.mtrr_sync_list() else {
        bug_check(LaunchFault::NullArgument("ApMtrrSyncList"));
    };
    let size = list.byte_size();

    if declared != 0 && declared as usize != size {
        log::warn!("SizeOfApMtrr is {:#x}, list holds {:#x} bytes", declared, size);
    }
    if protected && size > BSP_MSR_SIZE {
        bug_check(LaunchFault::MtrrListTooLarge {
            size: size as u32,
            max: BSP_MSR_SIZE,
        });
    }
    size
}

fn check_resources(layout: &StartupLayout, resources: &ProtectedModeResources, snapshot: &[u8]) {
    let window_len = layout.window_len() as u64;

    for (what, region, need) in [
        ("AP stack", &resources.stack, AP_STACK_SIZE),
        ("AP GDT", &resources.ap_gdt, AP_GDT_BYTES),
    ] {
        if region.len() < need {
            bug_check(LaunchFault::RegionTooSmall {
                what,
                len: region.len() as u64,
                need: need as u64,
            });
        }
        if region.overlaps(layout.window_base(), window_len) {
            bug_check(LaunchFault::RegionOverlap {
                what,
                other: "AP startup window",
                base: region.base(),
                len: region.len() as u64,
            });
        }

        let start = region.as_ptr() as usize;
        let copy = snapshot.as_ptr() as usize;
        if start < copy + snapshot.len() && copy < start + region.len() {
            bug_check(LaunchFault::RegionOverlap {
                what,
                other: "snapshot buffer",
                base: region.base(),
                len: region.len() as u64,
            });
        }
    }
}

/// Copies `image` so that its reset vector starts at `vector`, and patches
/// the entry point field if the image has one.
fn install_image(
    window: &mut PhysicalRegion,
    image: &ApStartupImage,
    vector: u64,
    entry_point: u32,
) {
    let load = image.load_address(vector);
    window.write_bytes(load, image.bytes());

    if let Some(slot) = image.entry_slot() {
        window.write::<u32>(load + slot as u64, entry_point);
    }
    log::debug!(
        "AP startup image: {:#x} bytes at {:#x}, reset vector {:#x} bytes",
        image.stub_size(),
        load,
        image.reset_vector_size()
    );
}

fn install_protected_mode(
    window: &mut PhysicalRegion,
    layout: &StartupLayout,
    global: &mut ApLaunchGlobalData,
    resources: ProtectedModeResources,
) {
    let gdt = ap_gdt_bytes();
    window.write_bytes(layout.bsp_gdt(), &gdt);
    window.write(layout.gdt_pointer(), GdtDescriptor::for_ap_gdt(layout.bsp_gdt()));

    if let Some(list) = global.mtrr_sync_list() {
        window.write_bytes(layout.bsp_msr(), list.as_bytes());
    }
    global.bsp_msr_location = layout.bsp_msr() as u32;

    window.write::<u16>(layout.handshake(), 0);
    global.allow_to_launch_next_thread_location = layout.handshake() as u32;

    log::info!(
        "ApLaunchGlobalData->AllowToLaunchNextThreadLocation = {:#x}",
        layout.handshake()
    );
    log::info!("ApLaunchGlobalData->BspMsrLocation = {:#x}", layout.bsp_msr());
    log::info!(
        "ApLaunchGlobalData->ApMtrrSyncList = {:#x}",
        global.mtrr_sync_list_ptr() as usize
    );

    let ProtectedModeResources { stack, mut ap_gdt } = resources;
    global.ap_stack_base = stack.base();

    ap_gdt.write_bytes(ap_gdt.base(), &gdt);
    global.ap_gdt_descriptor = GdtDescriptor::for_ap_gdt(ap_gdt.base());
}

fn require<P>(ptr: *mut P, what: &'static str) -> *mut P {
    if ptr.is_null() {
        bug_check(LaunchFault::NullArgument(what));
    }
    ptr
}

/// Raw-pointer entry used by orchestration that only holds addresses.
///
/// Null arguments are launch faults. On return `*startup_vector` holds the
/// vector of the built region.
///
/// # Safety
/// Every non-null pointer must be valid for `'s`: `global` and
/// `data_block` for reads (and `global` for writes), `startup_vector` for
/// one `u64` write and `memory_content_copy` for `copy_len` bytes of
/// writes, none of them aliased elsewhere meanwhile.
pub unsafe fn setup_ap_startup_region<'s, C: Cpu, T: Translate>(
    builder: StartupRegionBuilder<'_, C, T>,
    global: *mut ApLaunchGlobalData,
    startup_vector: *mut u64,
    memory_content_copy: *mut u8,
    copy_len: usize,
    data_block: *const CcxDataBlock,
    mode: LaunchMode,
) -> ApStartupRegion<'s> {
    let global = require(global, "ApLaunchGlobalData");
    let startup_vector = require(startup_vector, "ApStartupVector");
    let copy = require(memory_content_copy, "MemoryContentCopy");
    let data_block = require(data_block.cast_mut(), "CcxDataBlock");

    // SAFETY: all pointers are non-null; the caller vouches for the rest
    let region = unsafe {
        builder.build(
            &mut *global,
            slice::from_raw_parts_mut(copy, copy_len),
            &*data_block,
            mode,
        )
    };
    // SAFETY: non-null, and valid for writes per the contract
    unsafe { startup_vector.write(region.vector()) };
    region
}
