/*++

Licensed under the Apache-2.0 license.

File Name:

    layout.rs

Abstract:

    File contains the protected region planner. All placement is top-down
    from the end of usable FB.

--*/

use booter_drivers::{SubWindow, WprRange, LEVEL2_AND_UP, LEVEL3_ONLY, LEVEL_ALL};
use booter_error::{BooterError, BooterResult};
use booter_image_types::{WprMetadata, WPR_HEADERS_SIZE, WPR_META_PAGE_SIZE};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Smallest FB the planner accepts.
pub const MIN_FB_SIZE: u64 = 16 * MIB;

/// Size of the FRTS sub-region at the top of the protected region.
pub const FRTS_SIZE: u64 = MIB;

/// Alignment of each placed object. All values are powers of two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionAlignments {
    pub frts: u64,
    pub bootloader: u64,
    pub image: u64,
    pub heap: u64,
    pub header: u64,
    pub region: u64,
}

impl Default for RegionAlignments {
    fn default() -> Self {
        Self {
            frts: 128 * KIB,
            bootloader: 4 * KIB,
            image: 64 * KIB,
            heap: MIB,
            header: 4 * KIB,
            region: MIB,
        }
    }
}

impl RegionAlignments {
    pub fn validate(&self) -> BooterResult<()> {
        let all = [
            self.frts,
            self.bootloader,
            self.image,
            self.heap,
            self.header,
            self.region,
        ];
        if all.iter().any(|align| !align.is_power_of_two()) {
            return Err(BooterError::LAYOUT_INVALID_ALIGNMENT);
        }
        if self.header < WPR_META_PAGE_SIZE || self.region < self.header {
            return Err(BooterError::LAYOUT_INVALID_ALIGNMENT);
        }
        Ok(())
    }
}

/// Sizes the planner works from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlanRequest {
    pub fb_size: u64,
    pub image_size: u64,
    pub bootloader_size: u64,

    /// Requested heap; the planned heap may be larger.
    pub heap_size: u64,

    /// Bytes at the top of FB that stay outside the region.
    pub reserved_tail_size: u64,

    /// Heap placed directly below the region, outside protection.
    pub non_wpr_heap_size: u64,
}

impl PlanRequest {
    pub fn from_metadata(meta: &WprMetadata) -> Self {
        Self {
            fb_size: meta.fb_size,
            image_size: meta.size_of_radix3_image,
            bootloader_size: meta.size_of_bootloader,
            heap_size: meta.heap_size,
            reserved_tail_size: meta.vga_workspace_size,
            non_wpr_heap_size: meta.non_wpr_heap_size,
        }
    }
}

/// Planned protected region. Immutable once locked.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub fb_size: u64,
    pub non_wpr_heap_offset: u64,
    pub non_wpr_heap_size: u64,
    pub wpr_start: u64,
    pub heap_offset: u64,
    pub heap_size: u64,
    pub image_offset: u64,
    pub image_size: u64,
    pub boot_bin_offset: u64,
    pub bootloader_size: u64,
    pub frts_offset: u64,
    pub wpr_end: u64,
    pub reserved_tail_offset: u64,
}

fn align_down(val: u64, align: u64) -> u64 {
    val & !(align - 1)
}

fn align_up(val: u64, align: u64) -> BooterResult<u64> {
    val.checked_add(align - 1)
        .map(|v| align_down(v, align))
        .ok_or(BooterError::LAYOUT_INSUFFICIENT_SPACE)
}

fn below(top: u64, size: u64, align: u64) -> BooterResult<u64> {
    top.checked_sub(size)
        .map(|v| align_down(v, align))
        .ok_or(BooterError::LAYOUT_INSUFFICIENT_SPACE)
}

/// Compute the protected region for `req`.
///
/// # Arguments
///
/// * `req` - Object sizes and FB size
/// * `align` - Placement alignments
///
/// # Returns
///
/// * `RegionLayout` - Layout with `wpr_start < image_offset < wpr_end`
pub fn plan(req: &PlanRequest, align: &RegionAlignments) -> BooterResult<RegionLayout> {
    align.validate()?;
    if req.image_size == 0 {
        return Err(BooterError::LAYOUT_EMPTY_IMAGE);
    }
    if req.fb_size < MIN_FB_SIZE {
        return Err(BooterError::LAYOUT_INSUFFICIENT_SPACE);
    }

    let usable_top = req
        .fb_size
        .checked_sub(req.reserved_tail_size)
        .ok_or(BooterError::LAYOUT_INSUFFICIENT_SPACE)?;
    let wpr_end = align_down(usable_top, align.frts);
    let frts_offset = below(wpr_end, FRTS_SIZE, 1)?;
    let boot_bin_offset = below(frts_offset, req.bootloader_size, align.bootloader)?;
    let image_offset = below(boot_bin_offset, req.image_size, align.image)?;
    let heap_offset = below(image_offset, req.heap_size, align.heap)?;
    let headers = align_up(WPR_HEADERS_SIZE, align.header)?;
    let wpr_start = below(heap_offset, headers, align.region)?;
    let non_wpr_heap_offset = below(wpr_start, req.non_wpr_heap_size, 1)?;

    if wpr_start >= image_offset || image_offset >= wpr_end {
        return Err(BooterError::LAYOUT_INSUFFICIENT_SPACE);
    }

    Ok(RegionLayout {
        fb_size: req.fb_size,
        non_wpr_heap_offset,
        non_wpr_heap_size: req.non_wpr_heap_size,
        wpr_start,
        heap_offset,
        heap_size: image_offset - heap_offset,
        image_offset,
        image_size: req.image_size,
        boot_bin_offset,
        bootloader_size: req.bootloader_size,
        frts_offset,
        wpr_end,
        reserved_tail_offset: usable_top,
    })
}

impl RegionLayout {
    /// Rebuild a layout from relocated metadata.
    pub fn from_metadata(meta: &WprMetadata) -> BooterResult<Self> {
        meta.validate_layout()?;
        Ok(Self {
            fb_size: meta.fb_size,
            non_wpr_heap_offset: meta.non_wpr_heap_offset,
            non_wpr_heap_size: meta.non_wpr_heap_size,
            wpr_start: meta.wpr_start,
            heap_offset: meta.heap_offset,
            heap_size: meta.heap_size,
            image_offset: meta.image_offset,
            image_size: meta.size_of_radix3_image,
            boot_bin_offset: meta.boot_bin_offset,
            bootloader_size: meta.size_of_bootloader,
            frts_offset: meta.frts_offset,
            wpr_end: meta.wpr_end,
            reserved_tail_offset: meta.vga_workspace_offset,
        })
    }

    /// Write the device side offsets into `meta`.
    pub fn apply(&self, meta: &mut WprMetadata) {
        meta.fw_rsvd_start = self.non_wpr_heap_offset;
        meta.non_wpr_heap_offset = self.non_wpr_heap_offset;
        meta.non_wpr_heap_size = self.non_wpr_heap_size;
        meta.wpr_start = self.wpr_start;
        meta.heap_offset = self.heap_offset;
        meta.heap_size = self.heap_size;
        meta.image_offset = self.image_offset;
        meta.boot_bin_offset = self.boot_bin_offset;
        meta.frts_offset = self.frts_offset;
        meta.frts_size = self.wpr_end - self.frts_offset;
        meta.wpr_end = self.wpr_end;
        meta.fb_size = self.fb_size;
        meta.vga_workspace_offset = self.reserved_tail_offset;
        meta.vga_workspace_size = self.fb_size - self.reserved_tail_offset;
    }

    pub fn region(&self) -> WprRange {
        WprRange::new(self.wpr_start, self.wpr_end)
    }

    pub fn frts(&self) -> WprRange {
        WprRange::new(self.frts_offset, self.wpr_end)
    }

    /// Everything the firmware owns inside the region, below FRTS.
    pub fn firmware(&self) -> WprRange {
        WprRange::new(self.wpr_start + WPR_HEADERS_SIZE, self.frts_offset)
    }

    pub fn meta_offset(&self) -> u64 {
        self.wpr_start
    }

    pub fn sig_offset(&self) -> u64 {
        self.wpr_start + WPR_META_PAGE_SIZE
    }

    /// Per-level access windows, in programming order.
    pub fn sub_windows(&self) -> [SubWindow; 3] {
        [
            SubWindow {
                range: WprRange::new(self.wpr_start, self.wpr_start + WPR_HEADERS_SIZE),
                read_mask: LEVEL_ALL,
                write_mask: LEVEL3_ONLY,
            },
            SubWindow {
                range: self.firmware(),
                read_mask: LEVEL3_ONLY,
                write_mask: LEVEL3_ONLY,
            },
            SubWindow {
                range: self.frts(),
                read_mask: LEVEL2_AND_UP,
                write_mask: LEVEL3_ONLY,
            },
        ]
    }
}
