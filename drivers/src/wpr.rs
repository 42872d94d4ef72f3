/*++

Licensed under the Apache-2.0 license.

File Name:

    wpr.rs

Abstract:

    File contains API for programming the write-protected region, its
    per-level sub-windows and the memory scrubber.

--*/

use bitfield::bitfield;
use booter_error::{BooterError, BooterResult};

use crate::memory_layout::{
    SCRUB_GRANULE_SHIFT, SCRUB_TIMEOUT_NS, SUB_WINDOW_COUNT, SUB_WINDOW_GRANULE_SHIFT,
};
use crate::{wait, Bus, PlatformOps, Timer};

/// Privilege level masks. Bit N grants level N.
pub const LEVEL_ALL: u8 = 0xf;
pub const LEVEL2_AND_UP: u8 = 0xc;
pub const LEVEL3_ONLY: u8 = 0x8;

const SCRUB_CTRL_START: u32 = 1 << 0;
const SCRUB_STATUS_DONE: u32 = 1 << 0;

/// Half-open FB range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WprRange {
    pub start: u64,
    pub end: u64,
}

impl WprRange {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub const fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub const fn contains(&self, other: &WprRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    fn is_granule_aligned(&self, shift: u32) -> bool {
        let mask = (1u64 << shift) - 1;
        self.start & mask == 0 && self.end & mask == 0
    }
}

bitfield! {
    /// Sub-window configuration register
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct SubWindowCfg(u32);
    u8;

    /// Levels allowed to read
    pub read_mask, set_read_mask: 3, 0;

    /// Levels allowed to write
    pub write_mask, set_write_mask: 7, 4;

    /// Window enable
    pub enable, set_enable: 31;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubWindow {
    pub range: WprRange,
    pub read_mask: u8,
    pub write_mask: u8,
}

pub struct Wpr<'a> {
    bus: &'a dyn Bus,
    platform: &'static dyn PlatformOps,
    timer: &'a dyn Timer,
}

impl<'a> Wpr<'a> {
    pub fn new(bus: &'a dyn Bus, platform: &'static dyn PlatformOps, timer: &'a dyn Timer) -> Self {
        Self {
            bus,
            platform,
            timer,
        }
    }

    /// The currently programmed region, if any.
    pub fn current(&self) -> BooterResult<Option<WprRange>> {
        let regs = self.platform.regs();
        let shift = self.platform.wpr_addr_shift();
        let lo = self.bus.read_global(regs.wpr_lo)?;
        let hi = self.bus.read_global(regs.wpr_hi)?;
        if lo == 0 && hi == 0 {
            return Ok(None);
        }
        Ok(Some(WprRange::new(
            u64::from(lo) << shift,
            u64::from(hi) << shift,
        )))
    }

    /// Program the region and its sub-windows. Unused window slots are
    /// disabled.
    pub fn lock(&self, range: WprRange, windows: &[SubWindow]) -> BooterResult<()> {
        let regs = self.platform.regs();
        let shift = self.platform.wpr_addr_shift();
        if range.is_empty() || !range.is_granule_aligned(shift) || windows.len() > SUB_WINDOW_COUNT
        {
            return Err(BooterError::DRIVER_WPR_INVALID_RANGE);
        }
        for window in windows {
            if window.range.is_empty()
                || !range.contains(&window.range)
                || !window.range.is_granule_aligned(SUB_WINDOW_GRANULE_SHIFT)
            {
                return Err(BooterError::DRIVER_WPR_INVALID_RANGE);
            }
        }

        self.bus
            .write_global(regs.wpr_lo, granule(range.start, shift)?)?;
        self.bus
            .write_global(regs.wpr_hi, granule(range.end, shift)?)?;

        for (i, slot) in regs.sub_windows.iter().enumerate() {
            let mut cfg = SubWindowCfg(0);
            let (lo, hi) = match windows.get(i) {
                Some(window) => {
                    cfg.set_read_mask(window.read_mask);
                    cfg.set_write_mask(window.write_mask);
                    cfg.set_enable(true);
                    (
                        granule(window.range.start, SUB_WINDOW_GRANULE_SHIFT)?,
                        granule(window.range.end, SUB_WINDOW_GRANULE_SHIFT)?,
                    )
                }
                None => (0, 0),
            };
            self.bus.write_global(slot.lo, lo)?;
            self.bus.write_global(slot.hi, hi)?;
            self.bus.write_global(slot.cfg, cfg.0)?;
        }
        Ok(())
    }

    /// Zero `range` with the hardware scrubber and wait for completion.
    pub fn scrub(&self, range: WprRange) -> BooterResult<()> {
        if range.is_empty() {
            return Ok(());
        }
        if !range.is_granule_aligned(SCRUB_GRANULE_SHIFT) {
            return Err(BooterError::DRIVER_WPR_INVALID_RANGE);
        }
        let regs = self.platform.regs();
        self.bus
            .write_global(regs.scrub_start, granule(range.start, SCRUB_GRANULE_SHIFT)?)?;
        self.bus
            .write_global(regs.scrub_end, granule(range.end, SCRUB_GRANULE_SHIFT)?)?;
        self.bus.write_global(regs.scrub_ctrl, SCRUB_CTRL_START)?;

        wait::until(
            self.timer,
            SCRUB_TIMEOUT_NS,
            BooterError::DRIVER_WPR_SCRUB_TIMEOUT,
            || Ok(self.bus.read_global(regs.scrub_status)? & SCRUB_STATUS_DONE != 0),
        )
    }
}

fn granule(addr: u64, shift: u32) -> BooterResult<u32> {
    u32::try_from(addr >> shift).map_err(|_| BooterError::DRIVER_WPR_INVALID_RANGE)
}
