/*++

Licensed under the Apache-2.0 license.

File Name:

    unload.rs

Abstract:

    File contains the implementation of the unload flow: scrub the firmware
    out of the protected region, shrink protection back to FRTS and reset
    the handoff state.

--*/

use booter_drivers::{cprintln, WprRange};
use booter_error::{BooterError, BooterResult};

use super::{lock_frts_only, read_fb_metadata};
use crate::boot_status::BooterBootStatus::*;
use crate::env::BooterEnv;
use crate::handoff::{Handoff, Stage};
use crate::layout::RegionLayout;
use crate::BOOTER_VERSION;

#[derive(Default)]
pub struct UnloadFlow {}

impl UnloadFlow {
    /// Execute unload flow
    ///
    /// # Arguments
    ///
    /// * `env` - Booter Environment
    pub fn run(env: &mut BooterEnv) -> BooterResult<()> {
        cprintln!("[unload] ++");
        env.report_boot_status(UnloadStarted);

        let state = {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).begin(Stage::Unload, &mut guard)?
        };

        let mut meta = read_fb_metadata(env, state.wpr_meta_offset)?;
        let layout = RegionLayout::from_metadata(&meta)?;
        let wpr = env.wpr();
        if wpr.current()? != Some(layout.region()) {
            return Err(BooterError::BOOTER_WPR_MISMATCH);
        }

        wpr.scrub(WprRange::new(layout.wpr_start, layout.frts_offset))?;
        meta.clear_verified();
        env.dma().write_fb(layout.meta_offset(), &meta.encode())?;
        env.report_boot_status(UnloadRegionScrubbed);

        lock_frts_only(&wpr, &layout)?;

        {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).complete_unload(&mut guard)?;
        }

        cprintln!("[unload] --");
        env.report_boot_status(UnloadComplete);
        Ok(())
    }
}
