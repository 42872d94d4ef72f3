/*++

Licensed under the Apache-2.0 license.

File Name:

    load.rs

Abstract:

    File contains the implementation of the load flow: plan and lock the
    protected region, fetch the firmware into it, verify it and start the
    target.

--*/

use booter_drivers::{cprintln, requester_argument, Hex32, Hex64, PhysAddr, WprRange};
use booter_error::{BooterError, BooterResult};
use booter_image_types::{WprMetadata, WPR_META_SIZE};

use super::{check_booter_version, lock_frts_only, verify_boot_objects, SigBlob};
use crate::boot_status::BooterBootStatus::*;
use crate::env::BooterEnv;
use crate::handoff::{Handoff, Stage};
use crate::layout::{plan, PlanRequest, RegionLayout};
use crate::radix3::{copy_contiguous, Radix3};
use crate::BOOTER_VERSION;

#[derive(Default)]
pub struct LoadFlow {}

impl LoadFlow {
    /// Execute load flow
    ///
    /// # Arguments
    ///
    /// * `env` - Booter Environment
    pub fn run(env: &mut BooterEnv) -> BooterResult<()> {
        cprintln!("[load] ++");
        env.report_boot_status(LoadStarted);

        check_booter_version(env)?;

        let mut meta = Self::fetch_metadata(env)?;
        env.report_boot_status(LoadMetadataFetched);

        {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).begin(Stage::Load, &mut guard)?;
        }

        if meta.fb_size != env.fuses().fb_size()? {
            cprintln!("[load] FB size mismatch");
            return Err(BooterError::WPR_META_FB_SIZE_MISMATCH);
        }

        let layout = plan(&PlanRequest::from_metadata(&meta), &env.alignments)?;
        layout.apply(&mut meta);
        meta.validate_layout()?;
        env.report_boot_status(LoadLayoutPlanned);
        cprintln!(
            "[load] WPR {} - {}",
            Hex64(layout.wpr_start),
            Hex64(layout.wpr_end)
        );

        Self::lock_region(env, &layout)?;
        env.report_boot_status(LoadRegionLocked);

        if let Err(err) = Self::install(env, &mut meta, &layout) {
            // Nothing below FRTS may be trusted after a failed install
            let below_frts = WprRange::new(layout.wpr_start, layout.frts_offset);
            if let Err(scrub_err) = env.wpr().scrub(below_frts) {
                cprintln!("[load] Scrub failed {}", Hex32(u32::from(scrub_err)));
            }
            Self::release_region(env, &layout);
            return Err(err);
        }

        cprintln!("[load] --");
        env.report_boot_status(LoadComplete);
        Ok(())
    }

    /// Fetch the requester's metadata from the address in the mailbox.
    fn fetch_metadata(env: &mut BooterEnv) -> BooterResult<WprMetadata> {
        let addr = PhysAddr(requester_argument(env.bus));
        env.platform
            .sysmem_aperture()
            .check(addr, WPR_META_SIZE as u64)?;

        let mut bytes = [0u8; WPR_META_SIZE];
        env.dma().read_sysmem(addr, &mut bytes)?;
        let meta = WprMetadata::decode(&bytes)?;
        meta.validate_request()?;
        Ok(meta)
    }

    /// Lock the planned region and scrub everything below FRTS. A region
    /// that is already programmed must be exactly the planned FRTS range.
    fn lock_region(env: &mut BooterEnv, layout: &RegionLayout) -> BooterResult<()> {
        let wpr = env.wpr();
        match wpr.current()? {
            Some(range) if range != layout.frts() => {
                cprintln!(
                    "[load] Existing WPR {} - {} is not FRTS",
                    Hex64(range.start),
                    Hex64(range.end)
                );
                return Err(BooterError::BOOTER_LOAD_FRTS_MISMATCH);
            }
            _ => {}
        }
        wpr.lock(layout.region(), &layout.sub_windows())?;
        if let Err(err) = wpr.scrub(WprRange::new(layout.wpr_start, layout.frts_offset)) {
            Self::release_region(env, layout);
            return Err(err);
        }
        Ok(())
    }

    /// Return the region to FRTS only so a later Load finds the
    /// precondition it expects.
    fn release_region(env: &BooterEnv, layout: &RegionLayout) {
        if let Err(err) = lock_frts_only(&env.wpr(), layout) {
            cprintln!("[load] FRTS re-lock failed {}", Hex32(u32::from(err)));
        }
    }

    /// Copy, verify and record. Runs with the region locked.
    fn install(
        env: &mut BooterEnv,
        meta: &mut WprMetadata,
        layout: &RegionLayout,
    ) -> BooterResult<()> {
        let sig_blob = SigBlob::read_sysmem(env, meta)?;
        let aperture = env.platform.sysmem_aperture();
        {
            let mut dma = env.dma();
            dma.write_fb(layout.sig_offset(), sig_blob.as_bytes())?;
            Radix3::new(PhysAddr(meta.sysmem_addr_of_radix3_image), aperture)?.copy_in(
                &mut dma,
                meta.size_of_radix3_image,
                layout.image_offset,
            )?;
            copy_contiguous(
                &mut dma,
                PhysAddr(meta.sysmem_addr_of_bootloader),
                &aperture,
                meta.size_of_bootloader,
                layout.boot_bin_offset,
            )?;
        }
        env.report_boot_status(LoadImageCopied);

        // Verification reads the copies inside the region, never sysmem
        let info = verify_boot_objects(env, meta, sig_blob.as_bytes())?;
        meta.boot_count = meta
            .boot_count
            .checked_add(1)
            .ok_or(BooterError::WPR_META_INVALID_LAYOUT)?;
        env.dma().write_fb(layout.meta_offset(), &meta.encode())?;
        env.report_boot_status(LoadImageVerified);

        {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).complete_load(
                &mut guard,
                info.image.ucode_version,
                layout.meta_offset(),
            )?;
        }
        env.report_boot_status(LoadHandoffRecorded);

        let boot_vector = meta
            .boot_bin_offset
            .checked_add(meta.bootloader_code_offset)
            .ok_or(BooterError::WPR_META_INVALID_LAYOUT)?;
        cprintln!("[load] Starting target at {}", Hex64(boot_vector));
        env.platform.start_target(env.bus, boot_vector)
    }
}
