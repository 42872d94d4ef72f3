/*++

Licensed under the Apache-2.0 license.

File Name:

    reload.rs

Abstract:

    File contains the implementation of the reload flow: re-verify the
    firmware a previous load left in the protected region and restart the
    target.

--*/

use booter_drivers::{cprintln, Hex64};
use booter_error::{BooterError, BooterResult};
use booter_image_types::IMAGE_UCODE_ID;
use booter_image_verify::revocation::check_revocation;

use super::{check_booter_version, read_fb_metadata, verify_boot_objects, SigBlob};
use crate::boot_status::BooterBootStatus::*;
use crate::env::BooterEnv;
use crate::handoff::{Handoff, Stage};
use crate::layout::RegionLayout;
use crate::BOOTER_VERSION;

#[derive(Default)]
pub struct ReloadFlow {}

impl ReloadFlow {
    /// Execute reload flow
    ///
    /// # Arguments
    ///
    /// * `env` - Booter Environment
    pub fn run(env: &mut BooterEnv) -> BooterResult<()> {
        cprintln!("[reload] ++");
        env.report_boot_status(ReloadStarted);

        check_booter_version(env)?;

        let state = {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).begin(Stage::Reload, &mut guard)?
        };

        let mut meta = read_fb_metadata(env, state.wpr_meta_offset)?;
        let layout = RegionLayout::from_metadata(&meta)?;
        if layout.meta_offset() != state.wpr_meta_offset {
            return Err(BooterError::WPR_META_INVALID_LAYOUT);
        }
        if !meta.is_verified() {
            cprintln!("[reload] Metadata was never verified");
            return Err(BooterError::WPR_META_NOT_VERIFIED);
        }
        if meta.fb_size != env.fuses().fb_size()? {
            return Err(BooterError::WPR_META_FB_SIZE_MISMATCH);
        }
        if env.wpr().current()? != Some(layout.region()) {
            cprintln!("[reload] WPR does not match the recorded layout");
            return Err(BooterError::BOOTER_WPR_MISMATCH);
        }
        env.report_boot_status(ReloadMetadataFetched);

        // Floors may have been raised since load
        let fuses = env.fuses();
        check_revocation(
            |index| fuses.revocation_scratch(index),
            IMAGE_UCODE_ID,
            state.fw_version,
        )?;

        let sig_blob = SigBlob::read_fb(env, &meta, layout.sig_offset())?;
        let info = verify_boot_objects(env, &mut meta, sig_blob.as_bytes())?;
        if info.image.ucode_version != state.fw_version {
            return Err(BooterError::HANDOFF_VERSION_MISMATCH);
        }
        env.report_boot_status(ReloadImageVerified);

        {
            let mut guard = env.handoff_mutex()?;
            Handoff::new(BOOTER_VERSION).complete_reload(&mut guard)?;
        }

        let boot_vector = meta
            .boot_bin_offset
            .checked_add(meta.bootloader_code_offset)
            .ok_or(BooterError::WPR_META_INVALID_LAYOUT)?;
        cprintln!("[reload] Starting target at {}", Hex64(boot_vector));
        env.platform.start_target(env.bus, boot_vector)?;

        cprintln!("[reload] --");
        env.report_boot_status(ReloadComplete);
        Ok(())
    }
}
