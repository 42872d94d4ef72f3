/*++

Licensed under the Apache-2.0 license.

File Name:

    mod.rs

Abstract:

    File contains the top level dispatch of the booter stage flows and the
    steps they share.

--*/

mod load;
mod reload;
mod unload;

use booter_drivers::{PhysAddr, SubWindow, Wpr, LEVEL2_AND_UP, LEVEL3_ONLY};
use booter_error::{BooterError, BooterResult};
use booter_image_types::{WprMetadata, MAX_SIGNATURE_BLOB_SIZE, WPR_META_SIZE};
use booter_image_verify::revocation::check_fuse_version;
use booter_image_verify::{LsVerificationInfo, LsVerifier};

use crate::env::BooterEnv;
use crate::handoff::Stage;
use crate::layout::RegionLayout;
use crate::verifier::BooterVerificationEnv;
use crate::BOOTER_VERSION;

pub use load::LoadFlow;
pub use reload::ReloadFlow;
pub use unload::UnloadFlow;

/// Execute the flow of `stage`
///
/// # Arguments
///
/// * `stage` - Booter binary being run
/// * `env` - Booter Environment
pub fn run(stage: Stage, env: &mut BooterEnv) -> BooterResult<()> {
    match stage {
        Stage::Load => LoadFlow::run(env),
        Stage::Reload => ReloadFlow::run(env),
        Stage::Unload => UnloadFlow::run(env),
    }
}

/// The running booter must not be older than the fuse floor.
pub(crate) fn check_booter_version(env: &BooterEnv) -> BooterResult<()> {
    check_fuse_version(BOOTER_VERSION, env.fuses().fuse_version()?)
}

/// Shrink the protected region to the FRTS window alone. FRTS outlives the
/// firmware.
pub(crate) fn lock_frts_only(wpr: &Wpr, layout: &RegionLayout) -> BooterResult<()> {
    let frts = layout.frts();
    wpr.lock(
        frts,
        &[SubWindow {
            range: frts,
            read_mask: LEVEL2_AND_UP,
            write_mask: LEVEL3_ONLY,
        }],
    )
}

/// Verify the image and bootloader resident in FB under the crypto mutex.
pub(crate) fn verify_boot_objects(
    env: &mut BooterEnv,
    meta: &mut WprMetadata,
    sig_blob: &[u8],
) -> BooterResult<LsVerificationInfo> {
    let crypto = env.crypto_mutex()?;
    let mut verifier = LsVerifier::new(BooterVerificationEnv::new(env, &crypto));
    let info = verifier.verify_boot_objects(meta, sig_blob)?;
    Ok(info)
}

/// Read the in-region metadata copy at `offset`.
pub(crate) fn read_fb_metadata(env: &mut BooterEnv, offset: u64) -> BooterResult<WprMetadata> {
    let mut bytes = [0u8; WPR_META_SIZE];
    env.dma().read_fb(offset, &mut bytes)?;
    let meta = WprMetadata::decode(&bytes)?;
    meta.validate_header()?;
    Ok(meta)
}

/// Signature blob staged in local memory.
pub(crate) struct SigBlob {
    bytes: [u8; MAX_SIGNATURE_BLOB_SIZE],
    len: usize,
}

impl SigBlob {
    /// Read the requester's blob from system memory.
    pub(crate) fn read_sysmem(env: &mut BooterEnv, meta: &WprMetadata) -> BooterResult<Self> {
        let mut blob = Self::empty(meta)?;
        let addr = PhysAddr(meta.sysmem_addr_of_signature);
        env.platform
            .sysmem_aperture()
            .check(addr, blob.len as u64)?;
        env.dma().read_sysmem(addr, &mut blob.bytes[..blob.len])?;
        Ok(blob)
    }

    /// Read the in-region copy at `offset`.
    pub(crate) fn read_fb(env: &mut BooterEnv, meta: &WprMetadata, offset: u64) -> BooterResult<Self> {
        let mut blob = Self::empty(meta)?;
        env.dma().read_fb(offset, &mut blob.bytes[..blob.len])?;
        Ok(blob)
    }

    fn empty(meta: &WprMetadata) -> BooterResult<Self> {
        let len = match usize::try_from(meta.size_of_signature) {
            Ok(len) if len != 0 && len <= MAX_SIGNATURE_BLOB_SIZE => len,
            _ => return Err(BooterError::WPR_META_SIGNATURE_TOO_LARGE),
        };
        Ok(Self {
            bytes: [0; MAX_SIGNATURE_BLOB_SIZE],
            len,
        })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}
