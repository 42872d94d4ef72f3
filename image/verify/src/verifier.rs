/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    This file is the main implementation of the LS signature verifier.

--*/

use booter_drivers::memory_layout::SHA_MAX_TASK_SIZE;
use booter_drivers::{cprintln, HexBytes, ShaChunk};
use booter_error::{BooterError, BooterResult};
use booter_image_types::*;

use crate::*;

const SHA_BLOCK: u64 = SHA256_BLOCK_BYTE_SIZE as u64;

/// LS Verifier
pub struct LsVerifier<Env: LsVerificationEnv> {
    /// Verification Environment
    env: Env,
}

impl<Env: LsVerificationEnv> LsVerifier<Env> {
    /// Create a new instance `LsVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    /// Verify the firmware image and then the bootloader, both already
    /// resident in FB at the offsets `meta` records. Only a fully
    /// successful run marks `meta` verified.
    ///
    /// # Arguments
    ///
    /// * `meta` - Layout of the current boot
    /// * `sig_blob` - Signature descriptors, one per object
    ///
    /// # Returns
    ///
    /// * `LsVerificationInfo` - Identity of both objects on success
    pub fn verify_boot_objects(
        &mut self,
        meta: &mut WprMetadata,
        sig_blob: &[u8],
    ) -> BooterResult<LsVerificationInfo> {
        meta.clear_verified();

        let image_desc = SignatureDescriptors::new(sig_blob).find(IMAGE_UCODE_ID)?;
        let bootloader_desc = SignatureDescriptors::new(sig_blob).find(BOOTLOADER_UCODE_ID)?;

        let image = self.verify(
            &image_desc,
            FbImage {
                offset: meta.image_offset,
                len: meta.size_of_radix3_image,
            },
            &[],
        )?;
        let bootloader = self.verify(
            &bootloader_desc,
            FbImage {
                offset: meta.boot_bin_offset,
                len: meta.size_of_bootloader,
            },
            &[image],
        )?;

        meta.set_verified();
        Ok(LsVerificationInfo { image, bootloader })
    }

    /// Verify one object against its descriptor.
    ///
    /// # Arguments
    ///
    /// * `desc` - Signature descriptor
    /// * `image` - Object location in FB
    /// * `verified` - Objects already verified this boot, used to satisfy
    ///   the descriptor's dependency map
    pub fn verify(
        &mut self,
        desc: &SignatureDescriptor,
        image: FbImage,
        verified: &[VerifiedObject],
    ) -> BooterResult<VerifiedObject> {
        self.check_descriptor(desc)?;
        if image.len == 0 {
            return Err(BooterError::IMAGE_VERIFIER_SIGNATURE_INVALID);
        }

        let debug = self.env.debug_mode()?;
        let key = self.env.ls_pub_key(debug);
        let sig = desc.signature(debug);
        if !key.is_well_formed() || sig.as_slice() >= key.modulus.as_slice() {
            return Err(BooterError::IMAGE_VERIFIER_SIGNATURE_INVALID);
        }

        let digest = self.digest(desc, image)?;
        let em = self.env.rsa3072_public(sig, &key)?;
        crate::pss::verify(&mut self.env, em.expose(), &digest)?;

        for dep in desc.deps() {
            let met = verified
                .iter()
                .any(|obj| obj.ucode_id == dep.id && obj.ucode_version >= dep.min_version);
            if !met {
                return Err(BooterError::IMAGE_VERIFIER_SIGNATURE_INVALID);
            }
        }

        self.check_revocation(desc.ucode_id, desc.ucode_version)?;

        cprintln!(
            "[verify] ucode {} v{} digest {}",
            desc.ucode_id,
            desc.ucode_version,
            HexBytes(&digest)
        );
        Ok(VerifiedObject {
            ucode_id: desc.ucode_id,
            ucode_version: desc.ucode_version,
            digest,
        })
    }

    /// Check `version` of `branch` against the revocation floors.
    pub fn check_revocation(&self, branch: u32, version: u32) -> BooterResult<()> {
        crate::revocation::check_revocation(|index| self.env.revocation_scratch(index), branch, version)
    }

    /// Check the running booter's own version against the fuse floor.
    pub fn check_booter_version(&self, booter_version: u32) -> BooterResult<()> {
        crate::revocation::check_fuse_version(booter_version, self.env.fuse_version()?)
    }

    fn check_descriptor(&self, desc: &SignatureDescriptor) -> BooterResult<()> {
        if desc.falcon_id != self.env.falcon_id()
            || desc.hash_algo != LS_SIG_HASH_ALGO_SHA256
            || desc.sig_algo != LS_SIG_SIG_ALGO_RSA3072
            || desc.sig_padding != LS_SIG_PADDING_PSS
        {
            return Err(BooterError::IMAGE_VERIFIER_SIGNATURE_INVALID);
        }
        Ok(())
    }

    /// Digest `image || digest_tail(desc)`. The block-aligned prefix is
    /// hashed by the engine straight out of FB; the remainder and the tail
    /// go in one final local chunk.
    fn digest(&mut self, desc: &SignatureDescriptor, image: FbImage) -> BooterResult<Sha256Digest> {
        let bulk_len = image.len & !(SHA_BLOCK - 1);
        let rem = (image.len - bulk_len) as usize;
        let base = image.offset;
        base.checked_add(image.len)
            .ok_or(BooterError::DRIVER_ADDRESS_OVERFLOW)?;

        let mut tail = [0u8; SHA256_BLOCK_BYTE_SIZE + MAX_DIGEST_TAIL_SIZE];
        if rem != 0 {
            self.env.fb_read(base + bulk_len, &mut tail[..rem])?;
        }
        let mut meta_tail = [0u8; MAX_DIGEST_TAIL_SIZE];
        let meta_len = desc.digest_tail(&mut meta_tail);
        tail[rem..rem + meta_len].copy_from_slice(&meta_tail[..meta_len]);
        let tail_len = rem + meta_len;

        let bulk = (0..bulk_len)
            .step_by(SHA_MAX_TASK_SIZE as usize)
            .map(move |start| ShaChunk::Fb {
                offset: base + start,
                len: (bulk_len - start).min(SHA_MAX_TASK_SIZE),
            });
        let mut chunks = bulk.chain(core::iter::once(ShaChunk::Local(&tail[..tail_len])));
        self.env
            .sha256_digest_chunks(bulk_len + tail_len as u64, &mut chunks)
    }
}
