/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    Booter LS signature verification library.

--*/
#![cfg_attr(not(feature = "std"), no_std)]

mod pss;
pub mod revocation;
mod verifier;

use booter_drivers::{Secret, ShaChunk};
use booter_error::BooterResult;
use booter_image_types::*;

pub use pss::{ct_memcmp, CT_MISMATCH, PSS_SALT_LEN};
pub use verifier::LsVerifier;

/// Location of a verified object in FB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FbImage {
    pub offset: u64,
    pub len: u64,
}

/// Identity of an object that passed verification.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedObject {
    pub ucode_id: u32,
    pub ucode_version: u32,

    /// Digest of the image and its descriptor tail
    pub digest: Sha256Digest,
}

/// Objects verified during one boot
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct LsVerificationInfo {
    pub image: VerifiedObject,
    pub bootloader: VerifiedObject,
}

/// LS Verification Environment
pub trait LsVerificationEnv {
    /// Calculate the SHA-256 digest of a local buffer
    fn sha256_digest(&mut self, data: &[u8]) -> BooterResult<Sha256Digest>;

    /// Calculate the SHA-256 digest of a message split into chunks
    fn sha256_digest_chunks<'b>(
        &mut self,
        total_len: u64,
        chunks: &mut dyn Iterator<Item = ShaChunk<'b>>,
    ) -> BooterResult<Sha256Digest>;

    /// Read bytes from FB
    fn fb_read(&mut self, offset: u64, buf: &mut [u8]) -> BooterResult<()>;

    /// Raw RSA-3072 public operation, `sig ^ e mod n`, big-endian
    fn rsa3072_public(
        &mut self,
        sig: &Rsa3072Signature,
        key: &Rsa3072PubKey,
    ) -> BooterResult<Secret<[u8; RSA3072_BYTE_SIZE]>>;

    /// Whether the chip runs in debug mode
    fn debug_mode(&self) -> BooterResult<bool>;

    /// LS verification key for the given mode
    fn ls_pub_key(&self, debug: bool) -> Rsa3072PubKey;

    /// Falcon the verified ucode runs on
    fn falcon_id(&self) -> u32;

    /// Revocation scratch register `index`
    fn revocation_scratch(&self, index: usize) -> BooterResult<u32>;

    /// Booter version burned in fuses
    fn fuse_version(&self) -> BooterResult<u32>;
}
