/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    Booter LS verification environment. Binds the verifier to the
    accelerators, FB and fuses under a held crypto mutex.

--*/

use booter_drivers::{CryptoMutex, Dma, FuseBank, MutexGuard, Pka, Secret, Sha256, ShaChunk};
use booter_error::BooterResult;
use booter_image_types::*;
use booter_image_verify::LsVerificationEnv;

use crate::env::BooterEnv;

/// LS verification environment
pub struct BooterVerificationEnv<'a> {
    pub sha256: Sha256<'a>,
    pub pka: Pka<'a>,
    pub dma: Dma<'a>,
    pub fuses: FuseBank<'a>,
    pub crypto: &'a MutexGuard<'a, CryptoMutex>,
    pub keys: &'a LsKeys,
}

impl<'a> BooterVerificationEnv<'a> {
    pub fn new(env: &'a mut BooterEnv<'_>, crypto: &'a MutexGuard<'a, CryptoMutex>) -> Self {
        let timer = env.timer;
        Self {
            sha256: Sha256::new(&mut *env.sha, timer),
            pka: Pka::new(&mut *env.pka, timer),
            dma: Dma::new(&mut *env.dma, timer),
            fuses: FuseBank::new(env.bus, env.platform),
            crypto,
            keys: env.keys,
        }
    }
}

impl LsVerificationEnv for BooterVerificationEnv<'_> {
    /// Calculate the SHA-256 digest of a local buffer
    fn sha256_digest(&mut self, data: &[u8]) -> BooterResult<Sha256Digest> {
        self.sha256.digest(self.crypto, data)
    }

    /// Calculate the SHA-256 digest of a message split into chunks
    fn sha256_digest_chunks<'b>(
        &mut self,
        total_len: u64,
        chunks: &mut dyn Iterator<Item = ShaChunk<'b>>,
    ) -> BooterResult<Sha256Digest> {
        self.sha256.digest_chunks(self.crypto, total_len, chunks)
    }

    fn fb_read(&mut self, offset: u64, buf: &mut [u8]) -> BooterResult<()> {
        self.dma.read_fb(offset, buf)
    }

    fn rsa3072_public(
        &mut self,
        sig: &Rsa3072Signature,
        key: &Rsa3072PubKey,
    ) -> BooterResult<Secret<[u8; RSA3072_BYTE_SIZE]>> {
        self.pka.modexp(self.crypto, sig, &key.modulus, key.exponent)
    }

    fn debug_mode(&self) -> BooterResult<bool> {
        self.fuses.debug_mode()
    }

    fn ls_pub_key(&self, debug: bool) -> Rsa3072PubKey {
        *self.keys.select(debug)
    }

    fn falcon_id(&self) -> u32 {
        FALCON_ID_GSP
    }

    fn revocation_scratch(&self, index: usize) -> BooterResult<u32> {
        self.fuses.revocation_scratch(index)
    }

    fn fuse_version(&self) -> BooterResult<u32> {
        self.fuses.fuse_version()
    }
}
