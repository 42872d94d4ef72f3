/*++

Licensed under the Apache-2.0 license.

File Name:

    pka.rs

Abstract:

    File contains API for the public key accelerator.

--*/

use booter_error::{BooterError, BooterResult};
use booter_image_types::{RSA3072_BYTE_SIZE, RSA3072_WORD_SIZE};

use crate::memory_layout::PKA_TIMEOUT_NS;
use crate::{wait, CryptoMutex, MutexGuard, Secret, Timer};

/// Operand in little-endian 32-bit words, least significant word first.
pub type PkaWords = [u32; RSA3072_WORD_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkaOperand {
    Base,
    Exponent,
    Modulus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkaOperation {
    ModExp,
}

/// PKA programming interface.
pub trait PkaEngine {
    fn acquire_mutex(&mut self, token: u32) -> bool;

    fn release_mutex(&mut self, token: u32);

    fn load_operand(&mut self, operand: PkaOperand, words: &PkaWords) -> BooterResult<()>;

    fn start(&mut self, op: PkaOperation) -> BooterResult<()>;

    fn busy(&self) -> bool;

    fn read_result(&mut self, out: &mut PkaWords) -> BooterResult<()>;

    /// Clear operand and result memory.
    fn scrub(&mut self);
}

struct PkaOp<'e> {
    engine: &'e mut dyn PkaEngine,
    token: u32,
}

impl Drop for PkaOp<'_> {
    fn drop(&mut self) {
        self.engine.scrub();
        self.engine.release_mutex(self.token);
    }
}

pub struct Pka<'a> {
    engine: &'a mut dyn PkaEngine,
    timer: &'a dyn Timer,
}

impl<'a> Pka<'a> {
    pub fn new(engine: &'a mut dyn PkaEngine, timer: &'a dyn Timer) -> Self {
        Self { engine, timer }
    }

    /// Compute `base ^ exponent mod modulus` on big-endian operands.
    pub fn modexp(
        &mut self,
        crypto: &MutexGuard<'_, CryptoMutex>,
        base: &[u8; RSA3072_BYTE_SIZE],
        modulus: &[u8; RSA3072_BYTE_SIZE],
        exponent: u32,
    ) -> BooterResult<Secret<[u8; RSA3072_BYTE_SIZE]>> {
        let token = crypto.token();
        if !self.engine.acquire_mutex(token) {
            return Err(BooterError::DRIVER_PKA_ENGINE_BUSY);
        }
        let op = PkaOp {
            engine: &mut *self.engine,
            token,
        };

        let mut words = Secret::new([0u32; RSA3072_WORD_SIZE]);
        be_bytes_to_words(base, words.expose_mut());
        op.engine.load_operand(PkaOperand::Base, words.expose())?;
        be_bytes_to_words(modulus, words.expose_mut());
        op.engine.load_operand(PkaOperand::Modulus, words.expose())?;
        let mut exp = [0u32; RSA3072_WORD_SIZE];
        exp[0] = exponent;
        op.engine.load_operand(PkaOperand::Exponent, &exp)?;

        op.engine.start(PkaOperation::ModExp)?;
        wait::until(
            self.timer,
            PKA_TIMEOUT_NS,
            BooterError::DRIVER_PKA_TIMEOUT,
            || Ok(!op.engine.busy()),
        )?;
        op.engine.read_result(words.expose_mut())?;

        let mut out = Secret::new([0u8; RSA3072_BYTE_SIZE]);
        words_to_be_bytes(words.expose(), out.expose_mut());
        Ok(out)
    }
}

/// Big-endian bytes to little-endian words.
pub fn be_bytes_to_words(bytes: &[u8; RSA3072_BYTE_SIZE], words: &mut PkaWords) {
    for (word, chunk) in words.iter_mut().zip(bytes.rchunks_exact(4)) {
        *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
}

/// Little-endian words to big-endian bytes.
pub fn words_to_be_bytes(words: &PkaWords, bytes: &mut [u8; RSA3072_BYTE_SIZE]) {
    for (chunk, word) in bytes.rchunks_exact_mut(4).zip(words.iter()) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
}
