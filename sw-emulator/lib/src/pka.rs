/*++

Licensed under the Apache-2.0 license.

File Name:

    pka.rs

Abstract:

    File contains the emulated public key accelerator.

--*/

use booter_drivers::{
    be_bytes_to_words, words_to_be_bytes, PkaEngine, PkaOperand, PkaOperation, PkaWords,
};
use booter_error::{BooterError, BooterResult};
use booter_image_types::{RSA3072_BYTE_SIZE, RSA3072_WORD_SIZE};
use openssl::bn::{BigNum, BigNumContext};

pub struct EmuPka {
    base: PkaWords,
    exponent: PkaWords,
    modulus: PkaWords,
    result: Option<PkaWords>,
    owner: Option<u32>,

    /// Set by every scrub, cleared by every start.
    pub scrubbed: bool,
}

impl Default for EmuPka {
    fn default() -> Self {
        Self {
            base: [0; RSA3072_WORD_SIZE],
            exponent: [0; RSA3072_WORD_SIZE],
            modulus: [0; RSA3072_WORD_SIZE],
            result: None,
            owner: None,
            scrubbed: false,
        }
    }
}

fn to_bignum(words: &PkaWords) -> BooterResult<BigNum> {
    let mut bytes = [0u8; RSA3072_BYTE_SIZE];
    words_to_be_bytes(words, &mut bytes);
    BigNum::from_slice(&bytes).map_err(|_| BooterError::DRIVER_PKA_INVALID_OPERAND)
}

impl EmuPka {
    pub fn owner(&self) -> Option<u32> {
        self.owner
    }

    fn modexp(&self) -> BooterResult<PkaWords> {
        let err = |_| BooterError::DRIVER_PKA_INVALID_OPERAND;
        let base = to_bignum(&self.base)?;
        let exponent = to_bignum(&self.exponent)?;
        let modulus = to_bignum(&self.modulus)?;
        if modulus.num_bits() == 0 {
            return Err(BooterError::DRIVER_PKA_INVALID_OPERAND);
        }

        let mut ctx = BigNumContext::new().map_err(err)?;
        let mut result = BigNum::new().map_err(err)?;
        result.mod_exp(&base, &exponent, &modulus, &mut ctx).map_err(err)?;

        let bytes: [u8; RSA3072_BYTE_SIZE] = result
            .to_vec_padded(RSA3072_BYTE_SIZE as i32)
            .map_err(err)?
            .try_into()
            .map_err(|_| BooterError::DRIVER_PKA_INVALID_OPERAND)?;
        let mut words = [0u32; RSA3072_WORD_SIZE];
        be_bytes_to_words(&bytes, &mut words);
        Ok(words)
    }
}

impl PkaEngine for EmuPka {
    fn acquire_mutex(&mut self, token: u32) -> bool {
        match self.owner {
            Some(owner) if owner != token => false,
            _ => {
                self.owner = Some(token);
                true
            }
        }
    }

    fn release_mutex(&mut self, token: u32) {
        if self.owner == Some(token) {
            self.owner = None;
        }
    }

    fn load_operand(&mut self, operand: PkaOperand, words: &PkaWords) -> BooterResult<()> {
        match operand {
            PkaOperand::Base => self.base = *words,
            PkaOperand::Exponent => self.exponent = *words,
            PkaOperand::Modulus => self.modulus = *words,
        }
        Ok(())
    }

    fn start(&mut self, op: PkaOperation) -> BooterResult<()> {
        self.scrubbed = false;
        self.result = None;
        match op {
            PkaOperation::ModExp => self.result = Some(self.modexp()?),
        }
        Ok(())
    }

    fn busy(&self) -> bool {
        false
    }

    fn read_result(&mut self, out: &mut PkaWords) -> BooterResult<()> {
        *out = self.result.ok_or(BooterError::DRIVER_PKA_INVALID_OPERAND)?;
        Ok(())
    }

    fn scrub(&mut self) {
        self.base = [0; RSA3072_WORD_SIZE];
        self.exponent = [0; RSA3072_WORD_SIZE];
        self.modulus = [0; RSA3072_WORD_SIZE];
        self.result = None;
        self.scrubbed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmuBus, EmuTimer};
    use booter_drivers::{CryptoMutex, MutexGuard, Pka, PlatformOps, TU10X};

    fn be(value: u32) -> [u8; RSA3072_BYTE_SIZE] {
        let mut bytes = [0u8; RSA3072_BYTE_SIZE];
        bytes[RSA3072_BYTE_SIZE - 4..].copy_from_slice(&value.to_be_bytes());
        bytes
    }

    #[test]
    fn test_modexp() {
        let bus = EmuBus::new(&TU10X, 64);
        let timer = EmuTimer::default();
        let crypto = MutexGuard::<CryptoMutex>::acquire(&bus, TU10X.regs(), &timer).unwrap();
        let mut engine = EmuPka::default();

        let out = Pka::new(&mut engine, &timer)
            .modexp(&crypto, &be(4), &be(497), 13)
            .unwrap();
        // 4^13 mod 497 = 445
        assert_eq!(out.expose(), &be(445));
        assert!(engine.scrubbed);
        assert_eq!(engine.owner(), None);
    }

    #[test]
    fn test_zero_modulus() {
        let bus = EmuBus::new(&TU10X, 64);
        let timer = EmuTimer::default();
        let crypto = MutexGuard::<CryptoMutex>::acquire(&bus, TU10X.regs(), &timer).unwrap();
        let mut engine = EmuPka::default();
        assert_eq!(
            Pka::new(&mut engine, &timer)
                .modexp(&crypto, &be(4), &be(0), 3)
                .err(),
            Some(BooterError::DRIVER_PKA_INVALID_OPERAND)
        );
        assert!(engine.scrubbed);
    }
}
