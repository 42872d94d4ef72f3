/*++

Licensed under the Apache-2.0 license.

File Name:

   lib.rs

Abstract:

    File contains the wire formats shared between the requester, the booter
    and the target firmware.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod ls_sig;
mod wpr_meta;

use zerocopy::{AsBytes, FromBytes};
use zeroize::Zeroize;

pub use ls_sig::{
    DepMapEntry, LsSigHeader, LsSigV2Fixed, SignatureDescriptor, SignatureDescriptors,
    LS_SIG_HASH_ALGO_SHA256, LS_SIG_IDENTIFIER, LS_SIG_PADDING_PSS, LS_SIG_SIG_ALGO_RSA3072,
    LS_SIG_VERSION_2, MAX_DEP_MAP_ENTRIES, MAX_DIGEST_TAIL_SIZE,
};
pub use wpr_meta::{
    WprMetadata, MAX_SIGNATURE_BLOB_SIZE, WPR_HEADERS_SIZE, WPR_META_MAGIC, WPR_META_PAGE_SIZE,
    WPR_META_REVISION, WPR_META_SIZE, WPR_META_VERIFIED,
};

pub const SHA256_DIGEST_BYTE_SIZE: usize = 32;
pub const SHA256_BLOCK_BYTE_SIZE: usize = 64;
pub const RSA3072_BYTE_SIZE: usize = 384;
pub const RSA3072_WORD_SIZE: usize = RSA3072_BYTE_SIZE / 4;
pub const RSA3072_BIT_SIZE: usize = RSA3072_BYTE_SIZE * 8;

/// Falcon that runs the verified firmware.
pub const FALCON_ID_GSP: u32 = 0x0B;

/// Ucode ID of the firmware image; doubles as its revocation branch.
pub const IMAGE_UCODE_ID: u32 = 4;

/// Ucode ID of the bootloader; doubles as its revocation branch.
pub const BOOTLOADER_UCODE_ID: u32 = 5;

pub type Sha256Digest = [u8; SHA256_DIGEST_BYTE_SIZE];
pub type Rsa3072Signature = [u8; RSA3072_BYTE_SIZE];

/// RSA-3072 public key. The modulus is big-endian.
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Copy, Clone, Eq, PartialEq, Zeroize)]
pub struct Rsa3072PubKey {
    pub modulus: [u8; RSA3072_BYTE_SIZE],
    pub exponent: u32,
}

impl Rsa3072PubKey {
    pub const DEFAULT_EXPONENT: u32 = 65537;

    pub const fn new(modulus: [u8; RSA3072_BYTE_SIZE]) -> Self {
        Self {
            modulus,
            exponent: Self::DEFAULT_EXPONENT,
        }
    }

    /// A usable modulus is odd and has its top bit set.
    pub fn is_well_formed(&self) -> bool {
        self.modulus[0] & 0x80 != 0
            && self.modulus[RSA3072_BYTE_SIZE - 1] & 1 != 0
            && self.exponent > 1
    }
}

impl Default for Rsa3072PubKey {
    fn default() -> Self {
        Self {
            modulus: [0; RSA3072_BYTE_SIZE],
            exponent: 0,
        }
    }
}

/// Production and debug LS verification keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsKeys {
    pub prod: Rsa3072PubKey,
    pub debug: Rsa3072PubKey,
}

impl LsKeys {
    pub fn select(&self, debug: bool) -> &Rsa3072PubKey {
        if debug {
            &self.debug
        } else {
            &self.prod
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pub_key_size() {
        assert_eq!(core::mem::size_of::<Rsa3072PubKey>(), RSA3072_BYTE_SIZE + 4);
    }

    #[test]
    fn test_zero_key_is_not_well_formed() {
        assert!(!Rsa3072PubKey::default().is_well_formed());
        assert!(!Rsa3072PubKey::new([0; RSA3072_BYTE_SIZE]).is_well_formed());

        let mut modulus = [0xff; RSA3072_BYTE_SIZE];
        assert!(Rsa3072PubKey::new(modulus).is_well_formed());
        modulus[RSA3072_BYTE_SIZE - 1] = 0xfe;
        assert!(!Rsa3072PubKey::new(modulus).is_well_formed());
    }

    #[test]
    fn test_select_key() {
        let keys = LsKeys {
            prod: Rsa3072PubKey::new([1; RSA3072_BYTE_SIZE]),
            debug: Rsa3072PubKey::new([2; RSA3072_BYTE_SIZE]),
        };
        assert_eq!(keys.select(false).modulus[0], 1);
        assert_eq!(keys.select(true).modulus[0], 2);
    }
}
