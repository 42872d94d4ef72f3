/*++

Licensed under the Apache-2.0 license.

File Name:

    pss.rs

Abstract:

    EMSA-PSS verification for RSA-3072 with SHA-256 and MGF1-SHA-256.

--*/

use booter_error::{BooterError, BooterResult};
use booter_image_types::{Sha256Digest, RSA3072_BYTE_SIZE, SHA256_DIGEST_BYTE_SIZE};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

use crate::LsVerificationEnv;

/// Salt length used by every LS signature.
pub const PSS_SALT_LEN: usize = SHA256_DIGEST_BYTE_SIZE;

const EM_LEN: usize = RSA3072_BYTE_SIZE;
const DB_LEN: usize = EM_LEN - SHA256_DIGEST_BYTE_SIZE - 1;
const PS_LEN: usize = DB_LEN - PSS_SALT_LEN - 1;
const TRAILER: u8 = 0xbc;

/// The encoded message carries `modBits - 1 = 3071` bits, so the top bit of
/// the first byte is always clear.
const TOP_BITS_MASK: u8 = 0x80;

/// Value `ct_memcmp` returns for any mismatch.
pub const CT_MISMATCH: u32 = 1;

/// Constant-time comparison over the full length of both slices.
///
/// # Returns
///
/// `0` if equal, `CT_MISMATCH` otherwise
pub fn ct_memcmp(a: &[u8], b: &[u8]) -> u32 {
    u32::conditional_select(&CT_MISMATCH, &0, a.ct_eq(b))
}

/// Check the encoded message `em` recovered from a signature against
/// `m_hash`, the digest of the signed message.
pub(crate) fn verify<Env: LsVerificationEnv>(
    env: &mut Env,
    em: &[u8; EM_LEN],
    m_hash: &Sha256Digest,
) -> BooterResult<()> {
    let (masked_db, rest) = em.split_at(DB_LEN);
    let (h, trailer) = rest.split_at(SHA256_DIGEST_BYTE_SIZE);

    let mut ok = trailer[0].ct_eq(&TRAILER);
    ok &= (masked_db[0] & TOP_BITS_MASK).ct_eq(&0);

    let mut db = [0u8; DB_LEN];
    db.copy_from_slice(masked_db);
    mgf1_xor(env, h, &mut db)?;
    db[0] &= !TOP_BITS_MASK;

    ok &= db[..PS_LEN].ct_eq(&[0u8; PS_LEN][..]);
    ok &= db[PS_LEN].ct_eq(&0x01);
    let salt = &db[PS_LEN + 1..];

    let mut m_prime = [0u8; 8 + SHA256_DIGEST_BYTE_SIZE + PSS_SALT_LEN];
    m_prime[8..8 + SHA256_DIGEST_BYTE_SIZE].copy_from_slice(m_hash);
    m_prime[8 + SHA256_DIGEST_BYTE_SIZE..].copy_from_slice(salt);
    let h_prime = env.sha256_digest(&m_prime)?;

    ok &= Choice::from((ct_memcmp(h, &h_prime) == 0) as u8);
    if bool::from(ok) {
        Ok(())
    } else {
        Err(BooterError::IMAGE_VERIFIER_SIGNATURE_INVALID)
    }
}

/// XOR `MGF1-SHA-256(seed, out.len())` into `out`.
fn mgf1_xor<Env: LsVerificationEnv>(env: &mut Env, seed: &[u8], out: &mut [u8]) -> BooterResult<()> {
    let mut input = [0u8; SHA256_DIGEST_BYTE_SIZE + 4];
    input[..SHA256_DIGEST_BYTE_SIZE].copy_from_slice(seed);
    for (counter, block) in out.chunks_mut(SHA256_DIGEST_BYTE_SIZE).enumerate() {
        input[SHA256_DIGEST_BYTE_SIZE..].copy_from_slice(&(counter as u32).to_be_bytes());
        let mask = env.sha256_digest(&input)?;
        for (byte, m) in block.iter_mut().zip(mask.iter()) {
            *byte ^= m;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_layout_constants() {
        assert_eq!(DB_LEN, 351);
        assert_eq!(PS_LEN, 318);
    }

    #[test]
    fn test_ct_memcmp() {
        assert_eq!(ct_memcmp(b"abc", b"abc"), 0);
        assert_eq!(ct_memcmp(b"abc", b"abd"), CT_MISMATCH);
        assert_eq!(ct_memcmp(b"abc", b"ab"), CT_MISMATCH);
        assert_eq!(ct_memcmp(b"", b""), 0);
    }

    proptest! {
        #[test]
        fn ct_memcmp_result_does_not_depend_on_position(
            data in proptest::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut other = data.clone();
            let i = index.index(data.len());
            other[i] ^= flip;
            prop_assert_eq!(ct_memcmp(&data, &other), CT_MISMATCH);
            prop_assert_eq!(ct_memcmp(&data, &data), 0);
        }
    }
}
