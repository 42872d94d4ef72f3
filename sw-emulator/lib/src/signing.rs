/*++

Licensed under the Apache-2.0 license.

File Name:

    signing.rs

Abstract:

    File contains the RSA-3072 PSS signer used to produce LS signature
    descriptors for emulated boots.

--*/

use booter_image_types::{
    LsKeys, Rsa3072PubKey, SignatureDescriptor, MAX_DIGEST_TAIL_SIZE, RSA3072_BIT_SIZE,
    RSA3072_BYTE_SIZE, SHA256_DIGEST_BYTE_SIZE,
};
use openssl::error::ErrorStack;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::{Padding, Rsa};
use openssl::sign::{RsaPssSaltlen, Signer};

/// Private halves of the production and debug LS keys.
pub struct SigningKeys {
    pub prod: Rsa<Private>,
    pub debug: Rsa<Private>,
}

fn pub_key(key: &Rsa<Private>) -> Result<Rsa3072PubKey, ErrorStack> {
    let mut modulus = [0u8; RSA3072_BYTE_SIZE];
    modulus.copy_from_slice(&key.n().to_vec_padded(RSA3072_BYTE_SIZE as i32)?);
    Ok(Rsa3072PubKey::new(modulus))
}

impl SigningKeys {
    pub fn generate() -> Result<Self, ErrorStack> {
        Ok(Self {
            prod: Rsa::generate(RSA3072_BIT_SIZE as u32)?,
            debug: Rsa::generate(RSA3072_BIT_SIZE as u32)?,
        })
    }

    /// Public halves in the form the booter is built with.
    pub fn ls_keys(&self) -> Result<LsKeys, ErrorStack> {
        Ok(LsKeys {
            prod: pub_key(&self.prod)?,
            debug: pub_key(&self.debug)?,
        })
    }

    /// Sign `image || digest_tail(desc)` into both signature slots.
    pub fn sign(&self, desc: &mut SignatureDescriptor, image: &[u8]) -> Result<(), ErrorStack> {
        let mut tail = [0u8; MAX_DIGEST_TAIL_SIZE];
        let len = desc.digest_tail(&mut tail);
        let mut msg = image.to_vec();
        msg.extend_from_slice(&tail[..len]);

        for (key, debug) in [(&self.prod, false), (&self.debug, true)] {
            let sig = pss_sign(key, &msg)?;
            desc.signature_mut(debug).copy_from_slice(&sig);
        }
        Ok(())
    }
}

fn pss_sign(key: &Rsa<Private>, msg: &[u8]) -> Result<Vec<u8>, ErrorStack> {
    let pkey = PKey::from_rsa(key.clone())?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey)?;
    signer.set_rsa_padding(Padding::PKCS1_PSS)?;
    signer.set_rsa_pss_saltlen(RsaPssSaltlen::custom(SHA256_DIGEST_BYTE_SIZE as i32))?;
    signer.set_rsa_mgf1_md(MessageDigest::sha256())?;
    signer.update(msg)?;
    signer.sign_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use booter_image_types::{FALCON_ID_GSP, IMAGE_UCODE_ID};
    use openssl::sign::Verifier;

    #[test]
    fn test_signatures_verify_with_openssl() {
        let keys = SigningKeys::generate().unwrap();
        let mut desc = SignatureDescriptor::new(FALCON_ID_GSP, IMAGE_UCODE_ID, 3);
        keys.sign(&mut desc, b"image bytes").unwrap();

        let mut tail = [0u8; MAX_DIGEST_TAIL_SIZE];
        let len = desc.digest_tail(&mut tail);
        let mut msg = b"image bytes".to_vec();
        msg.extend_from_slice(&tail[..len]);

        for (key, debug) in [(&keys.prod, false), (&keys.debug, true)] {
            let pkey = PKey::from_rsa(key.clone()).unwrap();
            let mut verifier = Verifier::new(MessageDigest::sha256(), &pkey).unwrap();
            verifier.set_rsa_padding(Padding::PKCS1_PSS).unwrap();
            verifier.update(&msg).unwrap();
            assert!(verifier.verify(desc.signature(debug)).unwrap());
        }
        assert!(keys.ls_keys().unwrap().prod.is_well_formed());
    }
}
