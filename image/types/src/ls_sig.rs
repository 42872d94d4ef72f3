/*++

Licensed under the Apache-2.0 license.

File Name:

   ls_sig.rs

Abstract:

    File contains the LS signature descriptor wire format.

--*/

use booter_error::{BooterError, BooterResult};
use zerocopy::{AsBytes, FromBytes};

use crate::{Rsa3072Signature, RSA3072_BYTE_SIZE};

/// "LSIG"
pub const LS_SIG_IDENTIFIER: u32 = 0x4749_534c;
pub const LS_SIG_VERSION_2: u32 = 2;
pub const LS_SIG_HASH_ALGO_SHA256: u32 = 1;
pub const LS_SIG_SIG_ALGO_RSA3072: u32 = 1;
pub const LS_SIG_PADDING_PSS: u32 = 1;
pub const MAX_DEP_MAP_ENTRIES: usize = 11;

/// falcon_id, ucode_version, ucode_id and the dependency pairs.
pub const MAX_DIGEST_TAIL_SIZE: usize = 12 + MAX_DEP_MAP_ENTRIES * DEP_MAP_ENTRY_SIZE;

const HEADER_SIZE: usize = core::mem::size_of::<LsSigHeader>();
const FIXED_SIZE: usize = core::mem::size_of::<LsSigV2Fixed>();
const DEP_MAP_ENTRY_SIZE: usize = core::mem::size_of::<DepMapEntry>();

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsSigHeader {
    pub identifier: u32,
    pub version: u32,

    /// Total descriptor size including this header.
    pub size: u32,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LsSigV2Fixed {
    pub falcon_id: u32,
    pub ucode_version: u32,
    pub ucode_id: u32,
    pub hash_algo: u32,
    pub sig_algo: u32,
    pub sig_padding: u32,
    pub dep_map_count: u32,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, Default, Debug, Copy, Clone, Eq, PartialEq)]
pub struct DepMapEntry {
    pub id: u32,
    pub min_version: u32,
}

/// Parsed version 2 signature descriptor.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SignatureDescriptor {
    pub falcon_id: u32,
    pub ucode_version: u32,
    pub ucode_id: u32,
    pub hash_algo: u32,
    pub sig_algo: u32,
    pub sig_padding: u32,
    dep_map: [DepMapEntry; MAX_DEP_MAP_ENTRIES],
    dep_map_count: usize,
    pub prod_sig: Rsa3072Signature,
    pub debug_sig: Rsa3072Signature,
}

impl SignatureDescriptor {
    /// Descriptor for `ucode_id` using SHA-256, RSA-3072 and PSS, with empty
    /// signature slots.
    pub fn new(falcon_id: u32, ucode_id: u32, ucode_version: u32) -> Self {
        Self {
            falcon_id,
            ucode_version,
            ucode_id,
            hash_algo: LS_SIG_HASH_ALGO_SHA256,
            sig_algo: LS_SIG_SIG_ALGO_RSA3072,
            sig_padding: LS_SIG_PADDING_PSS,
            dep_map: [DepMapEntry::default(); MAX_DEP_MAP_ENTRIES],
            dep_map_count: 0,
            prod_sig: [0; RSA3072_BYTE_SIZE],
            debug_sig: [0; RSA3072_BYTE_SIZE],
        }
    }

    pub const fn encoded_size(dep_map_count: usize) -> usize {
        HEADER_SIZE + FIXED_SIZE + dep_map_count * DEP_MAP_ENTRY_SIZE + 2 * RSA3072_BYTE_SIZE
    }

    /// Parse one descriptor from the front of `bytes`.
    ///
    /// # Returns
    ///
    /// The descriptor and the number of bytes it occupied
    pub fn parse(bytes: &[u8]) -> BooterResult<(Self, usize)> {
        let err = BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED;

        let header = LsSigHeader::read_from_prefix(bytes).ok_or(err)?;
        if header.identifier != LS_SIG_IDENTIFIER || header.version != LS_SIG_VERSION_2 {
            return Err(err);
        }
        let size = header.size as usize;
        let body = bytes.get(HEADER_SIZE..size).ok_or(err)?;

        let fixed = LsSigV2Fixed::read_from_prefix(body).ok_or(err)?;
        let count = fixed.dep_map_count as usize;
        if count > MAX_DEP_MAP_ENTRIES || size != Self::encoded_size(count) {
            return Err(err);
        }

        let mut desc = Self::new(fixed.falcon_id, fixed.ucode_id, fixed.ucode_version);
        desc.hash_algo = fixed.hash_algo;
        desc.sig_algo = fixed.sig_algo;
        desc.sig_padding = fixed.sig_padding;
        desc.dep_map_count = count;

        let mut rest = body.get(FIXED_SIZE..).ok_or(err)?;
        for entry in desc.dep_map.iter_mut().take(count) {
            *entry = DepMapEntry::read_from_prefix(rest).ok_or(err)?;
            rest = rest.get(DEP_MAP_ENTRY_SIZE..).ok_or(err)?;
        }
        desc.prod_sig
            .copy_from_slice(rest.get(..RSA3072_BYTE_SIZE).ok_or(err)?);
        desc.debug_sig
            .copy_from_slice(rest.get(RSA3072_BYTE_SIZE..).ok_or(err)?);

        Ok((desc, size))
    }

    pub fn deps(&self) -> &[DepMapEntry] {
        &self.dep_map[..self.dep_map_count]
    }

    pub fn push_dep(&mut self, id: u32, min_version: u32) -> BooterResult<()> {
        let slot = self
            .dep_map
            .get_mut(self.dep_map_count)
            .ok_or(BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED)?;
        *slot = DepMapEntry { id, min_version };
        self.dep_map_count += 1;
        Ok(())
    }

    pub fn signature(&self, debug: bool) -> &Rsa3072Signature {
        if debug {
            &self.debug_sig
        } else {
            &self.prod_sig
        }
    }

    pub fn signature_mut(&mut self, debug: bool) -> &mut Rsa3072Signature {
        if debug {
            &mut self.debug_sig
        } else {
            &mut self.prod_sig
        }
    }

    /// Bytes hashed after the image: falcon_id, ucode_version, ucode_id and
    /// the dependency map, all little-endian.
    ///
    /// # Returns
    ///
    /// Number of bytes written to `out`
    pub fn digest_tail(&self, out: &mut [u8; MAX_DIGEST_TAIL_SIZE]) -> usize {
        let mut len = 0;
        let mut put = |val: u32| {
            out[len..len + 4].copy_from_slice(&val.to_le_bytes());
            len += 4;
        };
        put(self.falcon_id);
        put(self.ucode_version);
        put(self.ucode_id);
        for dep in self.deps() {
            put(dep.id);
            put(dep.min_version);
        }
        len
    }

    #[cfg(feature = "std")]
    pub fn to_bytes(&self) -> Vec<u8> {
        let size = Self::encoded_size(self.dep_map_count);
        let mut out = Vec::with_capacity(size);
        out.extend_from_slice(
            LsSigHeader {
                identifier: LS_SIG_IDENTIFIER,
                version: LS_SIG_VERSION_2,
                size: size as u32,
            }
            .as_bytes(),
        );
        out.extend_from_slice(
            LsSigV2Fixed {
                falcon_id: self.falcon_id,
                ucode_version: self.ucode_version,
                ucode_id: self.ucode_id,
                hash_algo: self.hash_algo,
                sig_algo: self.sig_algo,
                sig_padding: self.sig_padding,
                dep_map_count: self.dep_map_count as u32,
            }
            .as_bytes(),
        );
        for dep in self.deps() {
            out.extend_from_slice(dep.as_bytes());
        }
        out.extend_from_slice(&self.prod_sig);
        out.extend_from_slice(&self.debug_sig);
        out
    }
}

/// Iterator over the descriptors packed back to back in a signature blob.
pub struct SignatureDescriptors<'a> {
    bytes: &'a [u8],
}

impl<'a> SignatureDescriptors<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// First descriptor for `ucode_id`.
    pub fn find(self, ucode_id: u32) -> BooterResult<SignatureDescriptor> {
        for desc in self {
            let desc = desc?;
            if desc.ucode_id == ucode_id {
                return Ok(desc);
            }
        }
        Err(BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED)
    }
}

impl Iterator for SignatureDescriptors<'_> {
    type Item = BooterResult<SignatureDescriptor>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        match SignatureDescriptor::parse(self.bytes) {
            Ok((desc, size)) => {
                self.bytes = self.bytes.get(size..).unwrap_or_default();
                Some(Ok(desc))
            }
            Err(err) => {
                self.bytes = &[];
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SignatureDescriptor {
        let mut desc = SignatureDescriptor::new(0x0B, 5, 3);
        desc.push_dep(4, 2).unwrap();
        desc.prod_sig = [0x11; RSA3072_BYTE_SIZE];
        desc.debug_sig = [0x22; RSA3072_BYTE_SIZE];
        desc
    }

    #[test]
    fn test_wire_sizes() {
        assert_eq!(HEADER_SIZE, 12);
        assert_eq!(FIXED_SIZE, 28);
        assert_eq!(SignatureDescriptor::encoded_size(0), 808);
        assert_eq!(
            SignatureDescriptor::encoded_size(MAX_DEP_MAP_ENTRIES),
            808 + 88
        );
    }

    #[test]
    fn test_parse_wire_bytes() {
        let desc = sample();
        let bytes = desc.to_bytes();
        assert_eq!(&bytes[..4], b"LSIG");
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &(bytes.len() as u32).to_le_bytes());
        // dep map follows the fixed fields
        assert_eq!(&bytes[40..44], &4u32.to_le_bytes());
        assert_eq!(&bytes[44..48], &2u32.to_le_bytes());

        let (parsed, size) = SignatureDescriptor::parse(&bytes).unwrap();
        assert_eq!(size, bytes.len());
        assert_eq!(parsed, desc);
        assert_eq!(parsed.signature(false)[0], 0x11);
        assert_eq!(parsed.signature(true)[0], 0x22);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        let bytes = sample().to_bytes();
        let err = Err(BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED);

        let mut bad = bytes.clone();
        bad[0] = b'X';
        assert_eq!(SignatureDescriptor::parse(&bad), err);

        let mut bad = bytes.clone();
        bad[4] = 1;
        assert_eq!(SignatureDescriptor::parse(&bad), err);

        // declared size larger than the buffer
        assert_eq!(SignatureDescriptor::parse(&bytes[..bytes.len() - 1]), err);

        // dependency count disagrees with size
        let mut bad = bytes.clone();
        bad[36] = 2;
        assert_eq!(SignatureDescriptor::parse(&bad), err);

        let mut bad = bytes;
        bad[36] = MAX_DEP_MAP_ENTRIES as u8 + 1;
        assert_eq!(SignatureDescriptor::parse(&bad), err);
    }

    #[test]
    fn test_digest_tail() {
        let desc = sample();
        let mut tail = [0u8; MAX_DIGEST_TAIL_SIZE];
        let len = desc.digest_tail(&mut tail);
        assert_eq!(len, 20);
        assert_eq!(
            &tail[..len],
            &[
                0x0B, 0, 0, 0, 3, 0, 0, 0, 5, 0, 0, 0, 4, 0, 0, 0, 2, 0, 0, 0
            ]
        );
    }

    #[test]
    fn test_push_dep_limit() {
        let mut desc = SignatureDescriptor::new(0x0B, 4, 1);
        for i in 0..MAX_DEP_MAP_ENTRIES as u32 {
            desc.push_dep(i, i).unwrap();
        }
        assert_eq!(
            desc.push_dep(99, 1),
            Err(BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED)
        );
        assert_eq!(desc.deps().len(), MAX_DEP_MAP_ENTRIES);
    }

    #[test]
    fn test_descriptor_iteration() {
        let image = SignatureDescriptor::new(0x0B, 4, 2);
        let bootloader = sample();
        let mut blob = image.to_bytes();
        blob.extend_from_slice(&bootloader.to_bytes());

        let all: Vec<_> = SignatureDescriptors::new(&blob)
            .collect::<BooterResult<_>>()
            .unwrap();
        assert_eq!(all, vec![image.clone(), bootloader.clone()]);

        assert_eq!(SignatureDescriptors::new(&blob).find(5).unwrap(), bootloader);
        assert_eq!(
            SignatureDescriptors::new(&blob).find(9),
            Err(BooterError::IMAGE_VERIFIER_DESCRIPTOR_MALFORMED)
        );

        blob.push(0);
        let results: Vec<_> = SignatureDescriptors::new(&blob).collect();
        assert_eq!(results.len(), 3);
        assert!(results[2].is_err());
    }
}
