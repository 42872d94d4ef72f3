/*++

Licensed under the Apache-2.0 license.

File Name:

    request.rs

Abstract:

    File contains the requester side of a Load: a signed firmware image and
    bootloader staged in system memory, the image scattered behind a radix3
    table, and the metadata block pointing at all of it.

--*/

use booter_error::BooterError;
use booter_image_types::{
    SignatureDescriptor, WprMetadata, BOOTLOADER_UCODE_ID, FALCON_ID_GSP, IMAGE_UCODE_ID,
};
use openssl::error::ErrorStack;

use crate::memory::SysMem;
use crate::signing::SigningKeys;
use crate::soc::EmuSoc;

const PAGE_SIZE: u64 = 4096;
const ENTRIES_PER_TABLE: usize = 512;
const ENTRY_SIZE: u64 = 8;

pub const META_ADDR: u64 = 0x1000_0000;
pub const SIGNATURE_ADDR: u64 = 0x1000_1000;
pub const BOOTLOADER_ADDR: u64 = 0x1001_0000;
pub const RADIX3_BASE: u64 = 0x2000_0000;

#[derive(Debug)]
pub enum RequestError {
    Openssl(ErrorStack),
    Booter(BooterError),
}

impl From<ErrorStack> for RequestError {
    fn from(err: ErrorStack) -> Self {
        RequestError::Openssl(err)
    }
}

impl From<BooterError> for RequestError {
    fn from(err: BooterError) -> Self {
        RequestError::Booter(err)
    }
}

fn pages_for(len: usize, per_page: usize) -> usize {
    (len + per_page - 1) / per_page
}

/// Addresses of every page a built table occupies.
#[derive(Debug, Clone)]
pub struct Radix3Table {
    pub root: u64,
    pub mids: Vec<u64>,
    pub leaves: Vec<u64>,

    /// Data page of each image page, in image order.
    pub pages: Vec<u64>,
}

/// Lays out a radix3 table and its data pages from `base` upwards. Data
/// pages are placed in reverse so that no two neighbours are contiguous.
pub struct Radix3Builder {
    base: u64,
}

impl Radix3Builder {
    pub fn new(base: u64) -> Self {
        Self { base }
    }

    pub fn build(&self, sysmem: &mut SysMem, image: &[u8]) -> Radix3Table {
        let page_count = pages_for(image.len(), PAGE_SIZE as usize).max(1);
        let leaf_count = pages_for(page_count, ENTRIES_PER_TABLE);
        let mid_count = pages_for(leaf_count, ENTRIES_PER_TABLE);

        let mut next = self.base;
        let mut alloc = |count: usize| -> Vec<u64> {
            let pages = (0..count as u64).map(|i| next + i * PAGE_SIZE).collect();
            next += count as u64 * PAGE_SIZE;
            pages
        };
        let root = alloc(1)[0];
        let mids = alloc(mid_count);
        let leaves = alloc(leaf_count);
        let mut pages = alloc(page_count);
        pages.reverse();

        let mut link = |table: u64, index: usize, target: u64| {
            sysmem.write(table + index as u64 * ENTRY_SIZE, &target.to_le_bytes());
        };
        for (i, mid) in mids.iter().enumerate() {
            link(root, i, *mid);
        }
        for (i, leaf) in leaves.iter().enumerate() {
            link(mids[i / ENTRIES_PER_TABLE], i % ENTRIES_PER_TABLE, *leaf);
        }
        for (i, page) in pages.iter().enumerate() {
            link(leaves[i / ENTRIES_PER_TABLE], i % ENTRIES_PER_TABLE, *page);
        }
        for (chunk, page) in image.chunks(PAGE_SIZE as usize).zip(pages.iter()) {
            sysmem.write(*page, chunk);
        }

        Radix3Table {
            root,
            mids,
            leaves,
            pages,
        }
    }
}

/// Everything a requester hands to Load.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub fb_size: u64,
    pub image: Vec<u8>,
    pub image_version: u32,
    pub bootloader: Vec<u8>,
    pub bootloader_version: u32,
    pub bootloader_code_offset: u64,
    pub heap_size: u64,
    pub vga_workspace_size: u64,
    pub non_wpr_heap_size: u64,
}

/// Where a request landed in system memory.
#[derive(Debug, Clone)]
pub struct StagedRequest {
    pub meta: WprMetadata,
    pub signature: Vec<u8>,
    pub radix3: Radix3Table,
}

fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(13).wrapping_add(seed) ^ (i >> 12) as u8)
        .collect()
}

impl LoadRequest {
    /// A request with synthetic firmware of `image_size` bytes.
    pub fn new(fb_size: u64, image_size: usize) -> Self {
        Self {
            fb_size,
            image: pattern(image_size, 0x3c),
            image_version: 3,
            bootloader: pattern(0x2000, 0xb1),
            bootloader_version: 2,
            bootloader_code_offset: 0x100,
            heap_size: 0x4_0000,
            vga_workspace_size: 0x10_0000,
            non_wpr_heap_size: 0x10_0000,
        }
    }

    /// Descriptor blob: image then bootloader, the bootloader depending on
    /// the image version.
    pub fn signature_blob(&self, keys: &SigningKeys) -> Result<Vec<u8>, RequestError> {
        let mut image = SignatureDescriptor::new(FALCON_ID_GSP, IMAGE_UCODE_ID, self.image_version);
        keys.sign(&mut image, &self.image)?;

        let mut bootloader =
            SignatureDescriptor::new(FALCON_ID_GSP, BOOTLOADER_UCODE_ID, self.bootloader_version);
        bootloader.push_dep(IMAGE_UCODE_ID, self.image_version)?;
        keys.sign(&mut bootloader, &self.bootloader)?;

        let mut blob = image.to_bytes();
        blob.extend(bootloader.to_bytes());
        Ok(blob)
    }

    /// Metadata as the requester fills it in, before the booter plans.
    pub fn metadata(&self, signature_len: usize) -> WprMetadata {
        let mut meta = WprMetadata::new();
        meta.sysmem_addr_of_radix3_image = RADIX3_BASE;
        meta.size_of_radix3_image = self.image.len() as u64;
        meta.sysmem_addr_of_bootloader = BOOTLOADER_ADDR;
        meta.size_of_bootloader = self.bootloader.len() as u64;
        meta.bootloader_code_offset = self.bootloader_code_offset;
        meta.bootloader_data_offset = self.bootloader.len() as u64 / 2;
        meta.bootloader_manifest_offset = self.bootloader.len() as u64 * 3 / 4;
        meta.sysmem_addr_of_signature = SIGNATURE_ADDR;
        meta.size_of_signature = signature_len as u64;
        meta.fb_size = self.fb_size;
        meta.heap_size = self.heap_size;
        meta.vga_workspace_size = self.vga_workspace_size;
        meta.non_wpr_heap_size = self.non_wpr_heap_size;
        meta
    }

    /// Write the request into system memory and point the mailbox at it.
    pub fn stage(&self, soc: &EmuSoc, keys: &SigningKeys) -> Result<StagedRequest, RequestError> {
        let signature = self.signature_blob(keys)?;
        let meta = self.metadata(signature.len());

        let memory = soc.memory();
        let mut memory = memory.borrow_mut();
        let radix3 = Radix3Builder::new(RADIX3_BASE).build(&mut memory.sysmem, &self.image);
        memory.sysmem.write(BOOTLOADER_ADDR, &self.bootloader);
        memory.sysmem.write(SIGNATURE_ADDR, &signature);
        memory.sysmem.write(META_ADDR, &meta.encode());
        drop(memory);

        soc.set_mailbox_argument(META_ADDR);
        Ok(StagedRequest {
            meta,
            signature,
            radix3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booter_image_types::SignatureDescriptors;

    fn read_u64(sysmem: &SysMem, addr: u64) -> u64 {
        let mut entry = [0u8; 8];
        sysmem.read(addr, &mut entry);
        u64::from_le_bytes(entry)
    }

    #[test]
    fn test_table_walk() {
        let image = pattern(600 * 4096 + 10, 1);
        let mut sysmem = SysMem::default();
        let table = Radix3Builder::new(0x10_0000).build(&mut sysmem, &image);
        assert_eq!(table.root, 0x10_0000);
        assert_eq!(table.mids.len(), 1);
        assert_eq!(table.leaves.len(), 2);
        assert_eq!(table.pages.len(), 601);

        for page in [0usize, 1, 511, 512, 600] {
            let mid = read_u64(&sysmem, table.root + 8 * (page >> 18) as u64);
            let leaf = read_u64(&sysmem, mid + 8 * ((page >> 9) & 511) as u64);
            let data = read_u64(&sysmem, leaf + 8 * (page & 511) as u64);
            assert_eq!(data, table.pages[page]);

            let mut first = [0u8; 4];
            sysmem.read(data, &mut first);
            assert_eq!(first, image[page * 4096..page * 4096 + 4]);
        }
        // neighbouring pages are not contiguous in system memory
        assert_ne!(table.pages[1], table.pages[0] + 4096);
    }

    #[test]
    fn test_signature_blob_holds_both_objects() {
        let keys = SigningKeys::generate().unwrap();
        let request = LoadRequest::new(64 << 20, 0x3000);
        let blob = request.signature_blob(&keys).unwrap();

        let image = SignatureDescriptors::new(&blob).find(IMAGE_UCODE_ID).unwrap();
        assert_eq!(image.ucode_version, request.image_version);
        let bootloader = SignatureDescriptors::new(&blob)
            .find(BOOTLOADER_UCODE_ID)
            .unwrap();
        assert_eq!(bootloader.deps().len(), 1);
        assert_eq!(bootloader.deps()[0].min_version, request.image_version);
    }

    #[test]
    fn test_request_metadata_is_acceptable() {
        let request = LoadRequest::new(64 << 20, 0x10_0000);
        assert_eq!(request.metadata(0x700).validate_request(), Ok(()));
    }
}
