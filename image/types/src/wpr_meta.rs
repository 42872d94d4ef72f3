/*++

Licensed under the Apache-2.0 license.

File Name:

   wpr_meta.rs

Abstract:

    File contains the WPR metadata block exchanged between the requester,
    the booter stages and the target firmware.

--*/

use booter_error::{BooterError, BooterResult};
use zerocopy::{AsBytes, FromBytes};

pub const WPR_META_MAGIC: u64 = 0xdc3a_ae21_371a_60b3;
pub const WPR_META_REVISION: u64 = 1;
pub const WPR_META_VERIFIED: u64 = 0xa0a0_a0a0_a0a0_a0a0;
pub const WPR_META_SIZE: usize = core::mem::size_of::<WprMetadata>();

/// The metadata copy and the signature blob copy each occupy one page at
/// the bottom of the protected region.
pub const WPR_META_PAGE_SIZE: u64 = 0x1000;
pub const MAX_SIGNATURE_BLOB_SIZE: usize = WPR_META_PAGE_SIZE as usize;
pub const WPR_HEADERS_SIZE: u64 = WPR_META_PAGE_SIZE * 2;

/// WPR metadata. Any change to this layout requires a revision bump.
#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct WprMetadata {
    pub magic: u64,
    pub revision: u64,

    pub sysmem_addr_of_radix3_image: u64,
    pub size_of_radix3_image: u64,

    pub sysmem_addr_of_bootloader: u64,
    pub size_of_bootloader: u64,

    /// Offsets inside the bootloader image.
    pub bootloader_code_offset: u64,
    pub bootloader_data_offset: u64,
    pub bootloader_manifest_offset: u64,

    pub sysmem_addr_of_signature: u64,
    pub size_of_signature: u64,

    /// Start of everything the firmware owns, including the non-WPR heap.
    pub fw_rsvd_start: u64,
    pub non_wpr_heap_offset: u64,
    pub non_wpr_heap_size: u64,

    pub wpr_start: u64,
    pub heap_offset: u64,
    pub heap_size: u64,
    pub image_offset: u64,
    pub boot_bin_offset: u64,
    pub frts_offset: u64,
    pub frts_size: u64,
    pub wpr_end: u64,

    pub fb_size: u64,
    pub vga_workspace_offset: u64,
    pub vga_workspace_size: u64,

    pub boot_count: u64,
    pub partition_rpc_addr: u64,
    pub verified: u64,
    pub partition_rpc_request_offset: u16,
    pub partition_rpc_reply_offset: u16,
    pub padding: [u8; 28],
}

impl WprMetadata {
    /// Metadata with the header fields populated and everything else zero.
    pub fn new() -> Self {
        Self {
            magic: WPR_META_MAGIC,
            revision: WPR_META_REVISION,
            ..Default::default()
        }
    }

    /// Decode from exactly `WPR_META_SIZE` bytes.
    pub fn decode(bytes: &[u8]) -> BooterResult<Self> {
        Self::read_from(bytes).ok_or(BooterError::DRIVER_BAD_ARGUMENT)
    }

    pub fn encode(&self) -> [u8; WPR_META_SIZE] {
        let mut out = [0u8; WPR_META_SIZE];
        out.copy_from_slice(self.as_bytes());
        out
    }

    pub fn validate_header(&self) -> BooterResult<()> {
        if self.magic != WPR_META_MAGIC {
            return Err(BooterError::WPR_META_BAD_MAGIC);
        }
        // Reserved bytes belong to a later revision
        if self.revision != WPR_META_REVISION || self.padding.iter().any(|b| *b != 0) {
            return Err(BooterError::WPR_META_BAD_REVISION);
        }
        Ok(())
    }

    pub fn is_verified(&self) -> bool {
        self.verified == WPR_META_VERIFIED
    }

    pub fn set_verified(&mut self) {
        self.verified = WPR_META_VERIFIED;
    }

    pub fn clear_verified(&mut self) {
        self.verified = 0;
    }

    /// Fields the requester fills in before the booter relocates the block.
    pub fn validate_request(&self) -> BooterResult<()> {
        self.validate_header()?;
        if self.size_of_radix3_image == 0 || self.size_of_bootloader == 0 {
            return Err(BooterError::WPR_META_INVALID_LAYOUT);
        }
        if self.size_of_signature == 0 {
            return Err(BooterError::WPR_META_INVALID_LAYOUT);
        }
        if self.size_of_signature > MAX_SIGNATURE_BLOB_SIZE as u64 {
            return Err(BooterError::WPR_META_SIGNATURE_TOO_LARGE);
        }
        self.validate_bootloader_sections()
    }

    /// Every device offset is ordered and contained in the protected region.
    pub fn validate_layout(&self) -> BooterResult<()> {
        self.validate_header()?;
        self.validate_bootloader_sections()?;

        let err = BooterError::WPR_META_INVALID_LAYOUT;
        let add = |a: u64, b: u64| a.checked_add(b).ok_or(err);

        if self.fw_rsvd_start != self.non_wpr_heap_offset {
            return Err(err);
        }
        if add(self.non_wpr_heap_offset, self.non_wpr_heap_size)? > self.wpr_start {
            return Err(err);
        }
        if add(self.wpr_start, WPR_HEADERS_SIZE)? > self.heap_offset {
            return Err(err);
        }
        if add(self.heap_offset, self.heap_size)? != self.image_offset {
            return Err(err);
        }
        if add(self.image_offset, self.size_of_radix3_image)? > self.boot_bin_offset {
            return Err(err);
        }
        if add(self.boot_bin_offset, self.size_of_bootloader)? > self.frts_offset {
            return Err(err);
        }
        if add(self.frts_offset, self.frts_size)? != self.wpr_end {
            return Err(err);
        }
        if self.wpr_end > self.vga_workspace_offset {
            return Err(err);
        }
        if add(self.vga_workspace_offset, self.vga_workspace_size)? != self.fb_size {
            return Err(err);
        }
        if self.wpr_start >= self.wpr_end || self.size_of_radix3_image == 0 {
            return Err(err);
        }
        Ok(())
    }

    fn validate_bootloader_sections(&self) -> BooterResult<()> {
        let size = self.size_of_bootloader;
        if self.bootloader_code_offset >= size
            || self.bootloader_data_offset >= size
            || self.bootloader_manifest_offset >= size
        {
            return Err(BooterError::WPR_META_INVALID_LAYOUT);
        }
        Ok(())
    }
}
