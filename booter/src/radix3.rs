/*++

Licensed under the Apache-2.0 license.

File Name:

    radix3.rs

Abstract:

    File contains the scattered image fetcher. The image is described by a
    three level table in system memory: root -> mid -> leaf -> data page.

--*/

use booter_drivers::memory_layout::{BOUNCE_BUFFER_SIZE, PAGE_SHIFT, PAGE_SIZE};
use booter_drivers::{Aperture, Dma, PhysAddr, Secret};
use booter_error::{BooterError, BooterResult};

const INDEX_BITS: u32 = 9;
const INDEX_MASK: u64 = (1 << INDEX_BITS) - 1;
const LEVELS: u32 = 3;
const ENTRY_SIZE: u64 = 8;

/// Pages addressable through one root.
pub const RADIX3_MAX_PAGES: u64 = 1 << (INDEX_BITS * LEVELS);

/// A radix3 table rooted in system memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Radix3 {
    root: PhysAddr,
    aperture: Aperture,
}

fn check_table_addr(addr: PhysAddr, aperture: &Aperture) -> BooterResult<PhysAddr> {
    if !addr.is_aligned(PAGE_SIZE) || !aperture.contains(addr, PAGE_SIZE) {
        return Err(BooterError::RADIX3_BAD_TABLE);
    }
    Ok(addr)
}

impl Radix3 {
    /// # Arguments
    ///
    /// * `root` - Address of the root table page
    /// * `aperture` - Where every table and data page must live
    pub fn new(root: PhysAddr, aperture: Aperture) -> BooterResult<Self> {
        Ok(Self {
            root: check_table_addr(root, &aperture)?,
            aperture,
        })
    }

    /// Resolve a logical image offset into its system memory address.
    pub fn resolve(&self, dma: &mut Dma, offset: u64) -> BooterResult<PhysAddr> {
        let page = offset >> PAGE_SHIFT;
        if page >= RADIX3_MAX_PAGES {
            return Err(BooterError::RADIX3_BAD_TABLE);
        }

        let mut table = self.root;
        for level in (0..LEVELS).rev() {
            let index = (page >> (level * INDEX_BITS)) & INDEX_MASK;
            let entry_addr = table.checked_add(index * ENTRY_SIZE)?;
            let mut entry = [0u8; ENTRY_SIZE as usize];
            dma.read_sysmem(entry_addr, &mut entry)?;
            table = check_table_addr(PhysAddr(u64::from_le_bytes(entry)), &self.aperture)?;
        }
        table.checked_add(offset & (PAGE_SIZE - 1))
    }

    /// Copy `size` bytes of the image to FB at `dest`, one page at a time.
    /// On failure the destination holds a partial copy.
    pub fn copy_in(&self, dma: &mut Dma, size: u64, dest: u64) -> BooterResult<()> {
        let mut bounce = Secret::new([0u8; BOUNCE_BUFFER_SIZE]);
        let mut offset = 0;
        while offset < size {
            let len = (size - offset).min(PAGE_SIZE) as usize;
            let src = self.resolve(dma, offset)?;
            let buf = &mut bounce.expose_mut()[..len];
            dma.read_sysmem(src, buf)?;
            dma.write_fb(fb_offset(dest, offset)?, buf)?;
            offset += PAGE_SIZE;
        }
        Ok(())
    }
}

/// Copy a physically contiguous object to FB at `dest`.
pub fn copy_contiguous(
    dma: &mut Dma,
    src: PhysAddr,
    aperture: &Aperture,
    size: u64,
    dest: u64,
) -> BooterResult<()> {
    aperture.check(src, size)?;
    let mut bounce = Secret::new([0u8; BOUNCE_BUFFER_SIZE]);
    let mut offset = 0;
    while offset < size {
        let len = (size - offset).min(PAGE_SIZE) as usize;
        let buf = &mut bounce.expose_mut()[..len];
        dma.read_sysmem(src.checked_add(offset)?, buf)?;
        dma.write_fb(fb_offset(dest, offset)?, buf)?;
        offset += PAGE_SIZE;
    }
    Ok(())
}

fn fb_offset(dest: u64, offset: u64) -> BooterResult<u64> {
    dest.checked_add(offset)
        .ok_or(BooterError::DRIVER_ADDRESS_OVERFLOW)
}
