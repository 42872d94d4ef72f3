/*++

Licensed under the Apache-2.0 license.

File Name:

    memory.rs

Abstract:

    File contains the memories of the emulated SoC: a sparse system memory
    and a flat FB, shared by every device that masters them.

--*/

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

const PAGE_SIZE: usize = 4096;

/// Sparse host memory. Unwritten bytes read as zero.
#[derive(Default, Clone)]
pub struct SysMem {
    pages: BTreeMap<u64, Box<[u8; PAGE_SIZE]>>,
}

impl SysMem {
    pub fn read(&self, addr: u64, buf: &mut [u8]) {
        for (i, byte) in buf.iter_mut().enumerate() {
            let at = addr + i as u64;
            *byte = self
                .pages
                .get(&(at / PAGE_SIZE as u64))
                .map_or(0, |page| page[(at % PAGE_SIZE as u64) as usize]);
        }
    }

    pub fn write(&mut self, addr: u64, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            let at = addr + i as u64;
            let page = self
                .pages
                .entry(at / PAGE_SIZE as u64)
                .or_insert_with(|| Box::new([0; PAGE_SIZE]));
            page[(at % PAGE_SIZE as u64) as usize] = *byte;
        }
    }
}

/// Both memories of the SoC.
pub struct Memory {
    pub sysmem: SysMem,
    pub fb: Vec<u8>,
}

pub type SharedMemory = Rc<RefCell<Memory>>;

impl Memory {
    pub fn new_shared(sysmem: SysMem, fb_size: usize) -> SharedMemory {
        Rc::new(RefCell::new(Self {
            sysmem,
            fb: vec![0; fb_size],
        }))
    }

    /// Bytes of FB in `[offset, offset + len)` that exist.
    pub fn fb_range(&self, offset: u64, len: usize) -> &[u8] {
        let start = (offset as usize).min(self.fb.len());
        let end = start.saturating_add(len).min(self.fb.len());
        &self.fb[start..end]
    }
}
