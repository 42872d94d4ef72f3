/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the emulated DMA engine. Transfers complete immediately;
    an FB transfer that runs past the end of FB is cut short.

--*/

use booter_drivers::{DmaContext, DmaDirection, DmaEngine, DmaSync, DmaTarget};

use crate::memory::{Memory, SharedMemory, SysMem};

pub struct EmuDma {
    memory: SharedMemory,

    /// Transfers performed, as (target, offset, size).
    pub log: Vec<(DmaTarget, u64, u32)>,

    /// Report a stuck engine after the next transfer.
    pub hang: bool,
}

impl EmuDma {
    /// DMA engine over its own memories.
    pub fn new(sysmem: SysMem, fb_size: usize) -> Self {
        Self::with_memory(Memory::new_shared(sysmem, fb_size))
    }

    pub fn with_memory(memory: SharedMemory) -> Self {
        Self {
            memory,
            log: Vec::new(),
            hang: false,
        }
    }

    pub fn memory(&self) -> SharedMemory {
        self.memory.clone()
    }

    /// Copy of FB `[offset, offset + len)`.
    pub fn fb(&self, offset: u64, len: usize) -> Vec<u8> {
        self.memory.borrow().fb_range(offset, len).to_vec()
    }
}

impl DmaEngine for EmuDma {
    fn transfer(
        &mut self,
        dir: DmaDirection<'_>,
        offset: u64,
        size: u32,
        _sync: DmaSync,
        ctx: DmaContext,
    ) -> u32 {
        self.log.push((ctx.target, offset, size));
        let mut memory = self.memory.borrow_mut();
        match ctx.target {
            DmaTarget::SysMem => {
                match dir {
                    DmaDirection::ToLocal(buf) => memory.sysmem.read(offset, &mut buf[..size as usize]),
                    DmaDirection::FromLocal(buf) => memory.sysmem.write(offset, &buf[..size as usize]),
                }
                size
            }
            DmaTarget::Fb => {
                let len = memory.fb.len() as u64;
                let start = offset.min(len) as usize;
                let count = u64::from(size).min(len - start as u64) as usize;
                match dir {
                    DmaDirection::ToLocal(buf) => {
                        buf[..count].copy_from_slice(&memory.fb[start..start + count])
                    }
                    DmaDirection::FromLocal(buf) => {
                        memory.fb[start..start + count].copy_from_slice(&buf[..count])
                    }
                }
                count as u32
            }
        }
    }

    fn idle(&self) -> bool {
        !self.hang
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmuTimer;
    use booter_drivers::{Dma, PhysAddr};
    use booter_error::BooterError;

    #[test]
    fn test_sysmem_to_fb() {
        let mut sysmem = SysMem::default();
        sysmem.write(0x8000, b"firmware");
        let mut engine = EmuDma::new(sysmem, 0x1000);
        let timer = EmuTimer::default();
        let mut dma = Dma::new(&mut engine, &timer);

        let mut buf = [0u8; 8];
        dma.read_sysmem(PhysAddr(0x8000), &mut buf).unwrap();
        dma.write_fb(0x10, &buf).unwrap();
        drop(dma);
        assert_eq!(engine.fb(0x10, 8), b"firmware");
        assert_eq!(engine.log.len(), 2);
    }

    #[test]
    fn test_fb_overrun_is_short() {
        let mut engine = EmuDma::new(SysMem::default(), 0x1000);
        let timer = EmuTimer::default();
        let mut dma = Dma::new(&mut engine, &timer);
        assert_eq!(
            dma.write_fb(0xffc, &[0; 8]),
            Err(BooterError::DRIVER_DMA_SHORT_TRANSFER)
        );
    }

    #[test]
    fn test_hung_engine_times_out() {
        let mut engine = EmuDma::new(SysMem::default(), 0x1000);
        engine.hang = true;
        let timer = EmuTimer::default();
        let mut dma = Dma::new(&mut engine, &timer);
        assert_eq!(
            dma.write_fb(0, &[0; 8]),
            Err(BooterError::DRIVER_DMA_TIMEOUT)
        );
    }
}
