/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains API for the falcon DMA engine.

--*/

use booter_error::{BooterError, BooterResult};

use crate::memory_layout::DMA_TIMEOUT_NS;
use crate::{wait, PhysAddr, Timer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaTarget {
    SysMem,
    Fb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaContext {
    pub target: DmaTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaSync {
    /// Return once the data has landed.
    Blocking,

    /// Return once the request is queued.
    Posted,
}

/// Transfer direction, carrying the local buffer.
pub enum DmaDirection<'b> {
    ToLocal(&'b mut [u8]),
    FromLocal(&'b [u8]),
}

/// DMA programming interface.
pub trait DmaEngine {
    /// Move `size` bytes between the local buffer and `offset` in the
    /// target named by `ctx`.
    ///
    /// # Returns
    ///
    /// Number of bytes actually transferred
    fn transfer(
        &mut self,
        dir: DmaDirection<'_>,
        offset: u64,
        size: u32,
        sync: DmaSync,
        ctx: DmaContext,
    ) -> u32;

    fn idle(&self) -> bool;
}

pub struct Dma<'a> {
    engine: &'a mut dyn DmaEngine,
    timer: &'a dyn Timer,
}

impl<'a> Dma<'a> {
    pub fn new(engine: &'a mut dyn DmaEngine, timer: &'a dyn Timer) -> Self {
        Self { engine, timer }
    }

    pub fn read_sysmem(&mut self, addr: PhysAddr, buf: &mut [u8]) -> BooterResult<()> {
        self.transfer(DmaDirection::ToLocal(buf), addr.get(), DmaTarget::SysMem)
    }

    pub fn read_fb(&mut self, offset: u64, buf: &mut [u8]) -> BooterResult<()> {
        self.transfer(DmaDirection::ToLocal(buf), offset, DmaTarget::Fb)
    }

    pub fn write_fb(&mut self, offset: u64, buf: &[u8]) -> BooterResult<()> {
        self.transfer(DmaDirection::FromLocal(buf), offset, DmaTarget::Fb)
    }

    fn transfer(&mut self, dir: DmaDirection<'_>, offset: u64, target: DmaTarget) -> BooterResult<()> {
        let len = match &dir {
            DmaDirection::ToLocal(buf) => buf.len(),
            DmaDirection::FromLocal(buf) => buf.len(),
        };
        let size = u32::try_from(len).map_err(|_| BooterError::DRIVER_BAD_ARGUMENT)?;
        offset
            .checked_add(u64::from(size))
            .ok_or(BooterError::DRIVER_ADDRESS_OVERFLOW)?;

        let moved = self.engine.transfer(
            dir,
            offset,
            size,
            DmaSync::Blocking,
            DmaContext { target },
        );
        wait::until(
            self.timer,
            DMA_TIMEOUT_NS,
            BooterError::DRIVER_DMA_TIMEOUT,
            || Ok(self.engine.idle()),
        )?;
        if moved != size {
            return Err(BooterError::DRIVER_DMA_SHORT_TRANSFER);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeTimer, FlatDma};

    #[test]
    fn test_fb_round_trip() {
        let timer = FakeTimer::new(1);
        let mut engine = FlatDma::new(0x2000);
        let mut dma = Dma::new(&mut engine, &timer);

        dma.write_fb(0x100, &[1, 2, 3, 4]).unwrap();
        let mut buf = [0u8; 4];
        dma.read_fb(0x100, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
    }

    #[test]
    fn test_short_transfer() {
        let timer = FakeTimer::new(1);
        let mut engine = FlatDma::new(0x2000);
        let mut dma = Dma::new(&mut engine, &timer);

        let mut buf = [0u8; 16];
        assert_eq!(
            dma.read_fb(0x1ff8, &mut buf),
            Err(BooterError::DRIVER_DMA_SHORT_TRANSFER)
        );
    }

    #[test]
    fn test_offset_overflow() {
        let timer = FakeTimer::new(1);
        let mut engine = FlatDma::new(0x2000);
        let mut dma = Dma::new(&mut engine, &timer);

        let mut buf = [0u8; 16];
        assert_eq!(
            dma.read_sysmem(PhysAddr(u64::MAX - 4), &mut buf),
            Err(BooterError::DRIVER_ADDRESS_OVERFLOW)
        );
        assert!(engine.requests.is_empty());
    }

    #[test]
    fn test_targets() {
        let timer = FakeTimer::new(1);
        let mut engine = FlatDma::new(0x2000);
        let mut dma = Dma::new(&mut engine, &timer);

        let mut buf = [0u8; 8];
        dma.read_sysmem(PhysAddr(0x40), &mut buf).unwrap();
        dma.write_fb(0x80, &buf).unwrap();
        assert_eq!(
            engine.requests,
            vec![(DmaTarget::SysMem, 0x40, 8), (DmaTarget::Fb, 0x80, 8)]
        );
    }
}
