/*++

Licensed under the Apache-2.0 license.

File Name:

    phys_addr.rs

Abstract:

    File contains the physical address newtype and source apertures.

--*/

use booter_error::{BooterError, BooterResult};

/// Physical address in system memory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn checked_add(self, offset: u64) -> BooterResult<Self> {
        self.0
            .checked_add(offset)
            .map(Self)
            .ok_or(BooterError::DRIVER_ADDRESS_OVERFLOW)
    }

    /// `align` must be a power of two.
    pub const fn is_aligned(self, align: u64) -> bool {
        self.0 & (align - 1) == 0
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}

impl From<PhysAddr> for u64 {
    fn from(addr: PhysAddr) -> Self {
        addr.0
    }
}

/// Half-open range of system memory a source may live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aperture {
    pub start: u64,
    pub end: u64,
}

impl Aperture {
    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// True if `[addr, addr + len)` lies inside the aperture.
    pub fn contains(&self, addr: PhysAddr, len: u64) -> bool {
        match addr.0.checked_add(len) {
            Some(end) => addr.0 >= self.start && end <= self.end,
            None => false,
        }
    }

    pub fn check(&self, addr: PhysAddr, len: u64) -> BooterResult<()> {
        if self.contains(addr, len) {
            Ok(())
        } else {
            Err(BooterError::DRIVER_ADDRESS_OUT_OF_APERTURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add() {
        assert_eq!(PhysAddr::new(0x1000).checked_add(0x10), Ok(PhysAddr(0x1010)));
        assert_eq!(
            PhysAddr::new(u64::MAX).checked_add(1),
            Err(BooterError::DRIVER_ADDRESS_OVERFLOW)
        );
    }

    #[test]
    fn test_alignment() {
        assert!(PhysAddr::new(0x2000).is_aligned(0x1000));
        assert!(!PhysAddr::new(0x2008).is_aligned(0x1000));
        assert!(PhysAddr::new(0x2008).is_aligned(8));
    }

    #[test]
    fn test_aperture() {
        let aperture = Aperture::new(0x1000, 0x10_0000);
        assert!(aperture.contains(PhysAddr(0x1000), 0x1000));
        assert!(aperture.contains(PhysAddr(0xf_f000), 0x1000));
        assert!(!aperture.contains(PhysAddr(0xf_f000), 0x1001));
        assert!(!aperture.contains(PhysAddr(0), 8));
        assert!(!aperture.contains(PhysAddr(u64::MAX - 4), 8));
        assert_eq!(
            aperture.check(PhysAddr(0x10_0000), 1),
            Err(BooterError::DRIVER_ADDRESS_OUT_OF_APERTURE)
        );
    }
}
