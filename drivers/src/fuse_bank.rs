/*++

Licensed under the Apache-2.0 license.

File Name:

    fuse_bank.rs

Abstract:

    File contains API for fuses, straps and the revocation scratch group.

--*/

use booter_error::{BooterError, BooterResult};

use crate::{Bus, PlatformOps};

pub struct FuseBank<'a> {
    bus: &'a dyn Bus,
    platform: &'static dyn PlatformOps,
}

impl<'a> FuseBank<'a> {
    pub fn new(bus: &'a dyn Bus, platform: &'static dyn PlatformOps) -> Self {
        Self { bus, platform }
    }

    /// Minimum booter version burned into fuses. The fuse word is unary:
    /// the version is the number of bits set.
    pub fn fuse_version(&self) -> BooterResult<u32> {
        Ok(self
            .bus
            .read_global(self.platform.regs().fuse_version)?
            .count_ones())
    }

    pub fn debug_mode(&self) -> BooterResult<bool> {
        let ctrl = self.bus.read_global(self.platform.regs().debug_ctrl)?;
        Ok(self.platform.debug_mode(ctrl))
    }

    /// FB size in bytes as reported by the memory controller strap.
    pub fn fb_size(&self) -> BooterResult<u64> {
        let mb = self.bus.read_global(self.platform.regs().fb_size_mb)?;
        Ok(u64::from(mb) << 20)
    }

    /// Runtime revocation floor register `index`.
    pub fn revocation_scratch(&self, index: usize) -> BooterResult<u32> {
        let reg = self
            .platform
            .regs()
            .revocation
            .get(index)
            .ok_or(BooterError::DRIVER_BAD_ARGUMENT)?;
        self.bus.read_global(*reg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBus;
    use crate::TU10X;

    #[test]
    fn test_fuse_version_is_unary() {
        let bus = FakeBus::default();
        let regs = TU10X.regs();
        let fuses = FuseBank::new(&bus, &TU10X);
        assert_eq!(fuses.fuse_version(), Ok(0));
        bus.set(regs.fuse_version, 0b0111);
        assert_eq!(fuses.fuse_version(), Ok(3));
    }

    #[test]
    fn test_straps() {
        let bus = FakeBus::default();
        let regs = TU10X.regs();
        bus.set(regs.fb_size_mb, 64);
        bus.set(regs.debug_ctrl, 1 << 16);
        let fuses = FuseBank::new(&bus, &TU10X);
        assert_eq!(fuses.fb_size(), Ok(64 * 1024 * 1024));
        assert_eq!(fuses.debug_mode(), Ok(true));
    }

    #[test]
    fn test_revocation_scratch_index() {
        let bus = FakeBus::default();
        bus.set(TU10X.regs().revocation[3], 0x55);
        let fuses = FuseBank::new(&bus, &TU10X);
        assert_eq!(fuses.revocation_scratch(3), Ok(0x55));
        assert_eq!(
            fuses.revocation_scratch(4),
            Err(BooterError::DRIVER_BAD_ARGUMENT)
        );
    }
}
