/*++

Licensed under the Apache-2.0 license.

File Name:

    env.rs

Abstract:

    File implements a context holding all the services utilized by a booter
    stage. The flows never touch a collaborator except through it.

--*/

use booter_drivers::{
    probe, report_boot_status, Bus, CryptoMutex, Dma, DmaEngine, FuseBank, HandoffMutex,
    MutexGuard, PkaEngine, PlatformOps, ShaEngine, Soc, Timer, Wpr,
};
use booter_error::BooterResult;
use booter_image_types::LsKeys;

use crate::boot_status::BooterBootStatus;
use crate::layout::RegionAlignments;

/// Booter Context
pub struct BooterEnv<'a> {
    /// Register bus
    pub bus: &'a dyn Bus,

    /// Monotonic timer
    pub timer: &'a dyn Timer,

    /// DMA engine
    pub dma: &'a mut dyn DmaEngine,

    /// SHA-256 accelerator
    pub sha: &'a mut dyn ShaEngine,

    /// Public key accelerator
    pub pka: &'a mut dyn PkaEngine,

    /// Running chip
    pub platform: &'static dyn PlatformOps,

    /// LS verification keys
    pub keys: &'a LsKeys,

    /// Region placement
    pub alignments: RegionAlignments,
}

impl<'a> BooterEnv<'a> {
    /// Identify the chip and bind the collaborators to it.
    pub fn new(soc: Soc<'a>, keys: &'a LsKeys) -> BooterResult<Self> {
        let platform = probe(soc.bus)?;
        Ok(Self {
            bus: soc.bus,
            timer: soc.timer,
            dma: soc.dma,
            sha: soc.sha,
            pka: soc.pka,
            platform,
            keys,
            alignments: RegionAlignments::default(),
        })
    }

    pub fn dma(&mut self) -> Dma<'_> {
        Dma::new(&mut *self.dma, self.timer)
    }

    pub fn wpr(&self) -> Wpr<'a> {
        Wpr::new(self.bus, self.platform, self.timer)
    }

    pub fn fuses(&self) -> FuseBank<'a> {
        FuseBank::new(self.bus, self.platform)
    }

    pub fn handoff_mutex(&self) -> BooterResult<MutexGuard<'a, HandoffMutex>> {
        MutexGuard::acquire(self.bus, self.platform.regs(), self.timer)
    }

    pub fn crypto_mutex(&self) -> BooterResult<MutexGuard<'a, CryptoMutex>> {
        MutexGuard::acquire(self.bus, self.platform.regs(), self.timer)
    }

    pub fn report_boot_status(&self, status: BooterBootStatus) {
        report_boot_status(self.bus, self.platform.regs(), status.into());
    }
}
