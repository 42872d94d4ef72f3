/*++

Licensed under the Apache-2.0 license.

File Name:

    platform.rs

Abstract:

    File contains the collaborator interfaces the booter consumes and the
    per-generation register maps behind them.

--*/

use bitfield::bitfield;
use booter_error::{BooterError, BooterResult};

use crate::memory_layout::{MUTEX_SLOT_COUNT, REVOCATION_SCRATCH_COUNT, SUB_WINDOW_COUNT};
use crate::{Aperture, DmaEngine, PkaEngine, ShaEngine};

/// Register access for the local (falcon private) and global (priv bus)
/// spaces. Local accesses cannot fail; global ones can.
pub trait Bus {
    fn read_local(&self, offset: u32) -> u32;

    fn write_local(&self, offset: u32, val: u32);

    fn read_global(&self, offset: u32) -> BooterResult<u32>;

    fn write_global(&self, offset: u32, val: u32) -> BooterResult<()>;
}

/// Monotonic nanosecond counter.
pub trait Timer {
    fn now_ns(&self) -> u64;
}

/// Every collaborator a stage needs, borrowed for the length of the stage.
pub struct Soc<'a> {
    pub bus: &'a dyn Bus,
    pub timer: &'a dyn Timer,
    pub dma: &'a mut dyn DmaEngine,
    pub sha: &'a mut dyn ShaEngine,
    pub pka: &'a mut dyn PkaEngine,
}

/// Boot ID lives at the same offset on every generation.
pub const BOOT_ID_REG: u32 = 0x0000_0000;

pub const ARCH_TU10X: u32 = 0x16;
pub const ARCH_GA10X: u32 = 0x17;

bitfield! {
    /// Boot ID register
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct BootId(u32);
    u32;

    /// Architecture
    pub arch, set_arch: 28, 24;

    /// Implementation
    pub implementation, set_implementation: 23, 20;

    /// Revision
    pub revision, set_revision: 7, 0;
}

#[derive(Debug)]
pub struct SubWindowRegs {
    pub lo: u32,
    pub hi: u32,
    pub cfg: u32,
}

/// Requester mailbox, local space. Same offsets on every generation so a
/// status can be reported before the chip is identified.
pub const MAILBOX0_REG: u32 = 0x0040;
pub const MAILBOX1_REG: u32 = 0x0044;

/// Register offsets of one hardware generation, all in the global space.
#[derive(Debug)]
pub struct RegisterMap {
    pub boot_id: u32,
    pub fb_size_mb: u32,

    pub wpr_lo: u32,
    pub wpr_hi: u32,
    pub sub_windows: [SubWindowRegs; SUB_WINDOW_COUNT],

    pub scrub_start: u32,
    pub scrub_end: u32,
    pub scrub_ctrl: u32,
    pub scrub_status: u32,

    pub fuse_version: u32,
    pub debug_ctrl: u32,

    pub target_boot_vector_lo: u32,
    pub target_boot_vector_hi: u32,
    pub target_cpuctl: u32,

    pub mutex_id_acquire: u32,
    pub mutex_id_release: u32,
    pub mutex_slots: u32,

    pub handoff: u32,
    pub booter_version: u32,
    pub fw_version: u32,
    pub wpr_meta_lo: u32,
    pub wpr_meta_hi: u32,
    pub revocation: [u32; REVOCATION_SCRATCH_COUNT],
    pub boot_status: u32,
}

impl RegisterMap {
    pub const fn mutex_slot(&self, slot: usize) -> u32 {
        self.mutex_slots + 4 * slot as u32
    }
}

/// Per-generation behavior.
pub trait PlatformOps: Sync {
    fn name(&self) -> &'static str;

    fn regs(&self) -> &'static RegisterMap;

    /// log2 of the WPR address granule.
    fn wpr_addr_shift(&self) -> u32;

    /// Where radix3 tables and image pages may live in system memory.
    fn sysmem_aperture(&self) -> Aperture;

    /// Decode the debug control register.
    fn debug_mode(&self, debug_ctrl: u32) -> bool;

    /// Program the boot vector and release the target from reset.
    fn start_target(&self, bus: &dyn Bus, boot_vector: u64) -> BooterResult<()>;
}

pub struct Tu10x;

pub struct Ga10x;

pub static TU10X: Tu10x = Tu10x;
pub static GA10X: Ga10x = Ga10x;

static TU10X_REGS: RegisterMap = RegisterMap {
    boot_id: BOOT_ID_REG,
    fb_size_mb: 0x0010_0ce0,
    wpr_lo: 0x0010_0cd4,
    wpr_hi: 0x0010_0cd8,
    sub_windows: [
        SubWindowRegs {
            lo: 0x0010_0d00,
            hi: 0x0010_0d04,
            cfg: 0x0010_0d08,
        },
        SubWindowRegs {
            lo: 0x0010_0d10,
            hi: 0x0010_0d14,
            cfg: 0x0010_0d18,
        },
        SubWindowRegs {
            lo: 0x0010_0d20,
            hi: 0x0010_0d24,
            cfg: 0x0010_0d28,
        },
    ],
    scrub_start: 0x0010_0e00,
    scrub_end: 0x0010_0e04,
    scrub_ctrl: 0x0010_0e08,
    scrub_status: 0x0010_0e0c,
    fuse_version: 0x0082_1140,
    debug_ctrl: 0x0082_1000,
    target_boot_vector_lo: 0x0011_0080,
    target_boot_vector_hi: 0x0011_0084,
    target_cpuctl: 0x0011_0100,
    mutex_id_acquire: 0x0084_0880,
    mutex_id_release: 0x0084_0884,
    mutex_slots: 0x0084_0900,
    handoff: 0x0084_0500,
    booter_version: 0x0084_0504,
    fw_version: 0x0084_0508,
    wpr_meta_lo: 0x0084_050c,
    wpr_meta_hi: 0x0084_0510,
    revocation: [0x0084_0520, 0x0084_0524, 0x0084_0528, 0x0084_052c],
    boot_status: 0x0084_0540,
};

static GA10X_REGS: RegisterMap = RegisterMap {
    boot_id: BOOT_ID_REG,
    fb_size_mb: 0x0010_0ce0,
    wpr_lo: 0x0010_0cf4,
    wpr_hi: 0x0010_0cf8,
    sub_windows: [
        SubWindowRegs {
            lo: 0x0010_0f00,
            hi: 0x0010_0f04,
            cfg: 0x0010_0f08,
        },
        SubWindowRegs {
            lo: 0x0010_0f10,
            hi: 0x0010_0f14,
            cfg: 0x0010_0f18,
        },
        SubWindowRegs {
            lo: 0x0010_0f20,
            hi: 0x0010_0f24,
            cfg: 0x0010_0f28,
        },
    ],
    scrub_start: 0x0010_0e40,
    scrub_end: 0x0010_0e44,
    scrub_ctrl: 0x0010_0e48,
    scrub_status: 0x0010_0e4c,
    fuse_version: 0x0082_4140,
    debug_ctrl: 0x0082_4000,
    target_boot_vector_lo: 0x0011_1080,
    target_boot_vector_hi: 0x0011_1084,
    target_cpuctl: 0x0011_1388,
    mutex_id_acquire: 0x0084_1880,
    mutex_id_release: 0x0084_1884,
    mutex_slots: 0x0084_1900,
    handoff: 0x0084_1500,
    booter_version: 0x0084_1504,
    fw_version: 0x0084_1508,
    wpr_meta_lo: 0x0084_150c,
    wpr_meta_hi: 0x0084_1510,
    revocation: [0x0084_1520, 0x0084_1524, 0x0084_1528, 0x0084_152c],
    boot_status: 0x0084_1540,
};

const TU10X_DEBUG_MASK: u32 = 1 << 16;
const GA10X_DEBUG_MASK: u32 = 1 << 20;
const TU10X_CPUCTL_STARTCPU: u32 = 1 << 1;
const GA10X_CPUCTL_STARTCPU: u32 = 1 << 0;

impl PlatformOps for Tu10x {
    fn name(&self) -> &'static str {
        "tu10x"
    }

    fn regs(&self) -> &'static RegisterMap {
        &TU10X_REGS
    }

    fn wpr_addr_shift(&self) -> u32 {
        12
    }

    fn sysmem_aperture(&self) -> Aperture {
        Aperture::new(0x1000, 1 << 47)
    }

    fn debug_mode(&self, debug_ctrl: u32) -> bool {
        debug_ctrl & TU10X_DEBUG_MASK != 0
    }

    fn start_target(&self, bus: &dyn Bus, boot_vector: u64) -> BooterResult<()> {
        let regs = self.regs();
        bus.write_global(regs.target_boot_vector_lo, boot_vector as u32)?;
        bus.write_global(regs.target_boot_vector_hi, (boot_vector >> 32) as u32)?;
        bus.write_global(regs.target_cpuctl, TU10X_CPUCTL_STARTCPU)
    }
}

impl PlatformOps for Ga10x {
    fn name(&self) -> &'static str {
        "ga10x"
    }

    fn regs(&self) -> &'static RegisterMap {
        &GA10X_REGS
    }

    fn wpr_addr_shift(&self) -> u32 {
        17
    }

    fn sysmem_aperture(&self) -> Aperture {
        Aperture::new(0x1000, 1 << 52)
    }

    fn debug_mode(&self, debug_ctrl: u32) -> bool {
        debug_ctrl & GA10X_DEBUG_MASK != 0
    }

    fn start_target(&self, bus: &dyn Bus, boot_vector: u64) -> BooterResult<()> {
        let regs = self.regs();
        bus.write_global(regs.target_boot_vector_lo, boot_vector as u32)?;
        bus.write_global(regs.target_boot_vector_hi, (boot_vector >> 32) as u32)?;
        // Ga10x latches the vector on the first write of the start bit
        bus.write_global(regs.target_cpuctl, 0)?;
        bus.write_global(regs.target_cpuctl, GA10X_CPUCTL_STARTCPU)
    }
}

/// Select the platform implementation from the boot ID register.
pub fn probe(bus: &dyn Bus) -> BooterResult<&'static dyn PlatformOps> {
    let boot_id = BootId(bus.read_global(BOOT_ID_REG)?);
    match boot_id.arch() {
        ARCH_TU10X => Ok(&TU10X),
        ARCH_GA10X => Ok(&GA10X),
        _ => Err(BooterError::DRIVER_UNSUPPORTED_CHIP),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBus;

    fn boot_id(arch: u32) -> u32 {
        let mut id = BootId(0);
        id.set_arch(arch);
        id.set_revision(0xa1);
        id.0
    }

    #[test]
    fn test_boot_id_fields() {
        let id = BootId(boot_id(ARCH_GA10X));
        assert_eq!(id.0, 0x1700_00a1);
        assert_eq!(id.arch(), ARCH_GA10X);
        assert_eq!(id.revision(), 0xa1);
    }

    #[test]
    fn test_probe() {
        let bus = FakeBus::default();
        bus.set(BOOT_ID_REG, boot_id(ARCH_TU10X));
        assert_eq!(probe(&bus).unwrap().name(), "tu10x");

        bus.set(BOOT_ID_REG, boot_id(ARCH_GA10X));
        let platform = probe(&bus).unwrap();
        assert_eq!(platform.name(), "ga10x");
        assert_eq!(platform.wpr_addr_shift(), 17);

        bus.set(BOOT_ID_REG, boot_id(0x19));
        assert_eq!(
            probe(&bus).err(),
            Some(BooterError::DRIVER_UNSUPPORTED_CHIP)
        );
    }

    #[test]
    fn test_register_maps_do_not_alias() {
        for regs in [&TU10X_REGS, &GA10X_REGS] {
            let mut offsets = vec![
                regs.fb_size_mb,
                regs.wpr_lo,
                regs.wpr_hi,
                regs.scrub_start,
                regs.scrub_end,
                regs.scrub_ctrl,
                regs.scrub_status,
                regs.fuse_version,
                regs.debug_ctrl,
                regs.target_boot_vector_lo,
                regs.target_boot_vector_hi,
                regs.target_cpuctl,
                regs.mutex_id_acquire,
                regs.mutex_id_release,
                regs.handoff,
                regs.booter_version,
                regs.fw_version,
                regs.wpr_meta_lo,
                regs.wpr_meta_hi,
                regs.boot_status,
            ];
            offsets.extend(regs.revocation);
            offsets.extend((0..MUTEX_SLOT_COUNT).map(|slot| regs.mutex_slot(slot)));
            for window in regs.sub_windows.iter() {
                offsets.extend([window.lo, window.hi, window.cfg]);
            }
            let count = offsets.len();
            offsets.sort_unstable();
            offsets.dedup();
            assert_eq!(offsets.len(), count);
        }
    }

    #[test]
    fn test_debug_decode() {
        assert!(TU10X.debug_mode(1 << 16));
        assert!(!TU10X.debug_mode(1 << 20));
        assert!(GA10X.debug_mode(1 << 20));
        assert!(!GA10X.debug_mode(1 << 16));
    }

    #[test]
    fn test_start_target() {
        let bus = FakeBus::default();
        TU10X.start_target(&bus, 0x1_0000_2000).unwrap();
        let regs = TU10X.regs();
        assert_eq!(bus.get(regs.target_boot_vector_lo), 0x2000);
        assert_eq!(bus.get(regs.target_boot_vector_hi), 1);
        assert_eq!(bus.get(regs.target_cpuctl), TU10X_CPUCTL_STARTCPU);
    }
}
