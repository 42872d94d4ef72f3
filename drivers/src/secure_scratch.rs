/*++

Licensed under the Apache-2.0 license.

File Name:

    secure_scratch.rs

Abstract:

    File contains access to the persistent handoff scratch registers.
    Every access requires a held handoff mutex.

--*/

use booter_error::{BooterError, BooterResult};

use crate::{HandoffMutex, MutexGuard};

bitflags::bitflags! {
    /// Stage completion flags. A clear bit is "init", a set bit is "done".
    pub struct HandoffFlags: u32 {
        const LOAD_DONE = 1 << 0;
        const HANDOFF_AB = 1 << 1;
        const HANDOFF_BC = 1 << 2;
        const HANDOFF_CD = 1 << 3;
    }
}

/// Cross-stage state persisted in secure scratch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandoffState {
    pub flags: HandoffFlags,

    /// Version of the booter that ran Load. Zero when no Load is recorded.
    pub booter_version: u32,

    /// Verified ucode version of the target firmware.
    pub fw_version: u32,

    /// FB offset of the in-region metadata copy.
    pub wpr_meta_offset: u64,
}

impl Default for HandoffState {
    fn default() -> Self {
        Self {
            flags: HandoffFlags::empty(),
            booter_version: 0,
            fw_version: 0,
            wpr_meta_offset: 0,
        }
    }
}

pub enum SecureScratch {}

impl SecureScratch {
    /// Read the handoff state. Unknown flag bits mean another agent wrote
    /// the word and the sequence can no longer be trusted.
    pub fn read(guard: &mut MutexGuard<'_, HandoffMutex>) -> BooterResult<HandoffState> {
        let bus = guard.bus();
        let regs = guard.regs();

        let flags = HandoffFlags::from_bits(bus.read_global(regs.handoff)?)
            .ok_or(BooterError::HANDOFF_SEQUENCE_BROKEN)?;
        let lo = bus.read_global(regs.wpr_meta_lo)? as u64;
        let hi = bus.read_global(regs.wpr_meta_hi)? as u64;

        Ok(HandoffState {
            flags,
            booter_version: bus.read_global(regs.booter_version)?,
            fw_version: bus.read_global(regs.fw_version)?,
            wpr_meta_offset: lo | (hi << 32),
        })
    }

    /// Write the handoff state. The flag word is written last so that a
    /// reader never sees new flags with stale versions.
    pub fn write(
        guard: &mut MutexGuard<'_, HandoffMutex>,
        state: &HandoffState,
    ) -> BooterResult<()> {
        let bus = guard.bus();
        let regs = guard.regs();

        bus.write_global(regs.booter_version, state.booter_version)?;
        bus.write_global(regs.fw_version, state.fw_version)?;
        bus.write_global(regs.wpr_meta_lo, state.wpr_meta_offset as u32)?;
        bus.write_global(regs.wpr_meta_hi, (state.wpr_meta_offset >> 32) as u32)?;
        bus.write_global(regs.handoff, state.flags.bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeBus, FakeTimer};
    use crate::{PlatformOps, TU10X};

    #[test]
    fn test_flag_bits() {
        assert_eq!(HandoffFlags::LOAD_DONE.bits(), 0x1);
        assert_eq!(HandoffFlags::HANDOFF_AB.bits(), 0x2);
        assert_eq!(HandoffFlags::HANDOFF_BC.bits(), 0x4);
        assert_eq!(HandoffFlags::HANDOFF_CD.bits(), 0x8);
    }

    #[test]
    fn test_write_then_read() {
        let regs = TU10X.regs();
        let bus = FakeBus::default();
        bus.set(regs.mutex_id_acquire, 1);
        let timer = FakeTimer::new(1);
        let mut guard = MutexGuard::<HandoffMutex>::acquire(&bus, regs, &timer).unwrap();

        assert_eq!(SecureScratch::read(&mut guard), Ok(HandoffState::default()));

        let state = HandoffState {
            flags: HandoffFlags::LOAD_DONE | HandoffFlags::HANDOFF_AB,
            booter_version: 3,
            fw_version: 7,
            wpr_meta_offset: 0x1_0170_0000,
        };
        SecureScratch::write(&mut guard, &state).unwrap();
        assert_eq!(bus.get(regs.handoff), 0x3);
        assert_eq!(bus.get(regs.wpr_meta_hi), 1);
        assert_eq!(SecureScratch::read(&mut guard), Ok(state));
    }

    #[test]
    fn test_unknown_bits_rejected() {
        let regs = TU10X.regs();
        let bus = FakeBus::default();
        bus.set(regs.mutex_id_acquire, 1);
        bus.set(regs.handoff, 0x11);
        let timer = FakeTimer::new(1);
        let mut guard = MutexGuard::<HandoffMutex>::acquire(&bus, regs, &timer).unwrap();
        assert_eq!(
            SecureScratch::read(&mut guard),
            Err(BooterError::HANDOFF_SEQUENCE_BROKEN)
        );
    }
}
