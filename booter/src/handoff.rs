/*++

Licensed under the Apache-2.0 license.

File Name:

    handoff.rs

Abstract:

    File contains the cross-stage handoff state machine. Every transition is
    checked and written while the handoff mutex is held.

--*/

use booter_drivers::{HandoffFlags, HandoffMutex, HandoffState, MutexGuard, SecureScratch};
use booter_error::{BooterError, BooterResult};

/// Booter binaries that share the handoff state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Load,
    Reload,
    Unload,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Reload => "reload",
            Stage::Unload => "unload",
        }
    }
}

pub struct Handoff {
    version: u32,
}

impl Handoff {
    /// # Arguments
    ///
    /// * `version` - Compiled-in version of the running booter
    pub fn new(version: u32) -> Self {
        Self { version }
    }

    /// Check that `stage` may run from `state`.
    pub fn check(&self, stage: Stage, state: &HandoffState) -> BooterResult<()> {
        let flags = state.flags;
        match stage {
            Stage::Load => {
                if !flags.is_empty() {
                    return Err(BooterError::HANDOFF_SEQUENCE_BROKEN);
                }
                if state.booter_version != 0 {
                    return Err(BooterError::HANDOFF_VERSION_MISMATCH);
                }
            }
            Stage::Reload => {
                if flags != HandoffFlags::LOAD_DONE | HandoffFlags::HANDOFF_AB {
                    return Err(BooterError::HANDOFF_SEQUENCE_BROKEN);
                }
                self.check_version(state)?;
            }
            Stage::Unload => {
                if flags != HandoffFlags::all() {
                    return Err(BooterError::HANDOFF_SEQUENCE_BROKEN);
                }
                self.check_version(state)?;
            }
        }
        Ok(())
    }

    fn check_version(&self, state: &HandoffState) -> BooterResult<()> {
        if state.booter_version != self.version {
            return Err(BooterError::HANDOFF_VERSION_MISMATCH);
        }
        Ok(())
    }

    /// Read the state and check that `stage` may run.
    pub fn begin(
        &self,
        stage: Stage,
        guard: &mut MutexGuard<'_, HandoffMutex>,
    ) -> BooterResult<HandoffState> {
        let state = SecureScratch::read(guard)?;
        self.check(stage, &state)?;
        Ok(state)
    }

    /// Record a successful Load.
    pub fn complete_load(
        &self,
        guard: &mut MutexGuard<'_, HandoffMutex>,
        fw_version: u32,
        wpr_meta_offset: u64,
    ) -> BooterResult<()> {
        self.begin(Stage::Load, guard)?;
        SecureScratch::write(
            guard,
            &HandoffState {
                flags: HandoffFlags::LOAD_DONE,
                booter_version: self.version,
                fw_version,
                wpr_meta_offset,
            },
        )
    }

    /// Record a successful Reload.
    pub fn complete_reload(&self, guard: &mut MutexGuard<'_, HandoffMutex>) -> BooterResult<()> {
        let mut state = self.begin(Stage::Reload, guard)?;
        state.flags |= HandoffFlags::HANDOFF_BC;
        SecureScratch::write(guard, &state)
    }

    /// Record a successful Unload. Every flag returns to init and the
    /// recorded versions and layout pointer are cleared.
    pub fn complete_unload(&self, guard: &mut MutexGuard<'_, HandoffMutex>) -> BooterResult<()> {
        self.begin(Stage::Unload, guard)?;
        SecureScratch::write(guard, &HandoffState::default())
    }
}

/// Mark a target firmware transition done. Only `HANDOFF_AB` and
/// `HANDOFF_CD` belong to the target.
pub fn record_target_handoff(
    guard: &mut MutexGuard<'_, HandoffMutex>,
    flag: HandoffFlags,
) -> BooterResult<()> {
    let mut state = SecureScratch::read(guard)?;
    let required = if flag == HandoffFlags::HANDOFF_AB {
        HandoffFlags::LOAD_DONE
    } else if flag == HandoffFlags::HANDOFF_CD {
        HandoffFlags::LOAD_DONE | HandoffFlags::HANDOFF_AB | HandoffFlags::HANDOFF_BC
    } else {
        return Err(BooterError::HANDOFF_SEQUENCE_BROKEN);
    };
    if state.flags != required {
        return Err(BooterError::HANDOFF_SEQUENCE_BROKEN);
    }
    state.flags |= flag;
    SecureScratch::write(guard, &state)
}
