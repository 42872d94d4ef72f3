/*++

Licensed under the Apache-2.0 license.

File Name:

    hw_mutex.rs

Abstract:

    File contains the cross-binary hardware mutex and its RAII guard.

--*/

use core::marker::PhantomData;

use booter_error::{BooterError, BooterResult};

use crate::memory_layout::MUTEX_ACQUIRE_TIMEOUT_NS;
use crate::{wait, Bus, RegisterMap, Timer};

/// Token values the allocator never hands out.
const MUTEX_ID_NONE: u32 = 0;
const MUTEX_ID_INVALID: u32 = 0xff;

/// A named hardware mutex slot.
pub trait MutexKind {
    const SLOT: usize;
    const NAME: &'static str;
}

/// Guards the handoff scratch state and the shared layout registers.
pub enum HandoffMutex {}

impl MutexKind for HandoffMutex {
    const SLOT: usize = 0;
    const NAME: &'static str = "handoff";
}

/// Guards the SHA and PKA engines.
pub enum CryptoMutex {}

impl MutexKind for CryptoMutex {
    const SLOT: usize = 1;
    const NAME: &'static str = "crypto";
}

/// Ownership of one hardware mutex. Released when dropped.
pub struct MutexGuard<'a, K: MutexKind> {
    bus: &'a dyn Bus,
    regs: &'static RegisterMap,
    token: u32,
    _kind: PhantomData<K>,
}

impl<'a, K: MutexKind> MutexGuard<'a, K> {
    /// Allocate a token and spin until the slot accepts it.
    ///
    /// # Arguments
    ///
    /// * `bus` - Register bus
    /// * `regs` - Register map of the running chip
    /// * `timer` - Time source bounding the spin
    pub fn acquire(
        bus: &'a dyn Bus,
        regs: &'static RegisterMap,
        timer: &dyn Timer,
    ) -> BooterResult<Self> {
        let token = bus.read_global(regs.mutex_id_acquire)?;
        if token == MUTEX_ID_NONE || token == MUTEX_ID_INVALID {
            return Err(BooterError::DRIVER_MUTEX_ID_UNAVAILABLE);
        }

        let slot = regs.mutex_slot(K::SLOT);
        let result = wait::until(
            timer,
            MUTEX_ACQUIRE_TIMEOUT_NS,
            BooterError::DRIVER_MUTEX_ACQUIRE_TIMEOUT,
            || {
                if bus.read_global(slot)? == MUTEX_ID_NONE {
                    bus.write_global(slot, token)?;
                }
                Ok(bus.read_global(slot)? == token)
            },
        );

        match result {
            Ok(()) => Ok(Self {
                bus,
                regs,
                token,
                _kind: PhantomData,
            }),
            Err(err) => {
                let _ = bus.write_global(regs.mutex_id_release, token);
                Err(err)
            }
        }
    }

    pub fn token(&self) -> u32 {
        self.token
    }

    pub fn name(&self) -> &'static str {
        K::NAME
    }

    pub(crate) fn bus(&self) -> &'a dyn Bus {
        self.bus
    }

    pub(crate) fn regs(&self) -> &'static RegisterMap {
        self.regs
    }
}

impl<K: MutexKind> Drop for MutexGuard<'_, K> {
    fn drop(&mut self) {
        let _ = self
            .bus
            .write_global(self.regs.mutex_slot(K::SLOT), MUTEX_ID_NONE);
        let _ = self.bus.write_global(self.regs.mutex_id_release, self.token);
    }
}
