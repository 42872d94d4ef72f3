/*++

Licensed under the Apache-2.0 license.

File Name:

    timer.rs

Abstract:

    File contains the emulated monotonic timer. Every read advances time.

--*/

use std::cell::Cell;

use booter_drivers::Timer;

pub struct EmuTimer {
    now: Cell<u64>,
    step: u64,
}

impl EmuTimer {
    pub const DEFAULT_STEP_NS: u64 = 1000;

    pub fn new(step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
        }
    }
}

impl Default for EmuTimer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_STEP_NS)
    }
}

impl Timer for EmuTimer {
    fn now_ns(&self) -> u64 {
        let now = self.now.get() + self.step;
        self.now.set(now);
        now
    }
}
