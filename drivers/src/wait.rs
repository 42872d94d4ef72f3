/*++

Licensed under the Apache-2.0 license.

File Name:

    wait.rs

Abstract:

    File contains the bounded polling routine used by every driver.

--*/

use crate::Timer;
use booter_error::{BooterError, BooterResult};

/// Poll `predicate` until it returns true or `timeout_ns` elapses.
///
/// # Arguments
///
/// * `timer` - Monotonic time source
/// * `timeout_ns` - Polling budget
/// * `err` - Error returned on expiry
/// * `predicate` - Condition to wait for; its errors abort the wait
pub fn until<F>(
    timer: &dyn Timer,
    timeout_ns: u64,
    err: BooterError,
    mut predicate: F,
) -> BooterResult<()>
where
    F: FnMut() -> BooterResult<bool>,
{
    let start = timer.now_ns();
    loop {
        if predicate()? {
            return Ok(());
        }
        if timer.now_ns().wrapping_sub(start) >= timeout_ns {
            return Err(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTimer;
    use core::cell::Cell;

    #[test]
    fn test_until_succeeds() {
        let timer = FakeTimer::new(10);
        let polls = Cell::new(0);
        let result = until(&timer, 1000, BooterError::DRIVER_DMA_TIMEOUT, || {
            polls.set(polls.get() + 1);
            Ok(polls.get() == 5)
        });
        assert_eq!(result, Ok(()));
        assert_eq!(polls.get(), 5);
    }

    #[test]
    fn test_until_times_out() {
        let timer = FakeTimer::new(10);
        let result = until(&timer, 100, BooterError::DRIVER_SHA256_TIMEOUT, || Ok(false));
        assert_eq!(result, Err(BooterError::DRIVER_SHA256_TIMEOUT));
    }

    #[test]
    fn test_until_propagates_predicate_error() {
        let timer = FakeTimer::new(10);
        let result = until(&timer, 100, BooterError::DRIVER_SHA256_TIMEOUT, || {
            Err(BooterError::DRIVER_BUS_ERROR)
        });
        assert_eq!(result, Err(BooterError::DRIVER_BUS_ERROR));
    }
}
