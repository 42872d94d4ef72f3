/*++

Licensed under the Apache-2.0 license.

File Name:

    status_reporter.rs

Abstract:

    File contains API for reporting boot progress and the final status.

--*/

use crate::platform::{MAILBOX0_REG, MAILBOX1_REG};
use crate::{Bus, RegisterMap};

/// Report boot status
///
/// # Arguments
///
/// * `val` - Boot status code.
pub fn report_boot_status(bus: &dyn Bus, regs: &RegisterMap, val: u32) {
    let _ = bus.write_global(regs.boot_status, val);
}

/// Write the stage result to the requester's mailbox.
pub fn report_status(bus: &dyn Bus, code: u32) {
    bus.write_local(MAILBOX0_REG, code);
}

/// Argument the requester left in the mailbox pair on entry.
pub fn requester_argument(bus: &dyn Bus) -> u64 {
    u64::from(bus.read_local(MAILBOX0_REG)) | (u64::from(bus.read_local(MAILBOX1_REG)) << 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBus;

    #[test]
    fn test_mailbox_pair() {
        let bus = FakeBus::default();
        bus.set_local(MAILBOX0_REG, 0x8000_1000);
        bus.set_local(MAILBOX1_REG, 0x12);
        assert_eq!(requester_argument(&bus), 0x12_8000_1000);

        report_status(&bus, 0x000b_0001);
        assert_eq!(bus.get_local(MAILBOX0_REG), 0x000b_0001);
    }
}
