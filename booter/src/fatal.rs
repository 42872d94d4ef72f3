/*++

Licensed under the Apache-2.0 license.

File Name:

    fatal.rs

Abstract:

    File contains the terminal path for unrecoverable errors.

--*/

use booter_drivers::{cprintln, ExitCtrl, Hex32};

/// Halt the booter with `code`. Secrets are scrubbed by their owners on
/// the way here, and the mailbox already holds the reported status.
pub fn fatal(code: u32) -> ! {
    cprintln!("Booter Fatal Error: {}", Hex32(code));
    ExitCtrl::exit(code)
}
