/*++

Licensed under the Apache-2.0 license.

File Name:

    entry.rs

Abstract:

    File contains the per-stage entry points. Every stage result leaves the
    chip through the status mailbox.

--*/

use booter_drivers::{cprintln, report_status, ExitCtrl, Hex32, Soc};
use booter_image_types::LsKeys;

use crate::env::BooterEnv;
use crate::fatal::fatal;
use crate::flow;
use crate::handoff::Stage;
use crate::keys::LS_KEYS;

/// Run one stage to completion.
///
/// # Arguments
///
/// * `stage` - Booter binary being run
/// * `soc` - Collaborators of the running chip
/// * `keys` - LS verification keys
///
/// # Returns
///
/// * `u32` - Code written to the status mailbox; zero on success
pub fn execute<'a>(stage: Stage, soc: Soc<'a>, keys: &'a LsKeys) -> u32 {
    let bus = soc.bus;
    let result = BooterEnv::new(soc, keys).and_then(|mut env| flow::run(stage, &mut env));

    let code = match result {
        Ok(()) => 0,
        Err(err) => {
            cprintln!("[{}] Error {}", stage.name(), Hex32(u32::from(err)));
            u32::from(err.reported())
        }
    };
    report_status(bus, code);
    code
}

/// Firmware entry for `stage` with the build-time keys.
pub fn stage_entry(stage: Stage, soc: Soc<'_>) -> ! {
    match execute(stage, soc, &LS_KEYS) {
        0 => ExitCtrl::exit(0),
        code => fatal(code),
    }
}
