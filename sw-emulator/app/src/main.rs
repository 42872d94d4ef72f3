/*++

Licensed under the Apache-2.0 license.

File Name:

    main.rs

Abstract:

    File contains main entrypoint for the Booter emulator. Runs one full
    Load, Reload, Unload cycle against a synthetic firmware request, acting
    as the target firmware between stages.

--*/

use booter::{execute, record_target_handoff, Stage};
use booter_drivers::{HandoffFlags, PlatformOps, GA10X, TU10X};
use booter_emu::{EmuSoc, LoadRequest, SigningKeys, META_ADDR};
use booter_image_types::LsKeys;
use clap::{arg, value_parser, ArgAction};
use std::process::exit;

fn platform(name: &str) -> Option<&'static dyn PlatformOps> {
    match name {
        "tu10x" => Some(&TU10X),
        "ga10x" => Some(&GA10X),
        _ => None,
    }
}

/// Mark a target transition the way the firmware would.
fn target_handoff(soc: &EmuSoc, flag: HandoffFlags) -> bool {
    let result = soc
        .handoff_guard()
        .and_then(|mut guard| record_target_handoff(&mut guard, flag));
    match result {
        Ok(()) => true,
        Err(err) => {
            println!("target handoff {:?} failed: 0x{:08x}", flag, u32::from(err));
            false
        }
    }
}

fn run_stage(soc: &mut EmuSoc, stage: Stage, keys: &LsKeys) -> bool {
    soc.bus.clear_target();
    let code = execute(stage, soc.soc(), keys);
    println!(
        "{:>6}: status 0x{:08x} boot status 0x{:04x} target {}",
        stage.name(),
        code,
        soc.boot_status(),
        soc.target_boot_vector()
            .map_or_else(|| "halted".to_string(), |vector| format!("started at 0x{vector:x}"))
    );
    code == 0
}

fn main() {
    let args = clap::Command::new("booter-emu")
        .about("Booter emulator")
        .arg(
            arg!(--chip <NAME> "Chip to emulate: tu10x or ga10x")
                .required(false)
                .default_value("tu10x"),
        )
        .arg(
            arg!(--fb-mb <VALUE> "FB size in MiB")
                .required(false)
                .default_value("64")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            arg!(--image-size <VALUE> "Firmware image size in bytes")
                .required(false)
                .default_value("1048576")
                .value_parser(value_parser!(usize)),
        )
        .arg(arg!(--debug "Run with the debug fuse set").action(ArgAction::SetTrue))
        .arg(
            arg!(--cycles <VALUE> "Number of boot cycles")
                .required(false)
                .default_value("1")
                .value_parser(value_parser!(u32)),
        )
        .get_matches();

    let chip = args.get_one::<String>("chip").map(String::as_str).unwrap_or("tu10x");
    let Some(platform) = platform(chip) else {
        println!("Unknown chip {chip}");
        exit(-1);
    };
    let fb_size = args.get_one::<u64>("fb-mb").copied().unwrap_or(64) << 20;
    let image_size = args.get_one::<usize>("image-size").copied().unwrap_or(1 << 20);
    let cycles = args.get_one::<u32>("cycles").copied().unwrap_or(1);

    let signing = match SigningKeys::generate() {
        Ok(keys) => keys,
        Err(err) => {
            println!("Key generation failed: {err}");
            exit(-1);
        }
    };
    let keys = match signing.ls_keys() {
        Ok(keys) => keys,
        Err(err) => {
            println!("Key export failed: {err}");
            exit(-1);
        }
    };

    let mut soc = EmuSoc::new(platform, fb_size);
    soc.set_debug_mode(args.get_flag("debug"));
    let request = LoadRequest::new(fb_size, image_size);
    if let Err(err) = request.stage(&soc, &signing) {
        println!("Staging the request failed: {err:?}");
        exit(-1);
    }
    println!("{}: FB {} MiB, image {} bytes", platform.name(), fb_size >> 20, image_size);

    for cycle in 0..cycles {
        println!("cycle {cycle}");
        // The previous status overwrote the request pointer
        soc.set_mailbox_argument(META_ADDR);
        let ok = run_stage(&mut soc, Stage::Load, &keys)
            && target_handoff(&soc, HandoffFlags::HANDOFF_AB)
            && run_stage(&mut soc, Stage::Reload, &keys)
            && target_handoff(&soc, HandoffFlags::HANDOFF_CD)
            && run_stage(&mut soc, Stage::Unload, &keys);
        if !ok {
            exit(1);
        }
    }
}
