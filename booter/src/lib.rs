/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the booter stages: region planning, scattered
    image fetch, handoff sequencing and the load, reload and unload flows.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

pub mod boot_status;
pub mod entry;
pub mod env;
pub mod fatal;
pub mod flow;
pub mod handoff;
pub mod keys;
pub mod layout;
pub mod radix3;
pub mod verifier;

pub use boot_status::BooterBootStatus;
pub use entry::{execute, stage_entry};
pub use handoff::{record_target_handoff, Handoff, Stage};
pub use layout::{plan, PlanRequest, RegionAlignments, RegionLayout};
pub use radix3::Radix3;

/// Version of this booter. Recorded by load and required of every later
/// stage in the same cycle.
pub const BOOTER_VERSION: u32 = 1;
