/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_status.rs

Abstract:

    Booter progress milestones written to the boot status register.

--*/

const LOAD_BOOT_STATUS_BASE: u32 = 0x100;
const RELOAD_BOOT_STATUS_BASE: u32 = 0x200;
const UNLOAD_BOOT_STATUS_BASE: u32 = 0x300;

/// Statuses used by the booter stages to log progress.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooterBootStatus {
    // Load statuses
    LoadStarted = LOAD_BOOT_STATUS_BASE,
    LoadMetadataFetched = LOAD_BOOT_STATUS_BASE + 1,
    LoadLayoutPlanned = LOAD_BOOT_STATUS_BASE + 2,
    LoadRegionLocked = LOAD_BOOT_STATUS_BASE + 3,
    LoadImageCopied = LOAD_BOOT_STATUS_BASE + 4,
    LoadImageVerified = LOAD_BOOT_STATUS_BASE + 5,
    LoadHandoffRecorded = LOAD_BOOT_STATUS_BASE + 6,
    LoadComplete = LOAD_BOOT_STATUS_BASE + 7,

    // Reload statuses
    ReloadStarted = RELOAD_BOOT_STATUS_BASE,
    ReloadMetadataFetched = RELOAD_BOOT_STATUS_BASE + 1,
    ReloadImageVerified = RELOAD_BOOT_STATUS_BASE + 2,
    ReloadComplete = RELOAD_BOOT_STATUS_BASE + 3,

    // Unload statuses
    UnloadStarted = UNLOAD_BOOT_STATUS_BASE,
    UnloadRegionScrubbed = UNLOAD_BOOT_STATUS_BASE + 1,
    UnloadComplete = UNLOAD_BOOT_STATUS_BASE + 2,
}

impl From<BooterBootStatus> for u32 {
    /// Converts to this type from the input type.
    fn from(status: BooterBootStatus) -> u32 {
        status as u32
    }
}
