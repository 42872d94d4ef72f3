/*++

Licensed under the Apache-2.0 license.

File Name:

    revocation.rs

Abstract:

    Revocation floors for LS ucode branches and the booter fuse version.

--*/

use booter_drivers::memory_layout::REVOCATION_SCRATCH_COUNT;
use booter_error::{BooterError, BooterResult};

/// Floors packed into each scratch register.
pub const FLOORS_PER_REGISTER: u32 = 5;

const FLOOR_BITS: u32 = 6;
const FLOOR_MASK: u32 = (1 << FLOOR_BITS) - 1;

/// Bit 31 is never part of a floor field. Seeing it set means the register
/// was written by something that does not know the format.
const REGISTER_RESERVED_BIT: u32 = 1 << 31;

pub const BRANCH_COUNT: usize = FLOORS_PER_REGISTER as usize * REVOCATION_SCRATCH_COUNT;

/// Floors compiled into this booter, indexed by ucode ID.
pub const HARD_CODED_FLOORS: [u32; BRANCH_COUNT] = [
    0, 0, 0, 0, 2, 1, 0, 0, 0, 0, //
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Decode the runtime floor for `branch` from the scratch group.
///
/// # Arguments
///
/// * `read_scratch` - Reads scratch register `index`
/// * `branch` - Ucode branch
///
/// # Returns
///
/// The floor, or `REVOCATION_REVOKED` if the branch is fully revoked or its
/// floor cannot be read
pub fn scratch_floor(
    mut read_scratch: impl FnMut(usize) -> BooterResult<u32>,
    branch: u32,
) -> BooterResult<u32> {
    let index = (branch / FLOORS_PER_REGISTER) as usize;
    if index >= REVOCATION_SCRATCH_COUNT {
        return Err(BooterError::REVOCATION_REVOKED);
    }
    let reg = read_scratch(index).map_err(|_| BooterError::REVOCATION_REVOKED)?;
    if reg & REGISTER_RESERVED_BIT != 0 {
        return Err(BooterError::REVOCATION_REVOKED);
    }

    let floor = (reg >> ((branch % FLOORS_PER_REGISTER) * FLOOR_BITS)) & FLOOR_MASK;
    if floor == FLOOR_MASK {
        return Err(BooterError::REVOCATION_REVOKED);
    }
    Ok(floor)
}

/// Fail unless `revision` reaches both the compiled-in and the runtime floor
/// of `branch`.
pub fn check_revocation(
    read_scratch: impl FnMut(usize) -> BooterResult<u32>,
    branch: u32,
    revision: u32,
) -> BooterResult<()> {
    let hard = *HARD_CODED_FLOORS
        .get(branch as usize)
        .ok_or(BooterError::REVOCATION_REVOKED)?;
    let floor = hard.max(scratch_floor(read_scratch, branch)?);
    if revision < floor {
        return Err(BooterError::REVOCATION_REVOKED);
    }
    Ok(())
}

/// The running booter must not be older than the version burned in fuses.
pub fn check_fuse_version(booter_version: u32, fuse_version: u32) -> BooterResult<()> {
    if booter_version < fuse_version {
        return Err(BooterError::REVOCATION_FUSE_VERSION);
    }
    Ok(())
}
