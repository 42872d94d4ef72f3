/*++
Licensed under the Apache-2.0 license.

File Name:

    memory_layout.rs

Abstract:

    The file contains the sizes, granules and timeouts the drivers are
    built around.

--*/

//
// Granules
//
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
pub const SUB_WINDOW_GRANULE_SHIFT: u32 = PAGE_SHIFT;
pub const SCRUB_GRANULE_SHIFT: u32 = PAGE_SHIFT;

//
// Buffers In Bytes
//
pub const BOUNCE_BUFFER_SIZE: usize = PAGE_SIZE as usize;
pub const SHA_BLOCK_SIZE: u64 = 64;
pub const SHA_MAX_TASK_SIZE: u64 = 16 * 1024 * 1024;

//
// Register Groups
//
pub const SUB_WINDOW_COUNT: usize = 3;
pub const REVOCATION_SCRATCH_COUNT: usize = 4;
pub const MUTEX_SLOT_COUNT: usize = 2;

//
// Timeouts In Nanoseconds
//
pub const MUTEX_ACQUIRE_TIMEOUT_NS: u64 = 1_000_000;
pub const SHA_TIMEOUT_NS: u64 = 100_000_000;
pub const PKA_TIMEOUT_NS: u64 = 100_000_000;
pub const DMA_TIMEOUT_NS: u64 = 10_000_000;
pub const SCRUB_TIMEOUT_NS: u64 = 1_000_000_000;

//
// Emulator Registers
//
pub const EMU_UART_ADDR: usize = 0x0010_f000;
pub const EMU_EXIT_ADDR: usize = 0x0010_f004;

#[test]
#[allow(clippy::assertions_on_constants)]
fn mem_layout_test_buffers() {
    assert_eq!(BOUNCE_BUFFER_SIZE as u64, PAGE_SIZE);
    assert_eq!(SHA_MAX_TASK_SIZE % SHA_BLOCK_SIZE, 0);
    assert_eq!(PAGE_SIZE % SHA_BLOCK_SIZE, 0);
}

#[test]
#[allow(clippy::assertions_on_constants)]
fn mem_layout_test_timeouts() {
    assert!(MUTEX_ACQUIRE_TIMEOUT_NS < DMA_TIMEOUT_NS);
    assert!(DMA_TIMEOUT_NS < SHA_TIMEOUT_NS);
    assert!(SHA_TIMEOUT_NS < SCRUB_TIMEOUT_NS);
}
