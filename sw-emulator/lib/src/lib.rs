/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Booter emulator library.

--*/

mod bus;
mod dma;
mod memory;
mod pka;
mod request;
mod sha;
mod signing;
mod soc;
mod timer;

pub use bus::EmuBus;
pub use dma::EmuDma;
pub use memory::{Memory, SharedMemory, SysMem};
pub use pka::EmuPka;
pub use request::{
    LoadRequest, Radix3Builder, Radix3Table, RequestError, StagedRequest, BOOTLOADER_ADDR,
    META_ADDR, RADIX3_BASE, SIGNATURE_ADDR,
};
pub use sha::EmuSha;
pub use signing::SigningKeys;
pub use soc::EmuSoc;
pub use timer::EmuTimer;
