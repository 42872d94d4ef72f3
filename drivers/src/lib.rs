/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the Booter driver library.

--*/

#![cfg_attr(not(feature = "std"), no_std)]

mod dma;
mod exit_ctrl;
mod fuse_bank;
mod hw_mutex;
pub mod memory_layout;
mod phys_addr;
mod pka;
mod platform;
pub mod printer;
mod secret;
mod secure_scratch;
mod sha256;
mod status_reporter;
pub mod wait;
mod wpr;

#[cfg(test)]
mod testing;

pub use dma::{Dma, DmaContext, DmaDirection, DmaEngine, DmaSync, DmaTarget};
pub use exit_ctrl::ExitCtrl;
pub use fuse_bank::FuseBank;
pub use hw_mutex::{CryptoMutex, HandoffMutex, MutexGuard, MutexKind};
pub use phys_addr::{Aperture, PhysAddr};
pub use pka::{be_bytes_to_words, words_to_be_bytes, Pka, PkaEngine, PkaOperand, PkaOperation, PkaWords};
pub use platform::{
    probe, BootId, Bus, Ga10x, PlatformOps, RegisterMap, Soc, SubWindowRegs, Timer, Tu10x,
    ARCH_GA10X, ARCH_TU10X, BOOT_ID_REG, GA10X, MAILBOX0_REG, MAILBOX1_REG, TU10X,
};
pub use printer::{Hex32, Hex64, HexBytes};
pub use secret::Secret;
pub use secure_scratch::{HandoffFlags, HandoffState, SecureScratch};
pub use sha256::{Sha256, ShaAlgo, ShaChunk, ShaContext, ShaEngine, ShaTask};
pub use status_reporter::{report_boot_status, report_status, requester_argument};
pub use wpr::{SubWindow, SubWindowCfg, Wpr, WprRange, LEVEL2_AND_UP, LEVEL3_ONLY, LEVEL_ALL};

cfg_if::cfg_if! {
    if #[cfg(all(feature = "emu", not(feature = "std")))] {
        mod uart;

        pub use uart::Uart;
    }
}
