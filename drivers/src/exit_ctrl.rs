/*++

Licensed under the Apache-2.0 license.

File Name:

    exit_ctrl.rs

Abstract:

    File contains API for halting the booter core

--*/

/// Exit control
pub enum ExitCtrl {}

impl ExitCtrl {
    /// Stop executing
    ///
    /// # Arguments
    ///
    /// * `exit_code`: Code reported to the emulator or host process
    ///
    /// # Returns
    ///
    /// This method does not return
    #[cfg(feature = "std")]
    pub fn exit(exit_code: u32) -> ! {
        std::process::exit(if exit_code == 0 { 0 } else { 1 })
    }

    /// Stop executing
    ///
    /// # Arguments
    ///
    /// * `exit_code`: Code reported to the emulator
    ///
    /// # Returns
    ///
    /// This method does not return
    #[cfg(not(feature = "std"))]
    pub fn exit(exit_code: u32) -> ! {
        if cfg!(feature = "emu") {
            let exit = crate::memory_layout::EMU_EXIT_ADDR as *mut u32;
            unsafe {
                core::ptr::write_volatile(exit, if exit_code == 0 { 0xff } else { 0x01 });
            }
        }

        loop {
            core::hint::spin_loop();
        }
    }
}
