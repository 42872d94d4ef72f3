/*++

Licensed under the Apache-2.0 license.

File Name:

    uart.rs

Abstract:

    File contains API for the emulator UART

--*/

use crate::memory_layout::EMU_UART_ADDR;

#[derive(Default, Debug)]
pub struct Uart {}

impl Uart {
    /// Write the string to UART
    ///
    /// # Arguments
    ///
    /// `str` - String to write to UART
    pub fn write(&mut self, str: &str) {
        for byte in str.bytes() {
            match byte {
                0x20..=0x7e | b'\n' | b'\t' => self.write_byte(byte),
                _ => self.write_byte(0xfe),
            }
        }
    }

    /// Write the byte to UART
    ///
    /// # Arguments
    ///
    /// `byte` - Byte to write to UART
    pub fn write_byte(&mut self, byte: u8) {
        unsafe {
            core::ptr::write_volatile(EMU_UART_ADDR as *mut u32, byte as u32);
        }
    }
}
