//! Serial port output for diagnostics
//!
//! Writes to COM1 (0x3F8), which the host firmware has already initialized
//! by the time the AP launch code runs.

use core::fmt::{self, Write};

use spin::Mutex;
use x86_64::instructions::port::Port;

/// COM1 port address
pub const COM1: u16 = 0x3F8;

/// Line status register offset
const LINE_STATUS: u16 = 5;

/// Transmit holding register empty
const THR_EMPTY: u8 = 0x20;

/// Polled UART transmitter
pub struct SerialWriter {
    data: Port<u8>,
    line_status: Port<u8>,
}

impl SerialWriter {
    pub const fn new(base: u16) -> Self {
        Self {
            data: Port::new(base),
            line_status: Port::new(base + LINE_STATUS),
        }
    }

    fn write_byte(&mut self, byte: u8) {
        // SAFETY: COM1 is owned by the diagnostic console at this boot stage
        unsafe {
            while self.line_status.read() & THR_EMPTY == 0 {
                core::hint::spin_loop();
            }
            self.data.write(byte);
        }
    }
}

impl Write for SerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
        Ok(())
    }
}

/// Global serial writer
pub static WRITER: Mutex<SerialWriter> = Mutex::new(SerialWriter::new(COM1));

/// Print to serial port
pub fn _print(args: fmt::Arguments<'_>) {
    // A lost diagnostic line is not worth stopping the boot for
    let _ = WRITER.lock().write_fmt(args);
}

/// Print macro for serial output
#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::serial::_print(format_args!($($arg)*)));
}

/// Print with newline macro for serial output
#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
