// src/serial.rs
//
// Two writers for COM1 (0x3F8):
//
//   1. `Serial` — behind a Mutex, used by serial_print!/serial_println!.
//      Safe for general kernel code.  Do NOT use from inside allocators
//      or interrupt handlers (risk of deadlock).
//
//   2. `RawSerialWriter` — NO lock, NO allocation.  Implements fmt::Write
//      so it supports full formatting ({}, {:#x}, {:?}, etc.) via
//      format_args!, which is 100% stack-based.
//      Used by serial_print_raw!/serial_println_raw!.
//      Safe from ANY context: allocators, interrupt handlers, panic.
//
//      Trade-off: concurrent writers may interleave at the byte level.
//      In practice this is fine — serial output is for debugging, and
//      interleaving only happens if an interrupt fires mid-write.
//
// This is the "console driver" the core treats as a collaborator:
// every subsystem formats diagnostics through the macros below and
// never touches the port directly.

use core::fmt;
use spin::Mutex;

use crate::arch::port::outb;

const COM1: u16 = 0x3F8;

// ============================================================================
// Locked writer (general use)
// ============================================================================

static SERIAL: Mutex<Serial> = Mutex::new(Serial::new());

struct Serial;

impl Serial {
    const fn new() -> Self {
        Self
    }

    fn write_byte(&mut self, byte: u8) {
        unsafe {
            outb(COM1, byte);
        }
    }
}

impl fmt::Write for Serial {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
        Ok(())
    }
}

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    use fmt::Write;
    SERIAL.lock().write_fmt(args).unwrap();
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::_print(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}

// ============================================================================
// Lock-free writer (allocators, interrupts, panic)
// ============================================================================

/// Lock-free, allocation-free serial writer.
///
/// SAFETY: Can be called from any context. Output may interleave if
/// an interrupt fires mid-write — acceptable for debug output.
pub struct RawSerialWriter;

impl fmt::Write for RawSerialWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            unsafe {
                outb(COM1, byte);
            }
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! serial_print_raw {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = write!($crate::serial::RawSerialWriter, $($arg)*);
    }};
}

#[macro_export]
macro_rules! serial_println_raw {
    () => ($crate::serial_print_raw!("\n"));
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let _ = writeln!($crate::serial::RawSerialWriter, $($arg)*);
    }};
}
