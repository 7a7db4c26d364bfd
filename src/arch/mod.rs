//! Narrow hand-rolled interfaces onto the machine.
//!
//! Everything in this module is a direct `core::arch::asm!` wrapper —
//! the same style the rest of the tree already uses for the PIC and PIT
//! (see [`crate::interrupts::pic`] and [`crate::interrupts::pit`]).
//! A 32-bit protected-mode kernel does not get to use a 64-bit-addressed
//! crate for CR2/CR3/`invlpg`, so these are written by hand instead of
//! pulled in from a register-abstraction crate.

pub mod port;
pub mod regs;

pub use port::{inb, inw, outb, outw};
pub use regs::{cr2, disable_interrupts, enable_interrupts, invlpg, load_cr3, read_cr3};
