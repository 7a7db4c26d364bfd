//! Core of a small x86 (32-bit protected mode) teaching kernel.
//!
//! This crate is split so the hard parts — physical frame allocation,
//! two-level paging, per-process virtual memory regions, scheduling, the
//! disk client, and the file system — can be exercised with `cargo test`
//! on the host. Only [`arch`] and the interrupt plumbing actually need
//! real x86 hardware; everything else is plain data structures and
//! algorithms behind narrow traits.
//!
//! Run the host test suite with `cargo test --lib`; building the `kernel`
//! binary target requires a bare-metal target triple and is not part of
//! that invocation.
#![cfg_attr(not(test), no_std)]
#![feature(abi_x86_interrupt)]
#![allow(clippy::missing_safety_doc)]

extern crate alloc;

pub mod arch;
pub mod disk;
pub mod error;
pub mod fs;
pub mod heap;
pub mod interrupts;
pub mod memory;
pub mod panic_handler;
pub mod sched;
pub mod serial;

pub use error::KernelError;
