// src/main.rs
//
// Boot entry point. Bringing up real protected mode (GDT, A20, the
// jump into 32-bit code) is the bootstrap collaborator's job — this
// binary assumes a loader has already landed it in 32-bit protected
// mode with paging off and control handed to `_start`. Order below is
// dependency order: interrupts wired up first, then memory, then
// hardware IRQs unmasked, then disk and the scheduler, ending with
// the idle loop.

#![no_std]
#![no_main]

use pmkernel::disk::NonBlockingDisk;
use pmkernel::sched::RRScheduler;
use pmkernel::{disk, heap, interrupts, memory, sched, serial_println};

const KERNEL_POOL_BASE: u32 = 0;
const KERNEL_POOL_FRAMES: u32 = 1024; // 4 MiB of frame bookkeeping
const PROCESS_POOL_BASE: u32 = 1024;
const PROCESS_POOL_FRAMES: u32 = 3072;
const IDENTITY_MAPPED_BYTES: u32 = 4 * 1024 * 1024;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    heap::init();
    serial_println!("heap online");

    interrupts::init_idt();
    serial_println!("idt built");

    memory::init(
        KERNEL_POOL_BASE,
        KERNEL_POOL_FRAMES,
        PROCESS_POOL_BASE,
        PROCESS_POOL_FRAMES,
        IDENTITY_MAPPED_BYTES,
    )
    .expect("memory::init failed");
    serial_println!("paging enabled");

    interrupts::init_hardware(sched::DEFAULT_QUANTUM_HZ);
    serial_println!("PIC/PIT programmed, IDT loaded");

    disk::install(NonBlockingDisk::new(true));
    serial_println!("disk driver installed");

    sched::install(RRScheduler::new(sched::DEFAULT_QUANTUM_HZ));
    sched::resume(sched::new_thread_id());
    serial_println!("scheduler running");

    loop {
        unsafe { core::arch::asm!("hlt") };
    }
}
