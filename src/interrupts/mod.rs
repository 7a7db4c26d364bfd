// src/interrupts/mod.rs
//
// Builds the IDT and wires CPU exceptions and IRQs to the core
// modules they belong to: page faults bridge into `memory`, the
// timer tick drives `sched`, and IRQ14 wakes `disk`. Assembling the
// raw interrupt-entry trampolines is the compiler's job via the
// `x86-interrupt` calling convention; no hand-written asm stubs live
// here, in line with the interrupt-dispatch glue being a narrow,
// out-of-scope collaborator.
//
// `idt` and everything that builds and loads it only compile on
// targets where the compiler can spell `extern "x86-interrupt"` at
// all. Other hosts (a non-x86 `cargo test --lib` run) get stub
// `init_idt`/`init_hardware` entry points so the rest of the crate
// still builds against a stable API.

pub mod exception;
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub mod idt;
pub mod pic;
pub mod pit;

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod dispatch {
    use spin::Once;

    use super::exception::ExceptionStackFrame;
    use super::idt::InterruptDescriptorTable;
    use super::pic;

    const PF_PRESENT: u32 = 1 << 0;
    const PF_WRITE: u32 = 1 << 1;
    const PF_USER: u32 = 1 << 2;

    static IDT: Once<InterruptDescriptorTable> = Once::new();

    /// Build the IDT. Must run once, before `load_idt`.
    pub fn init_idt() {
        IDT.call_once(|| {
            let mut idt = InterruptDescriptorTable::new();
            idt.add_handler(0, divide_by_zero_handler);
            idt.add_handler(6, invalid_opcode_handler);
            idt.add_double_fault_handler(8, double_fault_handler);
            idt.add_handler_with_error(13, general_protection_fault_handler);
            idt.add_handler_with_error(14, page_fault_handler);
            idt.add_handler(pic::Irq::Timer.vector(), timer_interrupt_handler);
            idt.add_handler(pic::Irq::Disk.vector(), disk_interrupt_handler);
            idt
        });
    }

    fn load_idt() {
        IDT.get().expect("init_idt must run before load_idt").load();
    }

    /// Remap the PICs, unmask timer and disk, program the PIT, and load
    /// the IDT. `hz` is the round-robin preemption frequency.
    pub fn init_hardware(hz: u32) {
        pic::initialize();
        pic::enable_irq(pic::Irq::Timer.line());
        pic::enable_irq(pic::Irq::Disk.line());
        super::pit::init(hz);
        load_idt();
    }

    extern "x86-interrupt" fn divide_by_zero_handler(sf: &mut ExceptionStackFrame) {
        panic!("DIVIDE BY ZERO at {:#x}", sf.instruction_pointer);
    }

    extern "x86-interrupt" fn invalid_opcode_handler(sf: &mut ExceptionStackFrame) {
        panic!("INVALID OPCODE at {:#x}", sf.instruction_pointer);
    }

    extern "x86-interrupt" fn double_fault_handler(sf: &mut ExceptionStackFrame, error_code: u32) -> ! {
        panic!("DOUBLE FAULT (error {}) at {:#x}", error_code, sf.instruction_pointer);
    }

    extern "x86-interrupt" fn general_protection_fault_handler(sf: &mut ExceptionStackFrame, error_code: u32) {
        panic!("GENERAL PROTECTION FAULT (error {}) at {:#x}", error_code, sf.instruction_pointer);
    }

    /// Page fault entry point: pulls the faulting address off CR2 and
    /// hands it, along with the decoded error bits, to the core page
    /// table. A fault the core can't resolve (bad reference, no pool
    /// registered for the address, out of frames) is fatal — there is no
    /// user-mode process here to kill instead.
    extern "x86-interrupt" fn page_fault_handler(sf: &mut ExceptionStackFrame, error_code: u32) {
        let fault_addr = crate::arch::regs::cr2();
        let present = error_code & PF_PRESENT != 0;
        let write = error_code & PF_WRITE != 0;
        let user = error_code & PF_USER != 0;

        if let Err(e) = crate::memory::handle_page_fault(fault_addr, present, write, user) {
            panic!(
                "PAGE FAULT\n  address: {:#x}\n  present={} write={} user={}\n  {}\n  eip: {:#x}",
                fault_addr, present, write, user, e, sf.instruction_pointer
            );
        }
    }

    extern "x86-interrupt" fn timer_interrupt_handler(_sf: &mut ExceptionStackFrame) {
        pic::end_of_interrupt(pic::Irq::Timer.line());
        crate::sched::timer_tick();
    }

    extern "x86-interrupt" fn disk_interrupt_handler(_sf: &mut ExceptionStackFrame) {
        pic::end_of_interrupt(pic::Irq::Disk.line());
        crate::disk::handle_interrupt();
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub use dispatch::{init_hardware, init_idt};

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn init_idt() {}

#[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
pub fn init_hardware(_hz: u32) {}
