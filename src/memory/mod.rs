// src/memory/mod.rs
//
// Wires the three memory modules together behind one process-wide
// entry point: `init` builds the kernel/process frame pools and the
// active page table, and `handle_page_fault` is the narrow interface
// the interrupt layer calls into on vector 14.

pub mod frame_pool;
pub mod page_table;
pub mod phys;
pub mod vm_pool;

use spin::Mutex;

use crate::error::KernelResult;
pub use frame_pool::ContFramePool;
pub use page_table::PageTable;
pub use vm_pool::VMPool;

static ACTIVE_PAGE_TABLE: Mutex<Option<PageTable>> = Mutex::new(None);

/// Build the kernel and process frame pools and the initial page
/// table, then switch to it. `shared_size` bytes at the bottom of the
/// address space are identity-mapped; everything above is
/// demand-paged through VMPools registered later.
pub fn init(
    kernel_base: u32,
    kernel_frames: u32,
    process_base: u32,
    process_frames: u32,
    shared_size: u32,
) -> KernelResult<()> {
    let kernel_pool = ContFramePool::new(kernel_base, kernel_frames, 0)?;
    let process_pool = ContFramePool::new(process_base, process_frames, 0)?;
    page_table::init(kernel_pool, process_pool, shared_size);

    let table = PageTable::new()?;
    #[cfg(not(test))]
    {
        table.load();
        table.enable_paging();
    }
    *ACTIVE_PAGE_TABLE.lock() = Some(table);
    Ok(())
}

/// Called from the page fault vector with the decoded error-code bits.
pub fn handle_page_fault(fault_addr: u32, present: bool, write: bool, user: bool) -> KernelResult<()> {
    let mut guard = ACTIVE_PAGE_TABLE.lock();
    let table = guard.as_mut().expect("memory::init must run before faults are handled");
    table.handle_fault(fault_addr, present, write, user)
}

/// Register a VMPool's window with the active page table.
pub fn register_pool(base: u32, size: u32) {
    let mut guard = ACTIVE_PAGE_TABLE.lock();
    if let Some(table) = guard.as_mut() {
        table.register_pool(base, size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_builds_a_loadable_table() {
        frame_pool::ContFramePool::reset_registry();
        assert!(init(0, 256, 256, 256, 1024 * 1024).is_ok());
    }
}
