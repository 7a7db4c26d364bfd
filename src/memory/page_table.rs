// src/memory/page_table.rs
//
// Two-level (10/10/12-bit) x86 paging. Each `PageTable` owns one page
// directory; page tables are allocated lazily, one per directory
// entry, the first time a fault needs them. The directory's last
// entry (index 1023) is installed as a recursive self-mapping, as the
// wire format requires, but this implementation does not actually
// need to walk that recursive window to reach a PTE: every frame in
// this image lives in the identity-mapped `phys` arena, so a page
// table's contents are reachable directly through `phys::frame_ptr`.
// That keeps `handle_fault`/`free_page` ordinary safe-ish Rust instead
// of pointer-chasing through `0xFFFFF000`, while the bits a real CPU
// would read off this directory are exactly the standard x86 encoding.

use alloc::vec::Vec;
use spin::Mutex;

use crate::error::{KernelError, KernelResult};
use crate::memory::frame_pool::ContFramePool;
use crate::memory::phys;

const PRESENT: u32 = 1 << 0;
const READ_WRITE: u32 = 1 << 1;
const USER: u32 = 1 << 2;

const ENTRIES_PER_TABLE: u32 = 1024;
const RECURSIVE_SLOT: usize = 1023;

struct Config {
    kernel_pool: &'static ContFramePool,
    process_pool: &'static ContFramePool,
    shared_size: u32,
}

static CONFIG: Mutex<Option<Config>> = Mutex::new(None);

/// One-time, process-wide setup: which pool backs page-directory/
/// page-table frames, which pool backs demand-paged data frames, and
/// how much of the bottom of the address space is identity-mapped.
pub fn init(kernel_pool: &'static ContFramePool, process_pool: &'static ContFramePool, shared_size: u32) {
    *CONFIG.lock() = Some(Config { kernel_pool, process_pool, shared_size });
}

#[derive(Clone, Copy)]
struct VmWindow {
    base: u32,
    size: u32,
}

impl VmWindow {
    fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.base + self.size
    }
}

pub struct PageTable {
    directory_frame: u32,
    pools: Vec<VmWindow>,
}

impl PageTable {
    /// Allocate a directory and the page tables needed to identity-map
    /// the first `shared_size` bytes, with the recursive slot installed.
    pub fn new() -> KernelResult<PageTable> {
        let guard = CONFIG.lock();
        let cfg = guard.as_ref().expect("PageTable::init must run first");

        let directory_frame = cfg.kernel_pool.get_frames(1)?;
        unsafe { phys::zero_frame(directory_frame) };

        let mut table = PageTable { directory_frame, pools: Vec::new() };

        let identity_pages = cfg.shared_size.div_ceil(phys::FRAME_SIZE);
        let tables_needed = identity_pages.div_ceil(ENTRIES_PER_TABLE);

        for t in 0..tables_needed {
            let table_frame = cfg.kernel_pool.get_frames(1)?;
            unsafe { phys::zero_frame(table_frame) };

            let entries_here = core::cmp::min(ENTRIES_PER_TABLE, identity_pages - t * ENTRIES_PER_TABLE);
            for e in 0..entries_here {
                let page_no = t * ENTRIES_PER_TABLE + e;
                unsafe {
                    table.write_pte_raw(table_frame, e as usize, (page_no * phys::FRAME_SIZE) | PRESENT | READ_WRITE);
                }
            }
            unsafe {
                table.write_pde(t as usize, (table_frame * phys::FRAME_SIZE) | PRESENT | READ_WRITE);
            }
        }

        for i in tables_needed as usize..RECURSIVE_SLOT {
            unsafe { table.write_pde(i, READ_WRITE) };
        }
        unsafe {
            table.write_pde(RECURSIVE_SLOT, (directory_frame * phys::FRAME_SIZE) | PRESENT | READ_WRITE);
        }

        Ok(table)
    }

    fn directory_ptr(&self) -> *mut u32 {
        unsafe { phys::frame_ptr(self.directory_frame) as *mut u32 }
    }

    unsafe fn write_pde(&self, idx: usize, value: u32) {
        *self.directory_ptr().add(idx) = value;
    }

    fn read_pde(&self, idx: usize) -> u32 {
        unsafe { *self.directory_ptr().add(idx) }
    }

    unsafe fn write_pte_raw(&self, table_frame: u32, idx: usize, value: u32) {
        let ptr = phys::frame_ptr(table_frame) as *mut u32;
        *ptr.add(idx) = value;
    }

    fn read_pte_raw(&self, table_frame: u32, idx: usize) -> u32 {
        unsafe {
            let ptr = phys::frame_ptr(table_frame) as *mut u32;
            *ptr.add(idx)
        }
    }

    /// Install this directory in CR3. Physical and virtual address
    /// coincide for the identity-mapped region this struct lives in.
    pub fn load(&self) {
        unsafe { crate::arch::regs::load_cr3(self.directory_frame * phys::FRAME_SIZE) };
    }

    pub fn enable_paging(&self) {
        unsafe { crate::arch::regs::enable_paging_bit() };
    }

    /// Attach a VMPool's window so fault addresses inside it are
    /// considered legitimate. A table with no pools registered
    /// accepts any address — needed to bootstrap the kernel heap
    /// before any VMPool exists.
    pub fn register_pool(&mut self, base: u32, size: u32) {
        self.pools.push(VmWindow { base, size });
    }

    fn is_legitimate(&self, addr: u32) -> bool {
        self.pools.is_empty() || self.pools.iter().any(|w| w.contains(addr))
    }

    /// Resolve a page fault. `present` and `write` are decoded from
    /// the CPU's error code; `user` marks a fault from ring 3.
    pub fn handle_fault(&mut self, fault_addr: u32, present: bool, _write: bool, user: bool) -> KernelResult<()> {
        if present {
            // Present=1 means a protection violation, not a missing
            // mapping; this core does not support changing access
            // permissions on the fly.
            return Err(KernelError::Protocol);
        }
        if !self.is_legitimate(fault_addr) {
            return Err(KernelError::OutOfRange);
        }

        let guard = CONFIG.lock();
        let cfg = guard.as_ref().expect("PageTable::init must run first");

        let pdi = ((fault_addr >> 22) & 0x3FF) as usize;
        let pti = ((fault_addr >> 12) & 0x3FF) as usize;
        let flags = PRESENT | READ_WRITE | if user { USER } else { 0 };

        let pde = self.read_pde(pdi);
        let table_frame = if pde & PRESENT == 0 {
            let frame = cfg.kernel_pool.get_frames(1)?;
            unsafe {
                phys::zero_frame(frame);
                self.write_pde(pdi, (frame * phys::FRAME_SIZE) | flags);
            }
            frame
        } else {
            pde / phys::FRAME_SIZE
        };

        if self.read_pte_raw(table_frame, pti) & PRESENT != 0 {
            // Already mapped: a second fault here must not allocate.
            return Ok(());
        }

        let data_frame = cfg.process_pool.get_frames(1)?;
        unsafe {
            self.write_pte_raw(table_frame, pti, (data_frame * phys::FRAME_SIZE) | flags);
            crate::arch::regs::invlpg(fault_addr);
        }
        Ok(())
    }

    /// Release the data frame mapped at `virtual_page` back to the
    /// process pool and clear its PTE. A page that was reserved by a
    /// VMPool but never actually faulted in has no PDE/PTE to clear —
    /// that is a no-op, not an error, since the caller's region was
    /// still legitimately allocated.
    pub fn free_page(&mut self, virtual_page: u32) -> KernelResult<()> {
        let pdi = ((virtual_page >> 22) & 0x3FF) as usize;
        let pti = ((virtual_page >> 12) & 0x3FF) as usize;

        let pde = self.read_pde(pdi);
        if pde & PRESENT == 0 {
            return Ok(());
        }
        let table_frame = pde / phys::FRAME_SIZE;
        let pte = self.read_pte_raw(table_frame, pti);
        if pte & PRESENT == 0 {
            return Ok(());
        }

        let data_frame = pte / phys::FRAME_SIZE;
        ContFramePool::release_frames(data_frame)?;
        unsafe {
            self.write_pte_raw(table_frame, pti, pte & !PRESENT);
            crate::arch::regs::invlpg(virtual_page);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::frame_pool::ContFramePool;

    fn fresh_config() -> (&'static ContFramePool, &'static ContFramePool) {
        ContFramePool::reset_registry();
        let kernel_pool = ContFramePool::new(0, 512, 0).unwrap();
        let process_pool = ContFramePool::new(512, 512, 0).unwrap();
        init(kernel_pool, process_pool, 4 * 1024 * 1024);
        (kernel_pool, process_pool)
    }

    #[test]
    fn identity_region_is_present_after_construction() {
        fresh_config();
        let table = PageTable::new().unwrap();
        // 4 MiB / 4 KiB = 1024 identity pages, exactly one table.
        assert_ne!(table.read_pde(0) & PRESENT, 0);
        assert_eq!(table.read_pte_raw(table.read_pde(0) / phys::FRAME_SIZE, 0) & PRESENT, PRESENT);
    }

    #[test]
    fn recursive_slot_points_at_the_directory_itself() {
        fresh_config();
        let table = PageTable::new().unwrap();
        let recursive = table.read_pde(RECURSIVE_SLOT);
        assert_eq!(recursive / phys::FRAME_SIZE, table.directory_frame);
        assert_ne!(recursive & PRESENT, 0);
    }

    #[test]
    fn fault_outside_any_registered_pool_is_out_of_range() {
        fresh_config();
        let mut table = PageTable::new().unwrap();
        table.register_pool(0x1000_0000, 0x1000);
        let err = table.handle_fault(0x2000_0000, false, false, false).unwrap_err();
        assert!(matches!(err, KernelError::OutOfRange));
    }

    #[test]
    fn second_fault_at_mapped_address_does_not_allocate_again() {
        fresh_config();
        let mut table = PageTable::new().unwrap();
        table.handle_fault(0x0040_0000, false, false, false).unwrap();
        let pde_before = table.read_pde(1);
        table.handle_fault(0x0040_0000, false, false, false).unwrap();
        assert_eq!(table.read_pde(1), pde_before);
    }

    #[test]
    fn fault_allocates_a_pde_and_a_pte() {
        fresh_config();
        let mut table = PageTable::new().unwrap();
        assert_eq!(table.read_pde(1) & PRESENT, 0);
        table.handle_fault(0x0040_0000, false, false, false).unwrap();
        assert_ne!(table.read_pde(1) & PRESENT, 0);
        let table_frame = table.read_pde(1) / phys::FRAME_SIZE;
        assert_ne!(table.read_pte_raw(table_frame, 0) & PRESENT, 0);

        table.handle_fault(0x0040_1000, false, false, false).unwrap();
        assert_ne!(table.read_pte_raw(table_frame, 1) & PRESENT, 0);
    }

    #[test]
    fn present_fault_is_a_protocol_error() {
        fresh_config();
        let mut table = PageTable::new().unwrap();
        let err = table.handle_fault(0x0040_0000, true, false, false).unwrap_err();
        assert!(matches!(err, KernelError::Protocol));
    }
}
