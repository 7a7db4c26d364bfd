// src/heap.rs
//
// Kernel heap bootstrap. Everything above the arch layer leans on
// `alloc` (`Vec`, `Box`, `VecDeque`) for ready queues, VMPool region
// lists, and file-system tables, so a `#[global_allocator]` has to be
// live before any of that runs. `linked_list_allocator` is a small,
// dependency-light free-list allocator; a buddy allocator tied to a
// 4-level, physical-offset-mapped layout doesn't apply to this
// kernel's flat identity-mapped arena, so a plain free list over one
// fixed-size static region is enough.

use linked_list_allocator::LockedHeap;

pub const HEAP_SIZE: usize = 1024 * 1024; // 1 MiB

#[repr(align(4096))]
struct HeapArena([u8; HEAP_SIZE]);

static mut HEAP_ARENA: HeapArena = HeapArena([0; HEAP_SIZE]);

#[cfg_attr(not(test), global_allocator)]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Hand the arena to the allocator. Must run once, before the first
/// `alloc`/`Box`/`Vec` use.
pub fn init() {
    unsafe {
        let base = core::ptr::addr_of_mut!(HEAP_ARENA) as *mut u8;
        ALLOCATOR.lock().init(base, HEAP_SIZE);
    }
}
