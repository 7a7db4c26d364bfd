//! Stand-in physical memory arena.
//!
//! The bootstrap (out of scope here) hands the core a memory map and
//! an identity mapping over some low region of RAM. What the core
//! actually needs from that handoff is just: a block of RAM, known in
//! size, whose frame numbers translate to real, dereferenceable
//! addresses. We model that with a static, page-aligned arena rather
//! than reaching into whatever the bootloader happened to report —
//! the frame pools and page table below only ever address memory
//! through `frame_addr`/`frame_ptr`, so swapping this module out for
//! a real memory-map walk is a localized change.
//!
//! This also has to stay safe to exercise on the host: `cargo test`
//! never maps real physical memory, so every frame the tests touch
//! has to live inside ordinary process memory. A static array gives
//! us that for free on both targets.

pub const FRAME_SIZE: u32 = 4096;
pub const FRAME_COUNT: u32 = 4096; // 16 MiB addressable by this image

#[repr(align(4096))]
struct Arena([u8; (FRAME_SIZE as usize) * (FRAME_COUNT as usize)]);

static mut ARENA: Arena = Arena([0; (FRAME_SIZE as usize) * (FRAME_COUNT as usize)]);

fn arena_base() -> u32 {
    core::ptr::addr_of!(ARENA) as u32
}

/// Address of the start of the given frame.
pub fn frame_addr(frame_no: u32) -> u32 {
    arena_base() + frame_no * FRAME_SIZE
}

/// Raw pointer to the start of the given frame. Caller must keep
/// `frame_no` within `FRAME_COUNT` and respect the owning pool's
/// bookkeeping; this module does no bounds checking of its own.
pub unsafe fn frame_ptr(frame_no: u32) -> *mut u8 {
    frame_addr(frame_no) as *mut u8
}

/// Zero an entire frame.
pub unsafe fn zero_frame(frame_no: u32) {
    core::ptr::write_bytes(frame_ptr(frame_no), 0, FRAME_SIZE as usize);
}
