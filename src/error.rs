//! Error taxonomy shared by every core subsystem.
//!
//! `AllocationExhausted` and `Duplicate` are conditions a caller can
//! reasonably react to, so they come back as `Err`. `InvalidReference`,
//! `OutOfRange`, and `Protocol` mark an invariant the caller already
//! should have upheld (a bad frame number, a fault the page table
//! can't resolve, a disk that never comes ready) — those still
//! propagate as `Err` from here, but the few call sites with no
//! recourse (the page-fault vector, boot) turn them into a `panic!`.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// No frame, no free block, no free inode, or no contiguous run large
    /// enough to satisfy the request.
    AllocationExhausted,
    /// A frame number, region base, or file id did not resolve to a known
    /// object, or a release was attempted on a frame that is not a
    /// head-of-sequence.
    InvalidReference,
    /// An address fell outside a VMPool's window, or an inaccessibility
    /// range fell outside its frame pool.
    OutOfRange,
    /// A present-bit page fault (permission violation), a disk controller
    /// error, or a timeout.
    Protocol,
    /// `CreateFile` was called with an id that already exists.
    Duplicate,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::AllocationExhausted => "allocation exhausted",
            KernelError::InvalidReference => "invalid reference",
            KernelError::OutOfRange => "out of range",
            KernelError::Protocol => "protocol error",
            KernelError::Duplicate => "duplicate",
        };
        f.write_str(msg)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
