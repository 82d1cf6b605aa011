//! TEAM_452: Process identifiers and their allocator.

use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// TEAM_452: Unique identifier for a process.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pid(pub usize);

impl Pid {
    /// PID 0 is reserved for the kernel/idle context and never handed out.
    pub const KERNEL: Pid = Pid(0);

    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// TEAM_452: Monotonic PID allocator.
///
/// Identifiers are never recycled, so a PID can't be confused with an
/// earlier process that happened to hold it. Once `limit` is passed every
/// allocation fails.
pub struct PidAllocator {
    next: AtomicUsize,
    limit: usize,
}

impl PidAllocator {
    /// [PA1] First allocation returns `first`, [PA3] nothing above `limit` is returned
    pub const fn new(first: usize, limit: usize) -> Self {
        Self {
            next: AtomicUsize::new(first),
            limit,
        }
    }

    /// [PA2] Each call returns a distinct, increasing PID.
    /// [PA3] Returns None once the range is exhausted.
    pub fn allocate(&self) -> Option<Pid> {
        // fetch_update so an exhausted allocator stays pinned instead of wrapping
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                if next <= self.limit { next.checked_add(1) } else { None }
            })
            .ok()
            .map(Pid)
    }

    /// Number of PIDs still available.
    pub fn remaining(&self) -> usize {
        let next = self.next.load(Ordering::Acquire);
        self.limit.saturating_add(1).saturating_sub(next)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
