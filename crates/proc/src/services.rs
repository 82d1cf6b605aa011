//! TEAM_452: Collaborator interfaces consumed by the lifecycle core.
//!
//! Address-space duplication and context switching are owned by the memory
//! and scheduler subsystems. The core only talks to them through these
//! traits, which keeps it testable on the host.

extern crate alloc;

use alloc::sync::Arc;

use crate::error::{AddressSpaceError, SpawnError};
use crate::process::Process;

/// Address-space management as seen by fork and exit.
pub trait AddressSpaceService: Send + Sync {
    /// A process's private address space. Owned by exactly one PCB.
    type Space: Send;

    /// Make a private copy of `source` for a new child.
    fn duplicate(&self, source: &Self::Space) -> Result<Self::Space, AddressSpaceError>;

    /// Stop using `space` as the active translation on this CPU.
    /// Called after the space has been detached from its PCB and before
    /// `destroy`.
    fn deactivate(&self, space: &Self::Space);

    /// Release every frame held by `space`. May suspend the caller.
    fn destroy(&self, space: Self::Space);
}

/// Saved register state that a forked child resumes from.
pub trait ForkFrame: Clone + Send {
    /// Set the value the resumed context sees as its syscall result.
    fn set_return(&mut self, value: usize);
}

/// Handle used to resume a context blocked in `suspend_current`.
pub trait Wake: Send + Sync {
    fn wake(&self);
}

/// A freshly forked process handed to the scheduler.
pub struct ForkedProcess<S, F> {
    pub process: Arc<Process<S>>,
    /// Duplicated parent frame with the return register already set to 0.
    pub frame: F,
}

/// Execution-context management as seen by the lifecycle core.
pub trait ExecutionService<S>: Send + Sync {
    type Frame: ForkFrame;

    /// Create a context that resumes `forked.frame` as `forked.process`.
    fn spawn(&self, forked: ForkedProcess<S, Self::Frame>) -> Result<(), SpawnError>;

    /// Waker for the calling context.
    fn current_waker(&self) -> Arc<dyn Wake>;

    /// Block the calling context until it is woken.
    ///
    /// A wake issued through a waker obtained by this context before the
    /// call must not be lost: if it already arrived, return immediately.
    /// Spurious returns are allowed, callers recheck their condition.
    fn suspend_current(&self);

    /// Remove the calling context from its process. Irreversible.
    fn detach_current(&self);

    /// Give up the CPU for good.
    fn exit_current(&self) -> !;
}
