//! TEAM_452: Process Control Block.
//!
//! Each PCB has its own lock guarding its outcome, parent link, child list,
//! and pending waiter. The address space sits behind a separate lock since
//! only the owning process touches it.
//!
//! No path holds two PCB locks at once, and nothing holds a PCB lock across
//! a suspension point. The parent link only goes from `Some` to `None` under
//! the child's own lock, which is what lets exit decide between zombie and
//! self-destroy without looking at the parent.

extern crate alloc;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use spin::Mutex;

use crate::pid::Pid;
use crate::services::Wake;

/// TEAM_452: Terminal state of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Running,
    Exited(i32),
}

impl ExitOutcome {
    pub const fn is_exited(self) -> bool {
        matches!(self, ExitOutcome::Exited(_))
    }
}

/// State guarded by the PCB lock.
pub(crate) struct ProcessState<S> {
    pub(crate) outcome: ExitOutcome,
    /// Non-owning link. Cleared when the parent exits first, never re-pointed.
    pub(crate) parent: Option<Pid>,
    pub(crate) children: Vec<Arc<Process<S>>>,
    /// Parent context blocked in waitpid on this process.
    pub(crate) waiter: Option<Arc<dyn Wake>>,
}

/// TEAM_452: Process Control Block (PCB).
pub struct Process<S> {
    id: Pid,
    name: String,
    pub(crate) state: Mutex<ProcessState<S>>,
    address_space: Mutex<Option<S>>,
}

impl<S> Process<S> {
    pub(crate) fn new(id: Pid, name: &str, parent: Option<Pid>, space: S) -> Self {
        Self {
            id,
            name: String::from(name),
            state: Mutex::new(ProcessState {
                outcome: ExitOutcome::Running,
                parent,
                children: Vec::new(),
                waiter: None,
            }),
            address_space: Mutex::new(Some(space)),
        }
    }

    /// Immutable after creation, no locking needed.
    pub fn id(&self) -> Pid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn outcome(&self) -> ExitOutcome {
        self.state.lock().outcome
    }

    /// Parent PID, or None for the root process and orphans.
    pub fn parent(&self) -> Option<Pid> {
        self.state.lock().parent
    }

    /// Snapshot of unreaped child PIDs in creation order.
    pub fn children(&self) -> Vec<Pid> {
        self.state.lock().children.iter().map(|c| c.id).collect()
    }

    pub fn has_child(&self, pid: Pid) -> bool {
        self.state.lock().children.iter().any(|c| c.id == pid)
    }

    pub fn has_address_space(&self) -> bool {
        self.address_space.lock().is_some()
    }

    /// Run `f` against the address space, if it hasn't been torn down.
    pub fn with_address_space<R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.address_space.lock().as_ref().map(f)
    }

    pub(crate) fn take_address_space(&self) -> Option<S> {
        self.address_space.lock().take()
    }

    pub(crate) fn add_child(&self, child: Arc<Process<S>>) {
        self.state.lock().children.push(child);
    }

    /// Remove `pid` from the child list. Whoever gets `Some` back owns the
    /// reap, so two callers can never claim the same child.
    pub(crate) fn take_child(&self, pid: Pid) -> Option<Arc<Process<S>>> {
        let mut state = self.state.lock();
        let pos = state.children.iter().position(|c| c.id == pid)?;
        Some(state.children.remove(pos))
    }

    pub(crate) fn take_children(&self) -> Vec<Arc<Process<S>>> {
        core::mem::take(&mut self.state.lock().children)
    }
}

impl<S> core::fmt::Debug for Process<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
