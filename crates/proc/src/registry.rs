//! TEAM_452: Registry of live processes.
//!
//! Maps PIDs to PCBs for identity queries and parent lookups. The registry
//! holds one owning reference per live process but does not decide when a
//! process dies: fork, exit and waitpid do that and then call `remove`.

extern crate alloc;

use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::HashMap;
use spin::Mutex;

use crate::pid::Pid;
use crate::process::Process;

/// TEAM_452: Table of live PCBs keyed by PID.
pub struct ProcessRegistry<S> {
    table: Mutex<HashMap<Pid, Arc<Process<S>>>>,
}

impl<S> ProcessRegistry<S> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// [RG1] A PID is registered at most once.
    pub(crate) fn insert(&self, process: Arc<Process<S>>) {
        let pid = process.id();
        let previous = self.table.lock().insert(pid, process);
        debug_assert!(previous.is_none(), "pid {pid} registered twice");
    }

    /// [RG2] Removing drops the registry's reference.
    pub(crate) fn remove(&self, pid: Pid) -> Option<Arc<Process<S>>> {
        self.table.lock().remove(&pid)
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<Process<S>>> {
        self.table.lock().get(&pid).cloned()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.table.lock().contains_key(&pid)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    /// Live PIDs in ascending order.
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.table.lock().keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

impl<S> Default for ProcessRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
