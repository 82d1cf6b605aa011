//! TEAM_452: Process lifecycle: fork, exit, waitpid, getpid.
//!
//! `Lifecycle` is the service object every lifecycle syscall goes through.
//! It owns the registry and the PID allocator and borrows the memory and
//! scheduler subsystems through the `services` traits.
//!
//! Ownership of a PCB is shared by the registry and the parent's child list,
//! or by the registry and a waitpid that has claimed it. A PCB is destroyed
//! exactly once, when it has exited and nobody can wait on it any more:
//! - waitpid reaps it, or
//! - its parent exits while it is a zombie, or
//! - it exits after being orphaned, or as the root process.

mod exit;
mod fork;
mod wait;

extern crate alloc;

use alloc::sync::Arc;

use crate::config::LifecycleConfig;
use crate::error::ProcError;
use crate::pid::{Pid, PidAllocator};
use crate::process::Process;
use crate::registry::ProcessRegistry;
use crate::services::{AddressSpaceService, ExecutionService};

/// Shorthand for the PCB type a lifecycle instance manages.
pub type ProcessRef<A> = Arc<Process<<A as AddressSpaceService>::Space>>;

/// TEAM_452: Process lifecycle service.
pub struct Lifecycle<A, E>
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    registry: ProcessRegistry<A::Space>,
    pids: PidAllocator,
    spaces: A,
    contexts: E,
    config: LifecycleConfig,
}

impl<A, E> Lifecycle<A, E>
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    pub fn new(spaces: A, contexts: E) -> Self {
        Self::with_config(spaces, contexts, LifecycleConfig::default())
    }

    pub fn with_config(spaces: A, contexts: E, config: LifecycleConfig) -> Self {
        Self {
            registry: ProcessRegistry::new(),
            pids: PidAllocator::new(config.first_pid, config.max_pid),
            spaces,
            contexts,
            config,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry<A::Space> {
        &self.registry
    }

    pub fn spaces(&self) -> &A {
        &self.spaces
    }

    pub fn contexts(&self) -> &E {
        &self.contexts
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// TEAM_452: Register a parentless root process owning `space`.
    ///
    /// Used once at boot for the first user process. Nobody can wait on it,
    /// so it is destroyed as soon as it exits.
    pub fn spawn_init(&self, name: &str, space: A::Space) -> Result<ProcessRef<A>, ProcError> {
        let pid = self.pids.allocate().ok_or_else(|| {
            log::warn!("[PROC] spawn_init: PID space exhausted");
            ProcError::ResourceExhausted
        })?;
        let process = Arc::new(Process::new(pid, name, None, space));
        self.registry.insert(process.clone());
        log::trace!("[PROC] spawn_init: '{}' is PID={}", name, pid);
        Ok(process)
    }

    /// TEAM_452: getpid - the caller's own PID. Never fails.
    pub fn getpid(&self, caller: &ProcessRef<A>) -> Pid {
        caller.id()
    }

    /// TEAM_452: getppid - the caller's parent, None once orphaned.
    pub fn getppid(&self, caller: &ProcessRef<A>) -> Option<Pid> {
        caller.parent()
    }

    /// Drop a terminated PCB from the registry. The caller must already have
    /// unlinked it from any child list.
    fn destroy(&self, process: &ProcessRef<A>) {
        debug_assert!(process.outcome().is_exited(), "destroying live PID {}", process.id());
        if self.registry.remove(process.id()).is_none() {
            log::warn!("[PROC] destroy: PID={} was not registered", process.id());
        }
        // Only set if the process never ran its own exit path
        if let Some(space) = process.take_address_space() {
            self.spaces.destroy(space);
        }
        log::debug!("[PROC] destroyed PID={}", process.id());
    }
}
