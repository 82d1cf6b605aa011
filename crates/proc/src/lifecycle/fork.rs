//! TEAM_452: fork - duplicate the calling process.

extern crate alloc;

use alloc::sync::Arc;

use super::{Lifecycle, ProcessRef};
use crate::error::ProcError;
use crate::pid::Pid;
use crate::process::Process;
use crate::services::{AddressSpaceService, ExecutionService, ForkFrame, ForkedProcess};

impl<A, E> Lifecycle<A, E>
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    /// TEAM_452: fork - create a copy of `caller` resuming from `frame`.
    ///
    /// The parent gets the child's PID back; the child resumes from a copy of
    /// `frame` whose return register is 0. On failure every partial effect is
    /// undone: no PCB stays reachable and no address space leaks.
    ///
    /// # Errors
    /// * `ResourceExhausted` - PIDs ran out, or the address-space copy or the
    ///   context spawn failed
    /// * `InvalidArgument` - `caller` has no address space, which only
    ///   happens once it is inside exit
    pub fn fork(&self, caller: &ProcessRef<A>, frame: &E::Frame) -> Result<Pid, ProcError> {
        let pid = self.pids.allocate().ok_or_else(|| {
            log::warn!("[PROC] fork: PID space exhausted (parent PID={})", caller.id());
            ProcError::ResourceExhausted
        })?;

        // 1. Copy the parent's address space
        let space = match caller.with_address_space(|src| self.spaces.duplicate(src)) {
            Some(Ok(space)) => space,
            Some(Err(e)) => {
                log::warn!("[PROC] fork: could not copy parent address space: {}", e);
                return Err(e.into());
            }
            None => {
                // Only an exiting process has no address space
                log::warn!("[PROC] fork: PID={} has no address space", caller.id());
                return Err(ProcError::InvalidArgument);
            }
        };

        // 2. Publish the child: registry + parent's child list
        let child = Arc::new(Process::new(
            pid,
            self.config.child_name,
            Some(caller.id()),
            space,
        ));
        self.registry.insert(child.clone());
        caller.add_child(child.clone());

        // 3. Child resumes from a copy of the parent's frame, seeing 0
        let mut child_frame = frame.clone();
        child_frame.set_return(0);

        let forked = ForkedProcess {
            process: child.clone(),
            frame: child_frame,
        };
        if let Err(e) = self.contexts.spawn(forked) {
            log::warn!("[PROC] fork: could not spawn context for PID={}: {}", pid, e);
            self.unwind_fork(caller, &child);
            return Err(e.into());
        }

        log::trace!(
            "[PROC] fork: created PID={} for parent PID={}",
            pid,
            caller.id()
        );
        Ok(pid)
    }

    /// Undo a fork whose context never started.
    fn unwind_fork(&self, caller: &ProcessRef<A>, child: &ProcessRef<A>) {
        let pid = child.id();
        // The child never ran, so nobody else can have claimed it
        if caller.take_child(pid).is_none() {
            log::warn!("[PROC] fork: PID={} missing from parent's children", pid);
        }
        if self.registry.remove(pid).is_none() {
            log::warn!("[PROC] fork: PID={} was not registered", pid);
        }
        if let Some(space) = child.take_address_space() {
            self.spaces.destroy(space);
        }
        log::debug!("[PROC] fork: unwound PID={}", pid);
    }
}
