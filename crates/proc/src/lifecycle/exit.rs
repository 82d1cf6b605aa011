//! TEAM_452: exit - terminate the calling process.

use super::{Lifecycle, ProcessRef};
use crate::process::ExitOutcome;
use crate::services::{AddressSpaceService, ExecutionService};

impl<A, E> Lifecycle<A, E>
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    /// TEAM_452: exit - terminate `caller` with `code` and give up the CPU.
    pub fn exit(&self, caller: &ProcessRef<A>, code: i32) -> ! {
        self.terminate(caller, code);
        self.contexts.exit_current()
    }

    /// TEAM_452: Everything `exit` does short of leaving the CPU.
    ///
    /// Must be called from the context that runs `caller`, once. Afterwards
    /// `caller` is either a zombie waiting for its parent or already gone
    /// from the registry.
    pub fn terminate(&self, caller: &ProcessRef<A>, code: i32) {
        log::trace!("[PROC] exit: PID={} code={}", caller.id(), code);
        debug_assert!(!caller.outcome().is_exited(), "PID {} exited twice", caller.id());

        // 1. Tear down the address space before touching the PCB. destroy()
        //    may suspend us and nothing may resume into a half-freed space.
        if let Some(space) = caller.take_address_space() {
            self.spaces.deactivate(&space);
            self.spaces.destroy(space);
        }

        // 2. Reconcile children: reclaim zombies, orphan the rest
        for child in caller.take_children() {
            let mut state = child.state.lock();
            if state.outcome.is_exited() {
                drop(state);
                log::debug!(
                    "[PROC] exit: PID={} reclaiming unreaped child PID={}",
                    caller.id(),
                    child.id()
                );
                self.destroy(&child);
            } else {
                state.parent = None;
                drop(state);
                log::debug!("[PROC] exit: orphaned PID={}", child.id());
            }
        }

        // 3. Leave the scheduler
        self.contexts.detach_current();

        // 4. Become a zombie if someone still owns our reap. The parent link
        //    is only cleared by the parent's exit (step 2) under our lock, so
        //    while it is set we are either in the parent's child list, where
        //    waitpid or the parent's exit will find us, or already claimed by
        //    an in-flight waitpid that is blocked on us.
        let mut state = caller.state.lock();
        let reapable = state.parent.is_some();
        state.outcome = ExitOutcome::Exited(code);

        if reapable {
            let waiter = state.waiter.take();
            drop(state);
            log::trace!("[PROC] exit: PID={} is a zombie", caller.id());
            if let Some(waiter) = waiter {
                waiter.wake();
            }
        } else {
            drop(state);
            log::trace!("[PROC] exit: PID={} has no parent, destroying", caller.id());
            self.destroy(caller);
        }
    }
}
