//! TEAM_452: waitpid - block until a specific child exits, then reap it.

use super::{Lifecycle, ProcessRef};
use crate::error::ProcError;
use crate::pid::Pid;
use crate::process::ExitOutcome;
use crate::services::{AddressSpaceService, ExecutionService};
use crate::wait_status::{StatusOut, WaitOptions, WaitStatus};

impl<A, E> Lifecycle<A, E>
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    /// TEAM_452: waitpid - wait for child `target` to exit.
    ///
    /// Writes the encoded status to `status` and returns `target`.
    ///
    /// # Errors
    /// * `NoSuchChild` - `target` is the caller, was never its child, or was
    ///   already reaped
    /// * `InvalidOutputLocation` - `status` can't be written (checked before
    ///   blocking)
    /// * `InvalidArgument` - any option bit is set
    pub fn wait<O>(
        &self,
        caller: &ProcessRef<A>,
        target: Pid,
        status: &mut O,
        options: u32,
    ) -> Result<Pid, ProcError>
    where
        O: StatusOut + ?Sized,
    {
        if target == caller.id() {
            return Err(ProcError::NoSuchChild);
        }
        if !status.is_writable() {
            return Err(ProcError::InvalidOutputLocation);
        }
        WaitOptions::validate(options)?;

        // Removing the child from our list is the reap claim. Any later
        // waitpid on the same PID fails here, and an exit of the caller no
        // longer sees this child.
        let child = caller.take_child(target).ok_or(ProcError::NoSuchChild)?;

        let code = loop {
            let mut state = child.state.lock();
            if let ExitOutcome::Exited(code) = state.outcome {
                break code;
            }
            state.waiter = Some(self.contexts.current_waker());
            drop(state);

            log::trace!(
                "[PROC] waitpid: PID={} blocking on PID={}",
                caller.id(),
                target
            );
            self.contexts.suspend_current();
        };

        let encoded = WaitStatus::exited(code);
        self.destroy(&child);
        log::trace!(
            "[PROC] waitpid: PID={} reaped PID={} ({:?})",
            caller.id(),
            target,
            encoded
        );

        status.write(encoded)?;
        Ok(target)
    }
}
