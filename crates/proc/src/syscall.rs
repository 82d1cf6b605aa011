//! TEAM_452: Lifecycle syscalls in the kernel's Linux-ABI return convention.
//!
//! Each `sys_*` returns the syscall result register: a non-negative value on
//! success, a negative errno on failure.

use linux_raw_sys::errno::EINVAL;

use crate::lifecycle::{Lifecycle, ProcessRef};
use crate::pid::Pid;
use crate::services::{AddressSpaceService, ExecutionService};
use crate::wait_status::StatusOut;

/// TEAM_452: sys_fork - child PID to the parent, negative errno on failure.
/// The child itself sees 0 through its resumed frame.
pub fn sys_fork<A, E>(lc: &Lifecycle<A, E>, caller: &ProcessRef<A>, frame: &E::Frame) -> i64
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    #[cfg(feature = "verbose-syscalls")]
    log::trace!("[SYSCALL] fork() from PID={}", caller.id());

    match lc.fork(caller, frame) {
        Ok(pid) => pid.as_usize() as i64,
        Err(e) => e.to_errno(),
    }
}

/// TEAM_452: sys_exit - terminate the caller. Never returns.
pub fn sys_exit<A, E>(lc: &Lifecycle<A, E>, caller: &ProcessRef<A>, code: i32) -> !
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    #[cfg(feature = "verbose-syscalls")]
    log::trace!("[SYSCALL] exit({}) from PID={}", code, caller.id());

    lc.exit(caller, code)
}

/// TEAM_452: sys_getpid - caller's PID.
pub fn sys_getpid<A, E>(lc: &Lifecycle<A, E>, caller: &ProcessRef<A>) -> i64
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    lc.getpid(caller).as_usize() as i64
}

/// TEAM_452: sys_getppid - parent PID, 0 for the root process and orphans.
pub fn sys_getppid<A, E>(lc: &Lifecycle<A, E>, caller: &ProcessRef<A>) -> i64
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
{
    lc.getppid(caller).map_or(0, |pid| pid.as_usize() as i64)
}

/// TEAM_452: sys_waitpid - wait for a specific child.
///
/// `pid <= 0` (any child, process groups) is not supported and returns
/// EINVAL.
pub fn sys_waitpid<A, E, O>(
    lc: &Lifecycle<A, E>,
    caller: &ProcessRef<A>,
    pid: i32,
    status: &mut O,
    options: u32,
) -> i64
where
    A: AddressSpaceService,
    E: ExecutionService<A::Space>,
    O: StatusOut + ?Sized,
{
    #[cfg(feature = "verbose-syscalls")]
    log::trace!(
        "[SYSCALL] waitpid({}, options=0x{:x}) from PID={}",
        pid,
        options,
        caller.id()
    );

    if pid <= 0 {
        return -(EINVAL as i64);
    }

    match lc.wait(caller, Pid(pid as usize), status, options) {
        Ok(pid) => pid.as_usize() as i64,
        Err(e) => e.to_errno(),
    }
}
