//! TEAM_452: Error types for the process lifecycle subsystem.

use linux_raw_sys::errno::{ECHILD, EFAULT, EINVAL, ENOMEM};
use los_error::define_kernel_error;

define_kernel_error! {
    /// Errors reported by fork and waitpid.
    pub enum ProcError(0x0C) {
        /// PID range, address space copy, or context spawn ran out
        ResourceExhausted = 0x01 => "Out of process resources" [errno = ENOMEM],
        /// Unsupported wait options or malformed request
        InvalidArgument = 0x02 => "Invalid argument" [errno = EINVAL],
        /// Exit status destination can't be written
        InvalidOutputLocation = 0x03 => "Bad status address" [errno = EFAULT],
        /// Target is not a live, unreaped child of the caller
        NoSuchChild = 0x04 => "No such child process" [errno = ECHILD],
    }
}

impl ProcError {
    /// Negative errno for the syscall return register.
    pub const fn to_errno(self) -> i64 {
        match self.errno() {
            Some(e) => -(e as i64),
            None => -(EINVAL as i64),
        }
    }
}

define_kernel_error! {
    /// Failures reported by an address-space service.
    pub enum AddressSpaceError(0x0D) {
        OutOfMemory = 0x01 => "Address space copy ran out of memory",
    }
}

define_kernel_error! {
    /// Failures reported by an execution-context service.
    pub enum SpawnError(0x0E) {
        OutOfContexts = 0x01 => "No execution context available",
    }
}

impl From<AddressSpaceError> for ProcError {
    fn from(_: AddressSpaceError) -> Self {
        ProcError::ResourceExhausted
    }
}

impl From<SpawnError> for ProcError {
    fn from(_: SpawnError) -> Self {
        ProcError::ResourceExhausted
    }
}
