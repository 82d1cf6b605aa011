#![cfg_attr(not(feature = "std"), no_std)]

//! TEAM_452: Process lifecycle subsystem.
//!
//! Creating processes by duplicating the caller (fork), terminating them and
//! recording how they ended (exit), and letting a parent block until a given
//! child has ended and collect its status (waitpid).
//!
//! Address-space copying and context switching are reached through the
//! traits in [`services`]; the `std` feature provides host implementations
//! in [`host`] that run every process on its own thread.
//!
//! ## Known limitations
//!
//! - Orphans are not re-parented. An orphan that never exits is never
//!   reclaimed; one that does exit destroys itself.
//! - waitpid has no timeout and can't be cancelled.

extern crate alloc;

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod pid;
pub mod process;
pub mod registry;
pub mod services;
pub mod syscall;
pub mod wait_status;

#[cfg(feature = "std")]
pub mod host;

pub use config::LifecycleConfig;
pub use error::{AddressSpaceError, ProcError, SpawnError};
pub use lifecycle::{Lifecycle, ProcessRef};
pub use pid::{Pid, PidAllocator};
pub use process::{ExitOutcome, Process};
pub use registry::ProcessRegistry;
pub use services::{AddressSpaceService, ExecutionService, ForkFrame, ForkedProcess, Wake};
pub use wait_status::{StatusOut, WaitOptions, WaitStatus};
