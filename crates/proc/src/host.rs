//! TEAM_452: Host backends for the lifecycle services.
//!
//! Every process runs on its own std thread, address spaces are plain byte
//! vectors. Both services can be told to fail their next call so tests can
//! drive fork's unwind paths, and both keep counters for leak checks.

use std::format;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle, Thread};
use std::vec::Vec;

use spin::Mutex;

use crate::error::{AddressSpaceError, SpawnError};
use crate::lifecycle::Lifecycle;
use crate::process::Process;
use crate::services::{
    AddressSpaceService, ExecutionService, ForkFrame, ForkedProcess, Wake,
};

pub type HostProcess = Process<HostSpace>;
pub type HostLifecycle = Lifecycle<HostAddressSpaces, HostContexts>;

/// Code a forked host process runs: its own PCB and the return value it
/// resumed with.
pub type Program = Arc<dyn Fn(Arc<HostProcess>, usize) + Send + Sync>;

/// TEAM_452: Byte-vector address space.
#[derive(Debug, PartialEq, Eq)]
pub struct HostSpace {
    pub id: usize,
    pub bytes: Vec<u8>,
}

/// TEAM_452: Address-space service backed by the host heap.
#[derive(Default)]
pub struct HostAddressSpaces {
    next_id: AtomicUsize,
    live: AtomicUsize,
    fail_next: AtomicBool,
}

impl HostAddressSpaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a fresh space, e.g. for the init process.
    pub fn create(&self, bytes: Vec<u8>) -> HostSpace {
        self.live.fetch_add(1, Ordering::AcqRel);
        HostSpace {
            id: self.next_id.fetch_add(1, Ordering::AcqRel),
            bytes,
        }
    }

    /// Spaces created or duplicated and not yet destroyed.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Make the next `duplicate` report out-of-memory.
    pub fn fail_next_duplicate(&self) {
        self.fail_next.store(true, Ordering::Release);
    }
}

impl AddressSpaceService for HostAddressSpaces {
    type Space = HostSpace;

    fn duplicate(&self, source: &HostSpace) -> Result<HostSpace, AddressSpaceError> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(AddressSpaceError::OutOfMemory);
        }
        Ok(self.create(source.bytes.clone()))
    }

    fn deactivate(&self, _space: &HostSpace) {}

    fn destroy(&self, space: HostSpace) {
        self.live.fetch_sub(1, Ordering::AcqRel);
        drop(space);
    }
}

/// TEAM_452: Saved "registers" of a host process.
#[derive(Clone, Default)]
pub struct HostFrame {
    /// Syscall return register
    pub ret: usize,
    program: Option<Program>,
}

impl HostFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame whose forked copy runs `program` on a new thread.
    pub fn with_program<F>(program: F) -> Self
    where
        F: Fn(Arc<HostProcess>, usize) + Send + Sync + 'static,
    {
        Self {
            ret: usize::MAX,
            program: Some(Arc::new(program)),
        }
    }
}

impl ForkFrame for HostFrame {
    fn set_return(&mut self, value: usize) {
        self.ret = value;
    }
}

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(&self) {
        self.0.unpark();
    }
}

/// TEAM_452: Execution-context service: one std thread per process.
///
/// Suspension uses `thread::park`, whose wake token gives the no-lost-wakeup
/// guarantee `ExecutionService::suspend_current` asks for.
#[derive(Default)]
pub struct HostContexts {
    threads: Mutex<Vec<JoinHandle<()>>>,
    spawned: AtomicUsize,
    detached: AtomicUsize,
    fail_next: AtomicBool,
}

impl HostContexts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `spawn` fail.
    pub fn fail_next_spawn(&self) {
        self.fail_next.store(true, Ordering::Release);
    }

    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::Acquire)
    }

    pub fn detached(&self) -> usize {
        self.detached.load(Ordering::Acquire)
    }

    /// Join every process thread, including ones spawned while joining.
    /// Returns false if any of them panicked.
    ///
    /// Threads that went through `exit_current` never finish, so programs
    /// meant to be joined should end with `terminate` and return.
    pub fn join_all(&self) -> bool {
        let mut ok = true;
        loop {
            let batch = core::mem::take(&mut *self.threads.lock());
            if batch.is_empty() {
                return ok;
            }
            for handle in batch {
                ok &= handle.join().is_ok();
            }
        }
    }
}

impl ExecutionService<HostSpace> for HostContexts {
    type Frame = HostFrame;

    fn spawn(&self, forked: ForkedProcess<HostSpace, HostFrame>) -> Result<(), SpawnError> {
        if self.fail_next.swap(false, Ordering::AcqRel) {
            return Err(SpawnError::OutOfContexts);
        }

        let ForkedProcess { process, frame } = forked;
        let name = format!("pid-{}", process.id());
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || {
                if let Some(program) = frame.program {
                    program(process, frame.ret);
                }
            })
            .map_err(|e| {
                log::warn!("[HOST] thread spawn failed: {}", e);
                SpawnError::OutOfContexts
            })?;

        self.spawned.fetch_add(1, Ordering::AcqRel);
        self.threads.lock().push(handle);
        Ok(())
    }

    fn current_waker(&self) -> Arc<dyn Wake> {
        Arc::new(ThreadWaker(thread::current()))
    }

    fn suspend_current(&self) {
        thread::park();
    }

    fn detach_current(&self) {
        self.detached.fetch_add(1, Ordering::AcqRel);
    }

    fn exit_current(&self) -> ! {
        loop {
            thread::park();
        }
    }
}

/// TEAM_452: Lifecycle wired to the host backends.
pub fn host_lifecycle(config: crate::LifecycleConfig) -> Arc<HostLifecycle> {
    Arc::new(Lifecycle::with_config(
        HostAddressSpaces::new(),
        HostContexts::new(),
        config,
    ))
}

