//! TEAM_452: Lifecycle scenarios run against the host backends.
//!
//! The main thread plays init. Every scenario ends the same way: all process
//! threads are joined, only init may be left in the registry with only its
//! own address space live, and once init terminates both must be empty.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use anyhow::{Context, Result, bail};
use los_proc::host::{HostFrame, HostLifecycle, HostProcess, host_lifecycle};
use los_proc::{LifecycleConfig, Pid, WaitStatus};

/// Init's address-space contents, copied into every forked child.
const INIT_IMAGE: [u8; 64] = [0xA5; 64];

pub struct Report {
    scenario: &'static str,
    forked: usize,
    reaped: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: forked {}, reaped {}, no leaks",
            self.scenario, self.forked, self.reaped
        )
    }
}

struct Sim {
    lc: Arc<HostLifecycle>,
    reaped: AtomicUsize,
    failures: AtomicUsize,
}

impl Sim {
    fn new(config: LifecycleConfig) -> Arc<Self> {
        Arc::new(Self {
            lc: host_lifecycle(config),
            reaped: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        })
    }

    fn boot(&self) -> Result<Arc<HostProcess>> {
        let space = self.lc.spaces().create(INIT_IMAGE.to_vec());
        self.lc.spawn_init("init", space).context("failed to start init")
    }

    fn fail(&self, what: impl fmt::Display) {
        log::error!("[SIM] {}", what);
        self.failures.fetch_add(1, Ordering::AcqRel);
    }

    /// A forked child resumes with 0 in its return register.
    fn check_resumed(&self, me: &HostProcess, ret: usize) {
        if ret != 0 {
            self.fail(format!("PID={} resumed from fork with {}", me.id(), ret));
        }
        match me.with_address_space(|space| space.bytes == INIT_IMAGE) {
            Some(true) => {}
            _ => self.fail(format!("PID={} did not inherit init's image", me.id())),
        }
    }

    fn reap(&self, parent: &Arc<HostProcess>, pid: Pid, expected: i32) {
        let mut raw = 0;
        match self.lc.wait(parent, pid, &mut Some(&mut raw), 0) {
            Ok(_) => {
                self.reaped.fetch_add(1, Ordering::AcqRel);
                let status = WaitStatus::from_raw(raw);
                if status.exit_code() != Some(expected & 0xff) {
                    self.fail(format!("PID={} reported {:?}, expected {}", pid, status, expected));
                }
            }
            Err(e) => self.fail(format!("PID={} waitpid({}) failed: {}", parent.id(), pid, e)),
        }
    }

    fn finish(&self, scenario: &'static str, init: &Arc<HostProcess>) -> Result<Report> {
        if !self.lc.contexts().join_all() {
            bail!("{scenario}: a process thread panicked");
        }
        let failures = self.failures.load(Ordering::Acquire);
        if failures > 0 {
            bail!("{scenario}: {failures} check(s) failed");
        }

        let left = self.lc.registry().pids();
        if left != [init.id()] {
            bail!("{scenario}: leaked PCBs {:?}", left);
        }
        if self.lc.spaces().live() != 1 {
            bail!(
                "{scenario}: {} address spaces live, expected only init's",
                self.lc.spaces().live()
            );
        }

        self.lc.terminate(init, 0);
        if !self.lc.registry().is_empty() || self.lc.spaces().live() != 0 {
            bail!("{scenario}: init was not destroyed on exit");
        }

        Ok(Report {
            scenario,
            forked: self.lc.contexts().spawned(),
            reaped: self.reaped.load(Ordering::Acquire),
        })
    }
}

// ============================================================================
// tree
// ============================================================================

/// Fork `width` children, each growing its own subtree `depth - 1` deep, and
/// reap them in fork order.
fn fork_level(sim: &Arc<Sim>, me: &Arc<HostProcess>, width: usize, depth: usize, code: i32) {
    if depth == 0 {
        return;
    }
    let mut children = Vec::with_capacity(width);
    for _ in 0..width {
        match sim.lc.fork(me, &tree_node(sim.clone(), width, depth - 1, code)) {
            Ok(pid) => children.push(pid),
            Err(e) => sim.fail(format!("PID={} fork failed: {}", me.id(), e)),
        }
    }
    for pid in children {
        sim.reap(me, pid, code);
    }
}

fn tree_node(sim: Arc<Sim>, width: usize, depth: usize, code: i32) -> HostFrame {
    HostFrame::with_program(move |me, ret| {
        sim.check_resumed(&me, ret);
        fork_level(&sim, &me, width, depth, code);
        sim.lc.terminate(&me, code);
    })
}

pub fn tree(config: LifecycleConfig, width: usize, depth: usize, code: i32) -> Result<Report> {
    let sim = Sim::new(config);
    let init = sim.boot()?;
    log::info!("[SIM] tree: width={} depth={}", width, depth);

    fork_level(&sim, &init, width, depth, code);

    let expected = (1..=depth)
        .map(|level| width.saturating_pow(level as u32))
        .fold(0usize, usize::saturating_add);
    let reaped = sim.reaped.load(Ordering::Acquire);
    if reaped != expected {
        sim.fail(format!("reaped {} processes, expected {}", reaped, expected));
    }
    sim.finish("tree", &init)
}

// ============================================================================
// orphans
// ============================================================================

pub fn orphans(config: LifecycleConfig, count: usize) -> Result<Report> {
    let sim = Sim::new(config);
    let init = sim.boot()?;
    let release = Arc::new(Barrier::new(count + 1));

    let parent = {
        let sim = sim.clone();
        let release = release.clone();
        HostFrame::with_program(move |me, ret| {
            sim.check_resumed(&me, ret);
            for _ in 0..count {
                let child_sim = sim.clone();
                let release = release.clone();
                let frame = HostFrame::with_program(move |me, ret| {
                    child_sim.check_resumed(&me, ret);
                    release.wait();
                    child_sim.lc.terminate(&me, 1);
                });
                if let Err(e) = sim.lc.fork(&me, &frame) {
                    sim.fail(format!("PID={} fork failed: {}", me.id(), e));
                }
            }
            sim.lc.terminate(&me, 0);
        })
    };

    let pid = sim.lc.fork(&init, &parent).context("failed to fork the parent")?;
    sim.reap(&init, pid, 0);

    // The parent is gone and its children are parked on the barrier
    let orphaned: Vec<Pid> = sim
        .lc
        .registry()
        .pids()
        .into_iter()
        .filter(|&p| p != init.id())
        .collect();
    if orphaned.len() != count {
        bail!("orphans: {} children alive, expected {}", orphaned.len(), count);
    }
    for &pid in &orphaned {
        if let Some(ppid) = sim.lc.registry().get(pid).and_then(|orphan| orphan.parent()) {
            sim.fail(format!("PID={} still has parent PID={}", pid, ppid));
        }
    }
    log::info!("[SIM] orphans: releasing {:?}", orphaned);
    release.wait();

    sim.finish("orphans", &init)
}

// ============================================================================
// zombies
// ============================================================================

pub fn zombies(config: LifecycleConfig, count: usize) -> Result<Report> {
    let sim = Sim::new(config);
    let init = sim.boot()?;

    let parent = {
        let sim = sim.clone();
        HostFrame::with_program(move |me, ret| {
            sim.check_resumed(&me, ret);
            for i in 0..count {
                let child_sim = sim.clone();
                let frame = HostFrame::with_program(move |me, ret| {
                    child_sim.check_resumed(&me, ret);
                    child_sim.lc.terminate(&me, i as i32);
                });
                if let Err(e) = sim.lc.fork(&me, &frame) {
                    sim.fail(format!("PID={} fork failed: {}", me.id(), e));
                }
            }

            // Leave every child a zombie, then exit without reaping any
            let children = me.children();
            while !children.iter().all(|&pid| {
                sim.lc
                    .registry()
                    .get(pid)
                    .is_some_and(|child| child.outcome().is_exited())
            }) {
                thread::yield_now();
            }
            log::info!("[SIM] zombies: PID={} exiting over {:?}", me.id(), children);
            sim.lc.terminate(&me, 0);
        })
    };

    let pid = sim.lc.fork(&init, &parent).context("failed to fork the parent")?;
    sim.reap(&init, pid, 0);

    sim.finish("zombies", &init)
}
