//! TEAM_452: End-to-end lifecycle tests on host threads.
//!
//! Every forked process runs on its own std thread via the host backends.
//! Programs end with `terminate` and return so `join_all` can collect them.

#![cfg(feature = "std")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

use los_proc::host::{HostFrame, HostLifecycle, HostProcess, host_lifecycle};
use los_proc::{ExitOutcome, LifecycleConfig, Pid, ProcError, WaitStatus};

fn boot(config: LifecycleConfig) -> (Arc<HostLifecycle>, Arc<HostProcess>) {
    let lc = host_lifecycle(config);
    let space = lc.spaces().create(vec![0xAA; 64]);
    let init = lc.spawn_init("init", space).unwrap();
    (lc, init)
}

fn wait_for(lc: &HostLifecycle, caller: &Arc<HostProcess>, pid: Pid) -> Result<WaitStatus, ProcError> {
    let mut raw = -1;
    let got = lc.wait(caller, pid, &mut Some(&mut raw), 0)?;
    assert_eq!(got, pid);
    Ok(WaitStatus::from_raw(raw))
}

/// Spin until `pid` has exited or is gone from the registry.
fn until_exited(lc: &HostLifecycle, pid: Pid) {
    loop {
        match lc.registry().get(pid) {
            Some(p) if p.outcome() == ExitOutcome::Running => thread::yield_now(),
            _ => return,
        }
    }
}

/// Tests: fresh PID, child listed exactly once, child resumes with 0
#[test]
fn test_fork_links_child_once() {
    let (lc, init) = boot(LifecycleConfig::default());
    let gate = Arc::new(Barrier::new(2));
    let seen_ret = Arc::new(AtomicUsize::new(usize::MAX));

    let frame = {
        let lc = lc.clone();
        let gate = gate.clone();
        let seen_ret = seen_ret.clone();
        HostFrame::with_program(move |me, ret| {
            seen_ret.store(ret, Ordering::SeqCst);
            gate.wait();
            lc.terminate(&me, 0);
        })
    };

    let pid = lc.fork(&init, &frame).unwrap();
    assert_ne!(pid, init.id());
    assert_eq!(init.children(), [pid]);
    assert!(lc.registry().contains(pid));
    assert_eq!(lc.registry().get(pid).and_then(|c| c.parent()), Some(init.id()));

    gate.wait();
    wait_for(&lc, &init, pid).unwrap();
    assert!(lc.contexts().join_all());
    assert_eq!(seen_ret.load(Ordering::SeqCst), 0);
}

/// Tests: child gets its own copy of the parent's address space
#[test]
fn test_fork_copies_address_space() {
    let (lc, init) = boot(LifecycleConfig::default());
    let gate = Arc::new(Barrier::new(2));

    let frame = {
        let lc = lc.clone();
        let gate = gate.clone();
        HostFrame::with_program(move |me, _| {
            gate.wait();
            lc.terminate(&me, 0);
        })
    };
    let pid = lc.fork(&init, &frame).unwrap();

    let child = lc.registry().get(pid).unwrap();
    let parent_space = init.with_address_space(|s| (s.id, s.bytes.clone())).unwrap();
    let child_space = child.with_address_space(|s| (s.id, s.bytes.clone())).unwrap();
    assert_ne!(parent_space.0, child_space.0);
    assert_eq!(parent_space.1, child_space.1);
    assert_eq!(lc.spaces().live(), 2);

    gate.wait();
    wait_for(&lc, &init, pid).unwrap();
    assert!(lc.contexts().join_all());
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: A forks B, B exits 7, A reaps 7, second wait fails
#[test]
fn test_exit_then_wait_reports_code() {
    let (lc, init) = boot(LifecycleConfig::default());

    let frame = {
        let lc = lc.clone();
        HostFrame::with_program(move |me, _| lc.terminate(&me, 7))
    };
    let pid = lc.fork(&init, &frame).unwrap();
    until_exited(&lc, pid);

    // Zombie stays registered until reaped
    assert!(lc.registry().contains(pid));

    let status = wait_for(&lc, &init, pid).unwrap();
    assert!(status.is_exited());
    assert_eq!(status.exit_code(), Some(7));
    assert_eq!(status, WaitStatus::exited(7));

    assert_eq!(wait_for(&lc, &init, pid), Err(ProcError::NoSuchChild));
    assert!(!lc.registry().contains(pid));
    assert!(lc.contexts().join_all());
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: wait blocks while the child runs and wakes when it exits
#[test]
fn test_wait_blocks_until_exit() {
    let (lc, init) = boot(LifecycleConfig::default());
    let gate = Arc::new(Barrier::new(2));

    let frame = {
        let lc = lc.clone();
        let gate = gate.clone();
        HostFrame::with_program(move |me, _| {
            gate.wait();
            lc.terminate(&me, 42);
        })
    };
    let pid = lc.fork(&init, &frame).unwrap();

    let releaser = {
        let gate = gate.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            gate.wait();
        })
    };

    let status = wait_for(&lc, &init, pid).unwrap();
    assert_eq!(status.exit_code(), Some(42));
    releaser.join().unwrap();
    assert!(lc.contexts().join_all());
}

#[test]
fn test_wait_on_self_fails() {
    let (lc, init) = boot(LifecycleConfig::default());
    assert_eq!(wait_for(&lc, &init, init.id()), Err(ProcError::NoSuchChild));

    // Also with a null status pointer and bad options: self check comes first
    let mut null: Option<&mut i32> = None;
    assert_eq!(
        lc.wait(&init, init.id(), &mut null, 1),
        Err(ProcError::NoSuchChild)
    );
}

#[test]
fn test_wait_unknown_pid_fails() {
    let (lc, init) = boot(LifecycleConfig::default());
    assert_eq!(wait_for(&lc, &init, Pid(999)), Err(ProcError::NoSuchChild));
}

/// Tests: invalid destination and options are refused without reaping
#[test]
fn test_wait_argument_errors_keep_child() {
    let (lc, init) = boot(LifecycleConfig::default());
    let frame = {
        let lc = lc.clone();
        HostFrame::with_program(move |me, _| lc.terminate(&me, 1))
    };
    let pid = lc.fork(&init, &frame).unwrap();

    let mut null: Option<&mut i32> = None;
    assert_eq!(
        lc.wait(&init, pid, &mut null, 0),
        Err(ProcError::InvalidOutputLocation)
    );
    let mut raw = 0;
    assert_eq!(
        lc.wait(&init, pid, &mut Some(&mut raw), 0x1),
        Err(ProcError::InvalidArgument)
    );
    assert!(init.has_child(pid));

    assert_eq!(wait_for(&lc, &init, pid).unwrap().exit_code(), Some(1));
    assert!(lc.contexts().join_all());
}

/// Tests: only the direct parent can wait
#[test]
fn test_wait_on_grandchild_fails() {
    let (lc, init) = boot(LifecycleConfig::default());
    let grandchild = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(Barrier::new(2));

    let frame = {
        let lc = lc.clone();
        let grandchild = grandchild.clone();
        let gate = gate.clone();
        HostFrame::with_program(move |me, _| {
            let inner = {
                let lc = lc.clone();
                HostFrame::with_program(move |c, _| lc.terminate(&c, 2))
            };
            let pid = lc.fork(&me, &inner).unwrap();
            grandchild.store(pid.as_usize(), Ordering::SeqCst);
            gate.wait();
            gate.wait();
            let status = wait_for(&lc, &me, pid).unwrap();
            lc.terminate(&me, status.exit_code().unwrap_or(-1));
        })
    };
    let pid = lc.fork(&init, &frame).unwrap();

    gate.wait();
    let gpid = Pid(grandchild.load(Ordering::SeqCst));
    assert_eq!(wait_for(&lc, &init, gpid), Err(ProcError::NoSuchChild));
    gate.wait();

    // Middle process passes the grandchild's code through
    assert_eq!(wait_for(&lc, &init, pid).unwrap().exit_code(), Some(2));
    assert!(lc.contexts().join_all());
    assert_eq!(lc.registry().pids(), [init.id()]);
}

/// Tests: a running child is orphaned, not destroyed, and destroys itself
/// when it later exits
#[test]
fn test_orphan_outlives_parent() {
    let (lc, init) = boot(LifecycleConfig::default());
    let orphan = Arc::new(AtomicUsize::new(0));
    let release = Arc::new(Barrier::new(2));

    let frame = {
        let lc = lc.clone();
        let orphan = orphan.clone();
        let release = release.clone();
        HostFrame::with_program(move |me, _| {
            let inner = {
                let lc = lc.clone();
                let release = release.clone();
                HostFrame::with_program(move |c, _| {
                    release.wait();
                    lc.terminate(&c, 3);
                })
            };
            let pid = lc.fork(&me, &inner).unwrap();
            orphan.store(pid.as_usize(), Ordering::SeqCst);
            lc.terminate(&me, 1);
        })
    };
    let parent = lc.fork(&init, &frame).unwrap();

    assert_eq!(wait_for(&lc, &init, parent).unwrap().exit_code(), Some(1));

    let opid = Pid(orphan.load(Ordering::SeqCst));
    let child = lc.registry().get(opid).unwrap();
    assert_eq!(child.parent(), None);
    assert_eq!(child.outcome(), ExitOutcome::Running);
    assert_eq!(lc.getppid(&child), None);
    drop(child);

    release.wait();
    assert!(lc.contexts().join_all());
    assert!(!lc.registry().contains(opid));
    assert_eq!(lc.registry().pids(), [init.id()]);
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: an exited, unreaped child is destroyed by its parent's exit
#[test]
fn test_zombie_reclaimed_on_parent_exit() {
    let (lc, init) = boot(LifecycleConfig::default());
    let zombie = Arc::new(AtomicUsize::new(0));

    let frame = {
        let lc = lc.clone();
        let zombie = zombie.clone();
        HostFrame::with_program(move |me, _| {
            let inner = {
                let lc = lc.clone();
                HostFrame::with_program(move |c, _| lc.terminate(&c, 5))
            };
            let pid = lc.fork(&me, &inner).unwrap();
            zombie.store(pid.as_usize(), Ordering::SeqCst);
            until_exited(&lc, pid);
            lc.terminate(&me, 0);
        })
    };
    let parent = lc.fork(&init, &frame).unwrap();

    assert_eq!(wait_for(&lc, &init, parent).unwrap().exit_code(), Some(0));
    let zpid = Pid(zombie.load(Ordering::SeqCst));
    assert!(!lc.registry().contains(zpid));
    assert!(lc.contexts().join_all());
    assert_eq!(lc.registry().pids(), [init.id()]);
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: a process without a parent is destroyed at exit
#[test]
fn test_root_exit_destroys_itself() {
    let (lc, init) = boot(LifecycleConfig::default());
    lc.terminate(&init, 0);
    assert!(lc.registry().is_empty());
    assert_eq!(lc.spaces().live(), 0);
    assert_eq!(lc.contexts().detached(), 1);
    assert_eq!(init.outcome(), ExitOutcome::Exited(0));
}

#[test]
fn test_fork_unwinds_on_copy_failure() {
    let (lc, init) = boot(LifecycleConfig::default());
    lc.spaces().fail_next_duplicate();

    assert_eq!(
        lc.fork(&init, &HostFrame::new()),
        Err(ProcError::ResourceExhausted)
    );
    assert!(init.children().is_empty());
    assert_eq!(lc.registry().len(), 1);
    assert_eq!(lc.spaces().live(), 1);
    assert_eq!(lc.contexts().spawned(), 0);
}

#[test]
fn test_fork_unwinds_on_spawn_failure() {
    let (lc, init) = boot(LifecycleConfig::default());
    lc.contexts().fail_next_spawn();

    assert_eq!(
        lc.fork(&init, &HostFrame::new()),
        Err(ProcError::ResourceExhausted)
    );
    assert!(init.children().is_empty());
    assert_eq!(lc.registry().pids(), [init.id()]);
    assert_eq!(lc.spaces().live(), 1);

    // Next fork works normally
    let frame = {
        let lc = lc.clone();
        HostFrame::with_program(move |me, _| lc.terminate(&me, 0))
    };
    let pid = lc.fork(&init, &frame).unwrap();
    wait_for(&lc, &init, pid).unwrap();
    assert!(lc.contexts().join_all());
}

#[test]
fn test_fork_fails_when_pids_run_out() {
    let (lc, init) = boot(LifecycleConfig::default().with_max_pid(2));
    let frame = {
        let lc = lc.clone();
        HostFrame::with_program(move |me, _| lc.terminate(&me, 0))
    };

    let pid = lc.fork(&init, &frame).unwrap();
    assert_eq!(pid, Pid(2));
    assert_eq!(lc.fork(&init, &frame), Err(ProcError::ResourceExhausted));
    assert_eq!(init.children(), [pid]);

    wait_for(&lc, &init, pid).unwrap();
    assert!(lc.contexts().join_all());
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: PIDs are distinct among live processes and codes don't cross
#[test]
fn test_many_children_reaped_in_any_order() {
    let (lc, init) = boot(LifecycleConfig::default());
    let mut pids = Vec::new();

    for code in 0..16 {
        let frame = {
            let lc = lc.clone();
            HostFrame::with_program(move |me, _| {
                if code % 2 == 0 {
                    thread::sleep(Duration::from_millis(5));
                }
                lc.terminate(&me, code);
            })
        };
        pids.push((lc.fork(&init, &frame).unwrap(), code));
    }

    let mut unique: Vec<Pid> = pids.iter().map(|(p, _)| *p).collect();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 16);
    assert_eq!(init.children().len(), 16);

    for (pid, code) in pids.iter().rev() {
        let status = wait_for(&lc, &init, *pid).unwrap();
        assert_eq!(status.exit_code(), Some(*code));
    }
    assert!(init.children().is_empty());
    assert!(lc.contexts().join_all());
    assert_eq!(lc.registry().pids(), [init.id()]);
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: two concurrent waits on one child reap it exactly once
#[test]
fn test_concurrent_waits_reap_once() {
    let (lc, init) = boot(LifecycleConfig::default());
    let gate = Arc::new(Barrier::new(2));

    let frame = {
        let lc = lc.clone();
        let gate = gate.clone();
        HostFrame::with_program(move |me, _| {
            gate.wait();
            lc.terminate(&me, 11);
        })
    };
    let pid = lc.fork(&init, &frame).unwrap();

    let waiters: Vec<_> = (0..2)
        .map(|_| {
            let lc = lc.clone();
            let init = init.clone();
            thread::spawn(move || wait_for(&lc, &init, pid))
        })
        .collect();

    thread::sleep(Duration::from_millis(20));
    gate.wait();

    let results: Vec<_> = waiters.into_iter().map(|h| h.join().unwrap()).collect();
    let reaped = results.iter().filter(|r| r.is_ok()).count();
    let refused = results
        .iter()
        .filter(|r| **r == Err(ProcError::NoSuchChild))
        .count();
    assert_eq!((reaped, refused), (1, 1));
    assert!(lc.contexts().join_all());
}

/// Tests: exit never returns, the parent still collects the code
#[test]
fn test_exit_parks_context_for_good() {
    let (lc, init) = boot(LifecycleConfig::default());
    let frame = {
        let lc = lc.clone();
        HostFrame::with_program(move |me, _| lc.exit(&me, 9))
    };
    let pid = lc.fork(&init, &frame).unwrap();

    assert_eq!(wait_for(&lc, &init, pid).unwrap().exit_code(), Some(9));
    assert_eq!(lc.contexts().detached(), 1);
    // The exited thread stays parked, so no join_all here
}

/// Tests: a wait that already claimed the child still reaps it after the
/// parent has exited, and is woken by the child's exit
#[test]
fn test_claimed_child_outlives_exited_parent() {
    let (lc, init) = boot(LifecycleConfig::default());
    let release = Arc::new(Barrier::new(2));
    let (tx, rx) = mpsc::channel();

    let frame = {
        let lc = lc.clone();
        let release = release.clone();
        HostFrame::with_program(move |me, _| {
            let inner = {
                let lc = lc.clone();
                let release = release.clone();
                HostFrame::with_program(move |c, _| {
                    release.wait();
                    lc.terminate(&c, 6);
                })
            };
            let cpid = lc.fork(&me, &inner).unwrap();

            // A second context of the parent blocks in waitpid on the child
            {
                let lc = lc.clone();
                let me = me.clone();
                let tx = tx.clone();
                thread::spawn(move || {
                    let _ = tx.send((cpid, wait_for(&lc, &me, cpid)));
                });
            }
            while me.has_child(cpid) {
                thread::yield_now();
            }

            lc.terminate(&me, 0);
            release.wait();
        })
    };
    let parent = lc.fork(&init, &frame).unwrap();
    assert_eq!(wait_for(&lc, &init, parent).unwrap().exit_code(), Some(0));

    let (cpid, result) = rx
        .recv_timeout(Duration::from_secs(10))
        .expect("claiming waitpid was never woken");
    assert_eq!(result.unwrap().exit_code(), Some(6));
    assert!(!lc.registry().contains(cpid));

    assert!(lc.contexts().join_all());
    assert_eq!(lc.registry().pids(), [init.id()]);
    assert_eq!(lc.spaces().live(), 1);
}

/// Tests: a parent and its child exiting at the same moment leave nothing
/// behind, whichever of them decides first
#[test]
fn test_parent_and_child_exit_together() {
    let (lc, init) = boot(LifecycleConfig::default());

    for round in 0..200 {
        let frame = {
            let lc = lc.clone();
            HostFrame::with_program(move |me, _| {
                let together = Arc::new(Barrier::new(2));
                let inner = {
                    let lc = lc.clone();
                    let together = together.clone();
                    HostFrame::with_program(move |c, _| {
                        together.wait();
                        lc.terminate(&c, 1);
                    })
                };
                lc.fork(&me, &inner).unwrap();
                together.wait();
                lc.terminate(&me, 0);
            })
        };
        let parent = lc.fork(&init, &frame).unwrap();
        assert_eq!(wait_for(&lc, &init, parent).unwrap().exit_code(), Some(0));

        assert!(lc.contexts().join_all());
        assert_eq!(lc.registry().pids(), [init.id()], "round {round}");
        assert_eq!(lc.spaces().live(), 1, "round {round}");
    }
}

/// Tests: a process already past exit has no address space and can't fork
#[test]
fn test_fork_after_exit_is_refused() {
    let (lc, init) = boot(LifecycleConfig::default());
    lc.terminate(&init, 0);

    assert_eq!(
        lc.fork(&init, &HostFrame::new()),
        Err(ProcError::InvalidArgument)
    );
    assert!(lc.registry().is_empty());
    assert_eq!(lc.spaces().live(), 0);
    assert_eq!(lc.contexts().spawned(), 0);
}
