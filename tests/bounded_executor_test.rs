//! Integration tests for the bounded executor
//!
//! These tests validate the admission contract end to end:
//! - Blocking submission at the permit limit
//! - Permit conservation across success, panic, and shutdown paths
//! - Direct hand-off with pool growth beyond the core size
//! - Concurrency ceiling under sustained load
//! - Shutdown semantics

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fleet_commons::core::{BoundedExecutor, ExecutorConfig, ExecutorError};
use parking_lot::{Condvar, Mutex};
use rand::Rng;

// ============================================================================
// HELPER TYPES
// ============================================================================

/// A gate tasks can block on until the test opens it.
struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            open: Mutex::new(false),
            opened: Condvar::new(),
        })
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }

    fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        drop(open);
        self.opened.notify_all();
    }
}

fn small_executor(core: usize, max: usize) -> BoundedExecutor {
    BoundedExecutor::new(
        ExecutorConfig::new()
            .with_core_pool_size(core)
            .with_max_pool_size(max)
            .with_keep_alive(Duration::from_millis(200))
            .with_thread_name_prefix("it-worker"),
    )
    .expect("executor should construct")
}

/// Wait (bounded) until `condition` holds, re-checking every few millis.
fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

// ============================================================================
// ADMISSION CONTRACT
// ============================================================================

#[test]
fn test_submit_returns_on_acceptance_not_completion() {
    let executor = small_executor(2, 2);
    let gate = Gate::new();

    {
        let gate = Arc::clone(&gate);
        let started = Instant::now();
        executor.submit(move || gate.wait()).unwrap();
        // Acceptance must not wait for the (still blocked) task.
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    gate.open();
    executor.shutdown();
}

#[test]
fn test_submit_blocks_at_permit_limit_until_a_task_completes() {
    let max = 3;
    let executor = Arc::new(small_executor(max, max));
    let gate = Gate::new();

    // Fill every permit with tasks that block on the gate.
    for _ in 0..max {
        let gate = Arc::clone(&gate);
        executor.submit(move || gate.wait()).unwrap();
    }
    assert_eq!(executor.available_permits(), 0);

    // The (N+1)-th submission must block.
    let (accepted_tx, accepted_rx) = mpsc::channel();
    let submitter = {
        let executor = Arc::clone(&executor);
        let gate = Arc::clone(&gate);
        thread::spawn(move || {
            executor.submit(move || gate.wait()).unwrap();
            accepted_tx.send(()).unwrap();
        })
    };

    assert!(
        accepted_rx.recv_timeout(Duration::from_millis(300)).is_err(),
        "submit must not return while all permits are held"
    );

    // Completing one task frees exactly one permit and unblocks the caller.
    gate.open();
    accepted_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("submit should return once a permit is free");
    submitter.join().unwrap();

    executor.shutdown();
}

#[test]
fn test_permits_are_conserved_across_completions() {
    let executor = small_executor(2, 4);
    assert_eq!(executor.available_permits(), 4);

    let completed = Arc::new(AtomicU64::new(0));
    for _ in 0..20 {
        let completed = Arc::clone(&completed);
        executor
            .submit(move || {
                completed.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }

    assert!(wait_until(Duration::from_secs(5), || {
        completed.load(Ordering::Relaxed) == 20
    }));
    // Every acquired permit came back.
    assert!(wait_until(Duration::from_secs(5), || {
        executor.available_permits() == 4
    }));

    let stats = executor.stats();
    assert_eq!(stats.submitted_tasks, 20);
    assert_eq!(stats.completed_tasks, 20);
    assert_eq!(stats.panicked_tasks, 0);

    executor.shutdown();
}

#[test]
fn test_panicking_task_releases_its_permit() {
    let executor = small_executor(1, 2);

    executor.submit(|| panic!("boom")).unwrap();

    assert!(wait_until(Duration::from_secs(5), || {
        executor.stats().panicked_tasks == 1
    }));
    assert!(wait_until(Duration::from_secs(5), || {
        executor.available_permits() == 2
    }));

    // The executor keeps accepting work afterwards.
    let (done_tx, done_rx) = mpsc::channel();
    executor
        .submit(move || done_tx.send(()).unwrap())
        .unwrap();
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("task after a panic should still run");

    executor.shutdown();
}

// ============================================================================
// CONCURRENCY CEILING AND POOL GROWTH
// ============================================================================

#[test]
fn test_concurrency_never_exceeds_max_pool_size() {
    let max = 4;
    let executor = small_executor(2, max);

    let concurrent = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let completed = Arc::new(AtomicU64::new(0));

    for _ in 0..40 {
        let concurrent = Arc::clone(&concurrent);
        let peak = Arc::clone(&peak);
        let completed = Arc::clone(&completed);
        executor
            .submit(move || {
                let now = concurrent.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                let pause = rand::rng().random_range(1..10);
                thread::sleep(Duration::from_millis(pause));
                concurrent.fetch_sub(1, Ordering::SeqCst);
                completed.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        completed.load(Ordering::Relaxed) == 40
    }));
    assert!(
        peak.load(Ordering::SeqCst) <= max,
        "observed {} concurrent tasks with max_pool_size {max}",
        peak.load(Ordering::SeqCst)
    );

    executor.shutdown();
}

#[test]
fn test_pool_grows_beyond_core_under_load() {
    let executor = small_executor(1, 4);
    assert_eq!(executor.stats().worker_count, 1);

    let gate = Gate::new();
    for _ in 0..4 {
        let gate = Arc::clone(&gate);
        executor.submit(move || gate.wait()).unwrap();
    }

    // Four blocked tasks cannot share one worker.
    assert!(wait_until(Duration::from_secs(5), || {
        executor.stats().active_tasks == 4
    }));
    assert_eq!(executor.stats().worker_count, 4);

    gate.open();
    executor.shutdown();
}

#[test]
fn test_idle_workers_shrink_back_to_core() {
    let executor = small_executor(1, 4);

    let gate = Gate::new();
    for _ in 0..4 {
        let gate = Arc::clone(&gate);
        executor.submit(move || gate.wait()).unwrap();
    }
    assert_eq!(executor.stats().worker_count, 4);
    gate.open();

    // Keep-alive in these tests is 200ms; grown workers retire after it.
    assert!(wait_until(Duration::from_secs(5), || {
        executor.stats().worker_count == 1
    }));

    executor.shutdown();
}

#[test]
fn test_parallel_submitters_all_get_through() {
    let executor = Arc::new(small_executor(2, 4));
    let completed = Arc::new(AtomicU64::new(0));

    let submitters: Vec<_> = (0..8)
        .map(|_| {
            let executor = Arc::clone(&executor);
            let completed = Arc::clone(&completed);
            thread::spawn(move || {
                for _ in 0..5 {
                    let completed = Arc::clone(&completed);
                    executor
                        .submit(move || {
                            thread::sleep(Duration::from_millis(2));
                            completed.fetch_add(1, Ordering::Relaxed);
                        })
                        .unwrap();
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    assert!(wait_until(Duration::from_secs(10), || {
        completed.load(Ordering::Relaxed) == 40
    }));
    assert_eq!(executor.stats().submitted_tasks, 40);

    executor.shutdown();
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[test]
fn test_shutdown_rejects_new_work_and_returns_permit() {
    let executor = small_executor(1, 2);
    executor.shutdown();

    let result = executor.submit(|| {});
    assert!(matches!(result, Err(ExecutorError::Shutdown)));
    assert_eq!(executor.available_permits(), 2);
}

#[test]
fn test_shutdown_is_idempotent() {
    let executor = small_executor(1, 1);
    executor.submit(|| {}).unwrap();
    executor.shutdown();
    executor.shutdown();
}

#[test]
fn test_shutdown_waits_for_in_flight_tasks() {
    let executor = small_executor(2, 2);
    let completed = Arc::new(AtomicU64::new(0));

    for _ in 0..2 {
        let completed = Arc::clone(&completed);
        executor
            .submit(move || {
                thread::sleep(Duration::from_millis(100));
                completed.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();
    }

    executor.shutdown();
    assert_eq!(completed.load(Ordering::Relaxed), 2);
}
