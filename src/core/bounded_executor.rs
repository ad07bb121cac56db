//! Permit-bounded task executor with direct worker hand-off.
//!
//! `BoundedExecutor` throttles task admission with a counting permit pool
//! sized to `max_pool_size`. A submitter blocks until a permit is free, then
//! hands its task to a worker thread over a zero-capacity rendezvous channel.
//! The permit pool - not an internal queue - is the sole admission-control
//! mechanism: at most `max_pool_size` tasks are in flight (handed off or
//! running) at any moment, and everything beyond that blocks at `submit`.
//!
//! # Hand-off races
//!
//! A permit reserves a worker slot, but there is no way to know the exact
//! instant a worker returns to its channel receive. A hand-off can therefore
//! be transiently rejected even though a permit was available. Rejections are
//! retried: twice immediately, then with a 100ms pause before each further
//! attempt, until the hand-off succeeds. The retry loop has no upper bound -
//! the reserved permit guarantees a worker will come free.
//!
//! # Design Principles
//!
//! - **No internal queue**: the rendezvous channel holds zero tasks
//! - **No polling**: submitters wait on a Condvar, workers block on recv
//! - **Permits are conserved**: released exactly once per accepted task,
//!   whether the task returns or panics

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use super::error::ExecutorError;
use super::thread_factory::NamedThreadFactory;

/// Immediate retries before hand-off rejection starts backing off.
const HANDOFF_RETRY_COUNT: u64 = 2;
/// Pause between hand-off attempts once immediate retries are exhausted.
const HANDOFF_BACKOFF: Duration = Duration::from_millis(100);
/// Patience per worker when joining during shutdown.
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A unit of work accepted by the executor.
type Task = Box<dyn FnOnce() + Send + 'static>;

/// Bounded executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Workers kept alive even when idle.
    pub core_pool_size: usize,
    /// Upper bound on workers and on in-flight tasks (the permit count).
    pub max_pool_size: usize,
    /// Idle time after which workers above the core count exit.
    pub keep_alive_ms: u64,
    /// Name prefix for worker threads.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_thread_name_prefix() -> String {
    "fleet-worker".to_owned()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let core = num_cpus::get().max(1);
        Self {
            core_pool_size: core,
            max_pool_size: core * 2,
            keep_alive_ms: 60_000,
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl ExecutorConfig {
    /// Create a configuration with defaults sized from the host CPU count.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of workers kept alive when idle.
    #[must_use]
    pub fn with_core_pool_size(mut self, core_pool_size: usize) -> Self {
        self.core_pool_size = core_pool_size;
        self
    }

    /// Set the maximum worker count, which is also the permit count.
    #[must_use]
    pub fn with_max_pool_size(mut self, max_pool_size: usize) -> Self {
        self.max_pool_size = max_pool_size;
        self
    }

    /// Set the idle keep-alive for workers above the core count.
    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: &str) -> Self {
        self.thread_name_prefix = prefix.to_owned();
        self
    }

    /// Idle keep-alive as a `Duration`.
    #[must_use]
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_millis(self.keep_alive_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.core_pool_size == 0 {
            return Err("core_pool_size must be greater than 0".into());
        }
        if self.max_pool_size < self.core_pool_size {
            return Err("max_pool_size must not be less than core_pool_size".into());
        }
        if self.keep_alive_ms == 0 {
            return Err("keep_alive_ms must be greater than 0".into());
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be empty".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Statistics about executor utilization.
#[derive(Debug, Clone, Default)]
pub struct ExecutorStats {
    /// Live worker threads.
    pub worker_count: usize,
    /// Upper bound on workers and in-flight tasks.
    pub max_pool_size: usize,
    /// Admission permits currently free.
    pub available_permits: usize,
    /// Tasks currently executing.
    pub active_tasks: u64,
    /// Tasks accepted over the executor lifetime.
    pub submitted_tasks: u64,
    /// Tasks finished (normally or by panic).
    pub completed_tasks: u64,
    /// Tasks that panicked during execution.
    pub panicked_tasks: u64,
    /// Transient hand-off rejections absorbed by the retry loop. A steadily
    /// climbing value under load is the signal that submitters are spending
    /// time in the backoff path.
    pub handoff_retries: u64,
}

/// Internal counters for executor statistics (thread-safe).
#[derive(Debug, Default)]
struct ExecutorCounters {
    active_tasks: AtomicU64,
    submitted_tasks: AtomicU64,
    completed_tasks: AtomicU64,
    panicked_tasks: AtomicU64,
    handoff_retries: AtomicU64,
}

impl ExecutorCounters {
    fn snapshot(
        &self,
        worker_count: usize,
        max_pool_size: usize,
        available_permits: usize,
    ) -> ExecutorStats {
        ExecutorStats {
            worker_count,
            max_pool_size,
            available_permits,
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
            handoff_retries: self.handoff_retries.load(Ordering::Relaxed),
        }
    }
}

/// Counting permit pool gating task admission.
///
/// Acquire blocks on a Condvar until a permit is free; release hands the
/// permit back and wakes one waiter. The wait is uninterruptible, so an
/// acquisition only ever returns holding a permit.
struct PermitPool {
    available: Mutex<usize>,
    released: Condvar,
}

impl PermitPool {
    fn new(permits: usize) -> Self {
        Self {
            available: Mutex::new(permits),
            released: Condvar::new(),
        }
    }

    fn acquire(&self) {
        let mut available = self.available.lock();
        while *available == 0 {
            self.released.wait(&mut available);
        }
        *available -= 1;
    }

    fn release(&self) {
        let mut available = self.available.lock();
        *available += 1;
        drop(available);
        self.released.notify_one();
    }

    fn available(&self) -> usize {
        *self.available.lock()
    }
}

/// State shared between the executor handle and its worker threads.
struct Inner {
    core_pool_size: usize,
    keep_alive: Duration,
    permits: PermitPool,
    counters: ExecutorCounters,
    workers_live: AtomicUsize,
    shutdown: AtomicBool,
}

impl Inner {
    /// Retire this worker if the pool is above its core size.
    /// On success the live count has already been decremented.
    fn try_retire(&self) -> bool {
        self.workers_live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n > self.core_pool_size).then(|| n - 1)
            })
            .is_ok()
    }

    fn run_task(&self, task: Task) {
        self.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        self.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        self.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
        if outcome.is_err() {
            self.counters.panicked_tasks.fetch_add(1, Ordering::Relaxed);
            error!("task panicked during execution");
        }
        // Completion hook: the permit comes back whatever the outcome.
        self.permits.release();
    }
}

/// Task executor bounded by a counting permit pool.
///
/// `submit` blocks until one of `max_pool_size` admission permits is free,
/// hands the task to a worker over a zero-capacity channel, and returns once
/// the task has been *accepted* - not once it completes. Transient hand-off
/// rejections are retried until they succeed and never surface to callers.
///
/// Workers are named OS threads: `core_pool_size` of them are started
/// eagerly and stay for the executor lifetime; rejection pressure grows the
/// pool up to `max_pool_size`, and workers above core exit again after
/// `keep_alive` idle time.
pub struct BoundedExecutor {
    config: ExecutorConfig,
    inner: Arc<Inner>,
    /// Task sender (to workers). Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<Task>>>,
    /// Receiver template cloned into newly grown workers. Cleared on
    /// shutdown so stragglers observe a disconnect, not a full channel.
    task_rx: Mutex<Option<Receiver<Task>>>,
    thread_factory: NamedThreadFactory,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl BoundedExecutor {
    /// Create an executor and start its core worker threads.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::InvalidConfig` when the configuration is
    /// invalid and `ExecutorError::Spawn` when a core worker thread cannot
    /// be created.
    pub fn new(config: ExecutorConfig) -> Result<Self, ExecutorError> {
        config.validate().map_err(ExecutorError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<Task>(0);
        let inner = Arc::new(Inner {
            core_pool_size: config.core_pool_size,
            keep_alive: config.keep_alive(),
            permits: PermitPool::new(config.max_pool_size),
            counters: ExecutorCounters::default(),
            workers_live: AtomicUsize::new(0),
            shutdown: AtomicBool::new(false),
        });
        let thread_factory = NamedThreadFactory::new(&config.thread_name_prefix);

        let mut workers = Vec::with_capacity(config.core_pool_size);
        for _ in 0..config.core_pool_size {
            inner.workers_live.fetch_add(1, Ordering::AcqRel);
            workers.push(spawn_worker(&thread_factory, task_rx.clone(), Arc::clone(&inner))?);
        }

        info!(
            core_pool_size = config.core_pool_size,
            max_pool_size = config.max_pool_size,
            keep_alive_ms = config.keep_alive_ms,
            "bounded executor initialized (permit-bounded, direct hand-off)"
        );

        Ok(Self {
            config,
            inner,
            task_tx: Mutex::new(Some(task_tx)),
            task_rx: Mutex::new(Some(task_rx)),
            thread_factory,
            workers: Mutex::new(workers),
        })
    }

    /// Submit a task for asynchronous execution.
    ///
    /// Blocks until an admission permit is free, then hands the task to a
    /// worker. Returns once the task has been accepted; completion is not
    /// awaited. Transient hand-off rejections are absorbed by the retry
    /// loop and never returned.
    ///
    /// # Errors
    ///
    /// Returns `ExecutorError::Shutdown` when the executor has been shut
    /// down; the task was never accepted and its permit has been returned.
    pub fn submit<F>(&self, task: F) -> Result<(), ExecutorError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(ExecutorError::Shutdown);
        }

        self.inner.permits.acquire();

        let sender = {
            let guard = self.task_tx.lock();
            match guard.as_ref() {
                Some(tx) => tx.clone(),
                None => {
                    self.inner.permits.release();
                    return Err(ExecutorError::Shutdown);
                }
            }
        };

        let mut task: Task = Box::new(task);
        let mut retries: u64 = 0;
        loop {
            match sender.try_send(task) {
                Ok(()) => break,
                Err(TrySendError::Full(returned)) => {
                    // No worker was parked on the channel at this instant,
                    // even though a permit reserved a slot. Grow if below
                    // max, then keep trying until a worker comes free.
                    task = returned;
                    self.try_grow();
                    retries += 1;
                    self.inner.counters.handoff_retries.fetch_add(1, Ordering::Relaxed);
                    if retries > HANDOFF_RETRY_COUNT {
                        trace!(retries, "hand-off still contended, backing off");
                        thread::sleep(HANDOFF_BACKOFF);
                    }
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.inner.permits.release();
                    return Err(ExecutorError::Shutdown);
                }
            }
        }

        self.inner.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Spawn one extra worker if the pool is below `max_pool_size`.
    fn try_grow(&self) {
        let max = self.config.max_pool_size;
        if self
            .inner
            .workers_live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then(|| n + 1)
            })
            .is_err()
        {
            return;
        }

        let task_rx = self.task_rx.lock().clone();
        let Some(task_rx) = task_rx else {
            self.inner.workers_live.fetch_sub(1, Ordering::AcqRel);
            return;
        };

        match spawn_worker(&self.thread_factory, task_rx, Arc::clone(&self.inner)) {
            Ok(handle) => {
                debug!("grew worker pool beyond core size");
                self.workers.lock().push(handle);
            }
            Err(e) => {
                self.inner.workers_live.fetch_sub(1, Ordering::AcqRel);
                warn!(error = %e, "failed to grow worker pool");
            }
        }
    }

    /// Admission permits currently free.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available()
    }

    /// Get current executor statistics.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        self.inner.counters.snapshot(
            self.inner.workers_live.load(Ordering::Relaxed),
            self.config.max_pool_size,
            self.inner.permits.available(),
        )
    }

    /// The configuration this executor was built from.
    #[must_use]
    pub const fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Shut down the executor.
    ///
    /// Stops accepting tasks, unblocks idle workers by dropping the task
    /// channel, and joins each worker with a short timeout. Workers still
    /// running a task past the timeout are detached and finish on their
    /// own. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("shutting down bounded executor");

        *self.task_tx.lock() = None;
        *self.task_rx.lock() = None;

        let mut workers = self.workers.lock();
        let worker_count = workers.len();

        for (idx, worker) in workers.drain(..).enumerate() {
            let (tx, rx) = std::sync::mpsc::channel();
            let join_thread = thread::spawn(move || {
                let _ = tx.send(worker.join().is_ok());
            });

            match rx.recv_timeout(SHUTDOWN_JOIN_TIMEOUT) {
                Ok(true) => {
                    debug!(worker = idx, "worker joined");
                    let _ = join_thread.join();
                }
                Ok(false) => {
                    warn!(worker = idx, "worker exited by panic");
                    let _ = join_thread.join();
                }
                Err(_) => {
                    warn!(worker = idx, "worker did not exit within timeout, detaching");
                }
            }
        }

        info!(worker_count, "bounded executor shut down");
    }
}

impl Drop for BoundedExecutor {
    fn drop(&mut self) {
        // Signal shutdown without joining: a drop mid-task must not hang
        // the dropping thread. Explicit shutdown() joins workers.
        if !self.inner.shutdown.swap(true, Ordering::AcqRel) {
            *self.task_tx.lock() = None;
            *self.task_rx.lock() = None;
            debug!("bounded executor dropped without explicit shutdown, workers will exit");
        }
    }
}

/// Spawn a worker thread running the receive loop.
fn spawn_worker(
    factory: &NamedThreadFactory,
    task_rx: Receiver<Task>,
    inner: Arc<Inner>,
) -> Result<JoinHandle<()>, ExecutorError> {
    let handle = factory.spawn(move || run_worker(&task_rx, &inner))?;
    Ok(handle)
}

/// Worker loop: blocking receive with idle timeout.
///
/// The timeout drives pool shrink - a worker that sits idle for the
/// keep-alive period retires if the pool is above its core size. A
/// disconnected channel (shutdown) ends the loop unconditionally.
fn run_worker(task_rx: &Receiver<Task>, inner: &Arc<Inner>) {
    debug!("worker thread started");
    loop {
        match task_rx.recv_timeout(inner.keep_alive) {
            Ok(task) => inner.run_task(task),
            Err(RecvTimeoutError::Timeout) => {
                if inner.try_retire() {
                    debug!("idle worker retiring");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                inner.workers_live.fetch_sub(1, Ordering::AcqRel);
                debug!("task channel closed, worker exiting");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permit_pool_acquire_release() {
        let permits = PermitPool::new(2);
        assert_eq!(permits.available(), 2);

        permits.acquire();
        permits.acquire();
        assert_eq!(permits.available(), 0);

        permits.release();
        assert_eq!(permits.available(), 1);
        permits.release();
        assert_eq!(permits.available(), 2);
    }

    #[test]
    fn test_permit_pool_blocks_until_released() {
        let permits = Arc::new(PermitPool::new(1));
        permits.acquire();

        let waiter = {
            let permits = Arc::clone(&permits);
            thread::spawn(move || {
                permits.acquire();
            })
        };

        // The waiter cannot finish until the permit comes back.
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());

        permits.release();
        waiter.join().unwrap();
        assert_eq!(permits.available(), 0);
    }

    #[test]
    fn test_config_defaults_are_valid() {
        let config = ExecutorConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.max_pool_size >= config.core_pool_size);
    }

    #[test]
    fn test_config_rejects_zero_core() {
        let config = ExecutorConfig::new().with_core_pool_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_max_below_core() {
        let config = ExecutorConfig::new()
            .with_core_pool_size(4)
            .with_max_pool_size(2);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "core_pool_size": 2,
            "max_pool_size": 4,
            "keep_alive_ms": 30000
        }"#;

        let config = ExecutorConfig::from_json_str(json).unwrap();
        assert_eq!(config.core_pool_size, 2);
        assert_eq!(config.max_pool_size, 4);
        assert_eq!(config.keep_alive(), Duration::from_secs(30));
        assert_eq!(config.thread_name_prefix, "fleet-worker");
    }

    #[test]
    fn test_config_from_json_rejects_invalid() {
        let json = r#"{
            "core_pool_size": 0,
            "max_pool_size": 4,
            "keep_alive_ms": 30000
        }"#;
        assert!(ExecutorConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_invalid_config_fails_construction() {
        let result = BoundedExecutor::new(ExecutorConfig::new().with_core_pool_size(0));
        assert!(matches!(result, Err(ExecutorError::InvalidConfig(_))));
    }

    #[test]
    fn test_submit_after_shutdown_is_rejected() {
        let executor = BoundedExecutor::new(
            ExecutorConfig::new().with_core_pool_size(1).with_max_pool_size(1),
        )
        .unwrap();
        executor.shutdown();

        let result = executor.submit(|| {});
        assert!(matches!(result, Err(ExecutorError::Shutdown)));
        assert_eq!(executor.available_permits(), 1);
    }
}
