//! Bounded, named, cancellable task pool (design §4.4), ported from the
//! teacher's tokio-task-plus-`CancellationToken` concurrency shape
//! (`mesio::hls::coordinator::HlsStreamCoordinator::setup_and_spawn`,
//! `pipeline_common::channel_pipeline::ChannelPipeline`). Tasks run as
//! tokio tasks bounded by a semaphore rather than OS threads — the
//! contract ("fixed width", "cancellable", "drains on shutdown") is the
//! same either way, and async tasks are the idiomatic width-limiting
//! primitive for I/O-bound preview/download work in this workspace.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{WorkerError, WorkerResult};

/// Outcome of a single task, observed by [`TaskHandle::join`].
#[derive(Debug)]
pub enum TaskOutcome<T> {
    Completed(T),
    Cancelled,
    Panicked(String),
}

/// The same outcome with the value erased, passed to the pool's
/// completion hook (§4.4 "completion hook ... fires exactly once per
/// task").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcomeKind {
    Completed,
    Cancelled,
    Panicked,
}

impl<T> TaskOutcome<T> {
    fn kind(&self) -> TaskOutcomeKind {
        match self {
            TaskOutcome::Completed(_) => TaskOutcomeKind::Completed,
            TaskOutcome::Cancelled => TaskOutcomeKind::Cancelled,
            TaskOutcome::Panicked(_) => TaskOutcomeKind::Panicked,
        }
    }
}

/// A handle to a submitted task: observable and independently
/// cancellable, per §4.4 "task identity."
pub struct TaskHandle<T> {
    token: CancellationToken,
    join: JoinHandle<TaskOutcome<T>>,
}

impl<T> TaskHandle<T> {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> TaskOutcome<T> {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::Panicked(e.to_string()),
        }
    }
}

type CompletionHook = dyn Fn(&str, TaskOutcomeKind) + Send + Sync;

/// Aggregate counters reported by [`crate::manager::ThreadManager::status`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStatus {
    pub running: bool,
    pub active_tasks: usize,
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_cancelled: u64,
    pub total_failed: u64,
}

pub struct WorkerPool {
    name: String,
    max_workers: usize,
    semaphore: Arc<Semaphore>,
    pool_token: CancellationToken,
    running: Mutex<bool>,
    shut_down: Mutex<bool>,
    active_tasks: Arc<AtomicUsize>,
    next_task_id: AtomicU64,
    task_tokens: Arc<Mutex<HashMap<u64, CancellationToken>>>,
    total_submitted: Arc<AtomicUsize>,
    total_completed: Arc<AtomicUsize>,
    total_cancelled: Arc<AtomicUsize>,
    total_failed: Arc<AtomicUsize>,
    on_complete: Option<Arc<CompletionHook>>,
}

impl WorkerPool {
    pub fn new(name: impl Into<String>, max_workers: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            max_workers: max_workers.max(1),
            semaphore: Arc::new(Semaphore::new(max_workers.max(1))),
            pool_token: CancellationToken::new(),
            running: Mutex::new(false),
            shut_down: Mutex::new(false),
            active_tasks: Arc::new(AtomicUsize::new(0)),
            next_task_id: AtomicU64::new(0),
            task_tokens: Arc::new(Mutex::new(HashMap::new())),
            total_submitted: Arc::new(AtomicUsize::new(0)),
            total_completed: Arc::new(AtomicUsize::new(0)),
            total_cancelled: Arc::new(AtomicUsize::new(0)),
            total_failed: Arc::new(AtomicUsize::new(0)),
            on_complete: None,
        })
    }

    pub fn with_on_complete(
        mut self: Arc<Self>,
        hook: impl Fn(&str, TaskOutcomeKind) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::get_mut(&mut self)
            .expect("with_on_complete must be called before the pool is shared")
            .on_complete = Some(Arc::new(hook));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// §4.4 `start()`: idempotent if already running.
    pub fn start(&self) -> WorkerResult<()> {
        if *self.shut_down.lock() {
            return Err(WorkerError::NotRunning(self.name.clone()));
        }
        let mut running = self.running.lock();
        if *running {
            warn!(pool = %self.name, "start() called on an already-running pool");
            return Ok(());
        }
        *running = true;
        info!(pool = %self.name, width = self.max_workers, "worker pool started");
        Ok(())
    }

    /// §4.4 `submit(task) -> handle`. `task` receives its own
    /// per-task [`CancellationToken`] so long-running work can poll it
    /// cooperatively; a task cancelled before it starts never runs `F`.
    pub fn submit<F, Fut, T>(&self, label: impl Into<String>, task: F) -> WorkerResult<TaskHandle<T>>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if !*self.running.lock() {
            return Err(WorkerError::NotRunning(self.name.clone()));
        }

        let label = label.into();
        let task_id = self.next_task_id.fetch_add(1, Ordering::SeqCst);
        let child_token = self.pool_token.child_token();
        self.task_tokens.lock().insert(task_id, child_token.clone());
        self.total_submitted.fetch_add(1, Ordering::SeqCst);

        let semaphore = self.semaphore.clone();
        let active_tasks = self.active_tasks.clone();
        let total_completed = self.total_completed.clone();
        let total_cancelled = self.total_cancelled.clone();
        let total_failed = self.total_failed.clone();
        let on_complete = self.on_complete.clone();
        let task_tokens = TaskTokenRegistry {
            tokens: self.task_tokens.clone(),
        };
        let spawn_token = child_token.clone();

        let join = tokio::spawn(async move {
            let outcome = if spawn_token.is_cancelled() {
                total_cancelled.fetch_add(1, Ordering::SeqCst);
                TaskOutcome::Cancelled
            } else {
                let permit = tokio::select! {
                    biased;
                    _ = spawn_token.cancelled() => None,
                    permit = semaphore.acquire_owned() => permit.ok(),
                };
                match permit {
                    None => {
                        total_cancelled.fetch_add(1, Ordering::SeqCst);
                        TaskOutcome::Cancelled
                    }
                    Some(_permit) => {
                        active_tasks.fetch_add(1, Ordering::SeqCst);
                        let result = tokio::select! {
                            biased;
                            _ = spawn_token.cancelled() => TaskOutcome::Cancelled,
                            value = task(spawn_token.clone()) => TaskOutcome::Completed(value),
                        };
                        active_tasks.fetch_sub(1, Ordering::SeqCst);
                        match &result {
                            TaskOutcome::Completed(_) => {
                                total_completed.fetch_add(1, Ordering::SeqCst);
                            }
                            TaskOutcome::Cancelled => {
                                total_cancelled.fetch_add(1, Ordering::SeqCst);
                            }
                            TaskOutcome::Panicked(_) => {
                                total_failed.fetch_add(1, Ordering::SeqCst);
                            }
                        }
                        result
                    }
                }
            };

            task_tokens.remove(task_id);
            if let Some(hook) = &on_complete {
                hook(&label, outcome.kind());
            }
            outcome
        });

        Ok(TaskHandle {
            token: child_token,
            join,
        })
    }

    /// §4.4 `cancel_all()`: cancels every queued and in-flight task's
    /// own token (not the pool-wide token, so the pool keeps accepting
    /// new submissions) and returns how many were marked.
    pub fn cancel_all(&self) -> usize {
        let tokens = self.task_tokens.lock();
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    pub fn active_task_count(&self) -> usize {
        self.active_tasks.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            running: *self.running.lock(),
            active_tasks: self.active_task_count(),
            total_submitted: self.total_submitted.load(Ordering::SeqCst) as u64,
            total_completed: self.total_completed.load(Ordering::SeqCst) as u64,
            total_cancelled: self.total_cancelled.load(Ordering::SeqCst) as u64,
            total_failed: self.total_failed.load(Ordering::SeqCst) as u64,
        }
    }

    /// §4.4 `shutdown(wait, timeout)`. Stops accepting new tasks
    /// immediately; if `wait`, polls for drain up to `timeout`, escalating
    /// to [`Self::cancel_all`] on timeout. Permanently disables the pool.
    pub async fn shutdown(&self, wait: bool, timeout: Duration) -> WorkerResult<()> {
        *self.running.lock() = false;

        if wait {
            let deadline = tokio::time::Instant::now() + timeout;
            while !self.task_tokens.lock().is_empty() {
                if tokio::time::Instant::now() >= deadline {
                    warn!(pool = %self.name, "shutdown drain timed out, cancelling remaining tasks");
                    self.cancel_all();
                    let grace = Duration::from_millis(200);
                    tokio::time::sleep(grace.min(timeout)).await;
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        } else {
            self.cancel_all();
        }

        self.pool_token.cancel();
        *self.shut_down.lock() = true;
        debug!(pool = %self.name, "worker pool shut down");
        Ok(())
    }
}

/// Cleanup-only view into a pool's task-token map, handed to spawned
/// tasks so they can deregister themselves without holding a raw
/// reference to the pool across an `.await`.
struct TaskTokenRegistry {
    tokens: Arc<Mutex<HashMap<u64, CancellationToken>>>,
}

impl TaskTokenRegistry {
    fn remove(&self, task_id: u64) {
        self.tokens.lock().remove(&task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    #[tokio::test]
    async fn submit_before_start_fails_with_not_running() {
        let pool = WorkerPool::new("test", 2);
        let result = pool.submit("noop", |_token| async { 1 });
        assert!(matches!(result, Err(WorkerError::NotRunning(_))));
    }

    #[tokio::test]
    async fn completed_task_runs_to_completion() {
        let pool = WorkerPool::new("test", 2);
        pool.start().unwrap();
        let handle = pool.submit("add", |_token| async { 2 + 2 }).unwrap();
        match handle.join().await {
            TaskOutcome::Completed(value) => assert_eq!(value, 4),
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_before_start_never_runs_user_function() {
        let pool = WorkerPool::new("test", 1);
        pool.start().unwrap();
        let ran = Arc::new(StdAtomicUsize::new(0));
        let ran_clone = ran.clone();

        // Saturate the single worker so the next task queues behind it.
        let blocker = pool
            .submit("blocker", |token| async move {
                token.cancelled().await;
            })
            .unwrap();

        let handle = pool
            .submit("queued", move |_token| async move {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        handle.cancel();
        blocker.cancel();

        assert!(matches!(handle.join().await, TaskOutcome::Cancelled));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    /// Invariant 7 / scenario S5: shutdown(wait=true, timeout) returns
    /// within the timeout and every submitted task reaches a terminal
    /// outcome.
    #[tokio::test]
    async fn shutdown_drains_within_timeout_scenario_s5() {
        let pool = WorkerPool::new("previews", 4);
        pool.start().unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let handle = pool
                .submit("download", |token| async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::time::sleep(Duration::from_secs(30)) => {}
                    }
                })
                .unwrap();
            handles.push(handle);
        }

        let started = tokio::time::Instant::now();
        pool.shutdown(true, Duration::from_secs(5)).await.unwrap();
        assert!(started.elapsed() <= Duration::from_secs(6));

        let mut terminal = 0;
        for handle in handles {
            handle.join().await;
            terminal += 1;
        }
        assert_eq!(terminal, 50);
    }

    #[tokio::test]
    async fn cancel_all_reports_count_without_killing_pool() {
        let pool = WorkerPool::new("test", 2);
        pool.start().unwrap();
        let _h1 = pool.submit("a", |token| async move { token.cancelled().await }).unwrap();
        let _h2 = pool.submit("b", |token| async move { token.cancelled().await }).unwrap();
        let cancelled = pool.cancel_all();
        assert_eq!(cancelled, 2);

        // Pool keeps accepting work after a cancel_all, per §4.4.
        let handle = pool.submit("still-alive", |_token| async { 1 }).unwrap();
        assert!(matches!(handle.join().await, TaskOutcome::Completed(1)));
    }
}
