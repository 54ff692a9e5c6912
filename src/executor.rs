//! Executors that drive external tasks and promise continuations.
//!
//! A promise never schedules work itself. Every external task and every
//! continuation produced by a combinator is handed to an [`Executor`], which
//! decides where and when it runs. Adapters are provided for:
//!
//! - **tokio**: [`TokioExecutor`], spawning onto a runtime handle
//! - **futures thread pool**: [`ThreadPoolExecutor`]
//! - **plain threads**: [`ThreadPerTaskExecutor`], one OS thread per task
//!
//! Tasks that depend on a runtime's reactor or timers (for example
//! `tokio::time::sleep`) must run on that runtime's executor.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use futures::executor::ThreadPool;
use futures::future::BoxFuture;
use tokio::runtime::{Handle, Runtime};

use crate::config::{ExecutorConfig, DEFAULT_THREAD_NAME_PREFIX};
use crate::error::{Error, Result};

/// Scheduling seam between promises and the runtime that executes them.
///
/// Implementations must eventually poll every spawned task to completion or
/// drop it. A dropped task fails its promise with
/// [`Error::Abandoned`](crate::Error::Abandoned).
pub trait Executor: Send + Sync + 'static {
    /// Run `task` in the background.
    fn spawn(&self, task: BoxFuture<'static, ()>);

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

impl fmt::Debug for dyn Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Executor backed by a tokio runtime.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    // Keeps a runtime built by this executor alive.
    _runtime: Option<Arc<OwnedRuntime>>,
}

// Shuts down without blocking, so the last handle may be dropped anywhere,
// including on one of the runtime's own workers.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

impl TokioExecutor {
    /// Spawn onto the runtime behind `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            _runtime: None,
        }
    }

    /// The executor of the runtime the caller is running in, if any.
    pub fn current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Build and own a dedicated multi-threaded runtime.
    ///
    /// The runtime shuts down when the last clone of this executor is
    /// dropped; tasks still running then are abandoned.
    pub fn with_runtime(worker_threads: Option<usize>, thread_name_prefix: &str) -> Result<Self> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name(thread_name_prefix);
        if let Some(threads) = worker_threads {
            if threads == 0 {
                return Err(Error::Executor(
                    "worker_threads must be greater than zero".to_string(),
                ));
            }
            builder.worker_threads(threads);
        }
        let runtime = builder
            .build()
            .map_err(|e| Error::Executor(format!("failed to build tokio runtime: {}", e)))?;
        Ok(Self {
            handle: runtime.handle().clone(),
            _runtime: Some(Arc::new(OwnedRuntime(Some(runtime)))),
        })
    }

    /// The runtime handle tasks are spawned onto.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

impl Executor for TokioExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        // Detached: the promise, not the join handle, carries the outcome.
        drop(self.handle.spawn(task));
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}

impl fmt::Debug for TokioExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioExecutor")
            .field("owns_runtime", &self._runtime.is_some())
            .finish()
    }
}

/// Executor backed by a `futures` thread pool.
#[derive(Clone)]
pub struct ThreadPoolExecutor {
    pool: ThreadPool,
}

impl ThreadPoolExecutor {
    /// Create a pool. `worker_threads` defaults to the number of CPUs.
    pub fn new(worker_threads: Option<usize>, thread_name_prefix: &str) -> Result<Self> {
        let mut builder = ThreadPool::builder();
        builder.name_prefix(format!("{}-", thread_name_prefix));
        if let Some(threads) = worker_threads {
            if threads == 0 {
                return Err(Error::Executor(
                    "worker_threads must be greater than zero".to_string(),
                ));
            }
            builder.pool_size(threads);
        }
        let pool = builder
            .create()
            .map_err(|e| Error::Executor(format!("failed to build thread pool: {}", e)))?;
        Ok(Self { pool })
    }
}

impl Executor for ThreadPoolExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        self.pool.spawn_ok(task);
    }

    fn name(&self) -> &'static str {
        "thread-pool"
    }
}

impl fmt::Debug for ThreadPoolExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadPoolExecutor").finish_non_exhaustive()
    }
}

/// Executor that runs every task to completion on its own OS thread.
#[derive(Debug)]
pub struct ThreadPerTaskExecutor {
    thread_name_prefix: String,
    spawned: AtomicUsize,
}

impl ThreadPerTaskExecutor {
    /// Create an executor naming its threads `<prefix>-<n>`.
    pub fn new(thread_name_prefix: impl Into<String>) -> Self {
        Self {
            thread_name_prefix: thread_name_prefix.into(),
            spawned: AtomicUsize::new(0),
        }
    }
}

impl Executor for ThreadPerTaskExecutor {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        let n = self.spawned.fetch_add(1, Ordering::Relaxed);
        let spawned = std::thread::Builder::new()
            .name(format!("{}-{}", self.thread_name_prefix, n))
            .spawn(move || futures::executor::block_on(task));
        if let Err(err) = spawned {
            // The task was dropped with the closure; its promise is abandoned.
            tracing::warn!(error = %err, "failed to spawn promise thread");
        }
    }

    fn name(&self) -> &'static str {
        "thread-per-task"
    }
}

static FALLBACK: OnceLock<Arc<dyn Executor>> = OnceLock::new();

/// The executor used when none is given explicitly.
///
/// Inside a tokio runtime this is that runtime. Elsewhere it is a
/// process-wide executor built once from [`ExecutorConfig::from_env`],
/// falling back to [`ThreadPerTaskExecutor`] if that configuration cannot be
/// built.
pub fn default_executor() -> Arc<dyn Executor> {
    if let Some(tokio) = TokioExecutor::current() {
        return Arc::new(tokio);
    }
    FALLBACK.get_or_init(build_fallback).clone()
}

fn build_fallback() -> Arc<dyn Executor> {
    let config = ExecutorConfig::from_env();
    match config.build() {
        Ok(executor) => {
            tracing::debug!(executor = executor.name(), "initialized default executor");
            executor
        },
        Err(err) => {
            tracing::warn!(error = %err, "falling back to thread-per-task executor");
            Arc::new(ThreadPerTaskExecutor::new(DEFAULT_THREAD_NAME_PREFIX))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn run_on(executor: &dyn Executor) -> String {
        let (tx, rx) = mpsc::channel();
        executor.spawn(Box::pin(async move {
            let name = std::thread::current().name().unwrap_or_default().to_string();
            tx.send(name).unwrap();
        }));
        rx.recv_timeout(Duration::from_secs(5))
            .expect("task should run")
    }

    #[test]
    fn test_thread_pool_runs_tasks() {
        let executor = ThreadPoolExecutor::new(Some(2), "pool-test").unwrap();
        assert!(run_on(&executor).starts_with("pool-test-"));
        assert_eq!(executor.name(), "thread-pool");
    }

    #[test]
    fn test_thread_per_task_names_threads() {
        let executor = ThreadPerTaskExecutor::new("solo");
        assert_eq!(run_on(&executor), "solo-0");
        assert_eq!(run_on(&executor), "solo-1");
    }

    #[test]
    fn test_owned_tokio_runtime_runs_tasks() {
        let executor = TokioExecutor::with_runtime(Some(1), "rt-test").unwrap();
        assert_eq!(run_on(&executor), "rt-test");
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ThreadPoolExecutor::new(Some(0), "x"),
            Err(Error::Executor(_))
        ));
        assert!(matches!(
            TokioExecutor::with_runtime(Some(0), "x"),
            Err(Error::Executor(_))
        ));
    }

    #[test]
    fn test_current_outside_runtime_is_none() {
        assert!(TokioExecutor::current().is_none());
        // Outside a runtime the process-wide fallback is reused.
        let a = default_executor();
        let b = default_executor();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_default_executor_inside_runtime_is_tokio() {
        assert_eq!(default_executor().name(), "tokio");
    }
}
