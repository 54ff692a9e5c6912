//! Configuration for the process-wide default executor.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::executor::{Executor, ThreadPerTaskExecutor, ThreadPoolExecutor, TokioExecutor};

/// Thread name prefix used when none is configured.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "evently-promise";

/// Environment variable selecting the executor kind.
pub const ENV_EXECUTOR: &str = "EVENTLY_PROMISE_EXECUTOR";
/// Environment variable setting the worker thread count.
pub const ENV_WORKER_THREADS: &str = "EVENTLY_PROMISE_WORKER_THREADS";
/// Environment variable setting the thread name prefix.
pub const ENV_THREAD_PREFIX: &str = "EVENTLY_PROMISE_THREAD_PREFIX";

/// Which executor adapter to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutorKind {
    /// A dedicated multi-threaded tokio runtime.
    Tokio,
    /// A `futures` thread pool.
    #[default]
    ThreadPool,
    /// One OS thread per task.
    ThreadPerTask,
}

impl std::str::FromStr for ExecutorKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tokio" => Ok(Self::Tokio),
            "thread-pool" | "threadpool" => Ok(Self::ThreadPool),
            "thread-per-task" => Ok(Self::ThreadPerTask),
            other => Err(Error::Config(format!("unknown executor kind: {}", other))),
        }
    }
}

/// Executor settings.
///
/// Used to build the fallback executor for promises created outside a tokio
/// runtime. Usually left at its defaults or set through the environment.
///
/// # Example Configuration File
///
/// ```toml
/// kind = "thread-pool"
/// worker_threads = 4
/// thread_name_prefix = "evently-sync"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Executor adapter to build.
    #[serde(default)]
    pub kind: ExecutorKind,

    /// Worker thread count. Defaults to the number of CPUs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_threads: Option<usize>,

    /// Prefix for worker thread names.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
}

fn default_thread_name_prefix() -> String {
    DEFAULT_THREAD_NAME_PREFIX.to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            kind: ExecutorKind::default(),
            worker_threads: None,
            thread_name_prefix: default_thread_name_prefix(),
        }
    }
}

impl ExecutorConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(Into::into)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from environment variables.
    ///
    /// - `EVENTLY_PROMISE_EXECUTOR` - `tokio`, `thread-pool` or `thread-per-task`
    /// - `EVENTLY_PROMISE_WORKER_THREADS` - worker thread count
    /// - `EVENTLY_PROMISE_THREAD_PREFIX` - thread name prefix
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(kind) = lookup(ENV_EXECUTOR) {
            match kind.parse() {
                Ok(kind) => config.kind = kind,
                Err(err) => tracing::warn!(error = %err, "ignoring {}", ENV_EXECUTOR),
            }
        }
        if let Some(threads) = lookup(ENV_WORKER_THREADS) {
            match threads.trim().parse::<usize>() {
                Ok(n) => config.worker_threads = Some(n),
                Err(err) => tracing::warn!(error = %err, "ignoring {}", ENV_WORKER_THREADS),
            }
        }
        if let Some(prefix) = lookup(ENV_THREAD_PREFIX) {
            if !prefix.is_empty() {
                config.thread_name_prefix = prefix;
            }
        }

        config
    }

    /// Set the executor kind.
    pub fn with_kind(mut self, kind: ExecutorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the worker thread count.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    /// Build the configured executor.
    pub fn build(&self) -> Result<Arc<dyn Executor>> {
        let executor: Arc<dyn Executor> = match self.kind {
            ExecutorKind::Tokio => Arc::new(TokioExecutor::with_runtime(
                self.worker_threads,
                &self.thread_name_prefix,
            )?),
            ExecutorKind::ThreadPool => Arc::new(ThreadPoolExecutor::new(
                self.worker_threads,
                &self.thread_name_prefix,
            )?),
            ExecutorKind::ThreadPerTask => {
                Arc::new(ThreadPerTaskExecutor::new(self.thread_name_prefix.clone()))
            },
        };
        Ok(executor)
    }
}
