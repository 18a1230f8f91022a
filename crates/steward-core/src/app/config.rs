//! Executor configuration.
//!
//! `ExecutorConfig` is what gets deserialized; `ValidatedConfig` is what the
//! executor accepts. Validation happens once at startup so a missing identity
//! fails before any poll cycle begins.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::errors::ConfigError;
use crate::domain::ids::ExecutorId;

/// Raw executor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Identity used in every claim. Required.
    pub executor_id: Option<String>,

    pub poll_interval_ms: u64,

    /// Upper bound of the random delay added to each poll interval.
    pub poll_jitter_ms: u64,

    /// Records requested per listing call.
    pub page_size: usize,

    /// Concurrent handler executions. `0` runs handlers inline on the control loop.
    pub worker_concurrency: usize,

    /// How long shutdown waits for in-flight attempts before aborting them.
    pub drain_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            executor_id: None,
            poll_interval_ms: 1_000,
            poll_jitter_ms: 0,
            page_size: 100,
            worker_concurrency: 4,
            drain_timeout_ms: 30_000,
        }
    }
}

impl ExecutorConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_executor_id(mut self, executor_id: impl Into<String>) -> Self {
        self.executor_id = Some(executor_id.into());
        self
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let executor_id = match self.executor_id.as_deref() {
            Some(raw) => ExecutorId::new(raw)?,
            None => return Err(ConfigError::MissingExecutorId),
        };
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        let worker_mode = match NonZeroUsize::new(self.worker_concurrency) {
            Some(n) => WorkerMode::Pool(n),
            None => WorkerMode::Inline,
        };

        Ok(ValidatedConfig {
            executor_id,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_jitter: Duration::from_millis(self.poll_jitter_ms),
            page_size: self.page_size,
            worker_mode,
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        })
    }
}

/// How claimed tasks are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerMode {
    /// Same-task execution on the control loop. Deterministic; meant for tests.
    Inline,
    /// Up to `n` attempts run concurrently on spawned tasks.
    Pool(NonZeroUsize),
}

/// Checked configuration. Only obtainable through [`ExecutorConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    executor_id: ExecutorId,
    poll_interval: Duration,
    poll_jitter: Duration,
    page_size: usize,
    worker_mode: WorkerMode,
    drain_timeout: Duration,
}

impl ValidatedConfig {
    pub fn executor_id(&self) -> &ExecutorId {
        &self.executor_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn poll_jitter(&self) -> Duration {
        self.poll_jitter
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn worker_mode(&self) -> WorkerMode {
        self.worker_mode
    }

    pub fn drain_timeout(&self) -> Duration {
        self.drain_timeout
    }
}
