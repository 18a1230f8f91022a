//! Errors - エラー型と分類
//!
//! 競合負け（compare-and-update が false）はエラーではないので、ここには現れない。

/// Errors surfaced by a [`crate::ports::TaskStore`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or rejected the call for infrastructure reasons.
    #[error("task store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed page token {0:?}")]
    InvalidPageToken(String),
}

/// Errors raised while provisioning scoped storage access for a handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProvisionError {
    #[error("task has no target location property")]
    MissingLocation,

    #[error("storage access denied: {0}")]
    Denied(String),

    #[error("scoped storage access has expired")]
    Expired,
}

/// Errors a handler may return. The executor converts every one of them into a
/// failed attempt; none of them escape the dispatch boundary.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("payload decode: {0}")]
    Decode(String),

    #[error(transparent)]
    Io(#[from] ProvisionError),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors returned by an [`crate::ports::EventSink`]. Logged, never acted upon.
#[derive(Debug, thiserror::Error)]
pub enum EventSinkError {
    #[error("event rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Startup configuration errors. These are the only fatal errors in the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("executor identity is required")]
    MissingExecutorId,

    #[error("invalid executor identity {0:?}")]
    InvalidExecutorId(String),

    #[error("page_size must be greater than zero")]
    ZeroPageSize,

    #[error("poll_interval_ms must be greater than zero")]
    ZeroPollInterval,

    #[error("config parse: {0}")]
    Parse(String),

    #[error("config read: {0}")]
    Io(String),
}

/// Errors from building or starting an executor.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no handler registered for expected task kinds: {0:?}")]
    MissingHandlers(Vec<String>),

    #[error("executor control loop is already running")]
    AlreadyRunning,
}
