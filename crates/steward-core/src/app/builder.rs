//! ExecutorBuilder - executor の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - build() で設定を検証する（executor_id 不在なら最初の poll より前に失敗）
//! - expect_kinds() で指定した kind に handler が無ければ失敗

use std::sync::Arc;

use super::config::ExecutorConfig;
use super::executor::{ExecutorParts, TaskExecutor};
use super::policy::{AttemptPolicy, RetryPolicy};
use crate::domain::errors::ExecutorError;
use crate::domain::ids::TaskId;
use crate::domain::task::{TaskKind, TaskRecord};
use crate::impls::StoreEventSink;
use crate::ports::{
    Clock, EventSink, IdGenerator, IoProvisioner, NoIoProvisioner, NoopEventSink, SystemClock,
    TaskStore, UlidGenerator,
};
use crate::typed::{Handler, HandlerRegistry, Task, TaskHandler};

/// Wires an executor from a config, a store and optional collaborators.
///
/// # 使用例
/// ```ignore
/// let executor = ExecutorBuilder::new(config, store)
///     .event_sink(Arc::new(TracingEventSink))
///     .typed_handler::<TableCleanup, _>(CleanupHandler)
///     .expect_kinds(&[TableCleanup::KIND])
///     .build()?;
/// ```
///
/// Defaults: no-op event sink, system clock, no I/O provisioner, ULID event
/// ids, and a retry policy that claims immediately and never gives up.
pub struct ExecutorBuilder {
    config: ExecutorConfig,
    store: Arc<dyn TaskStore>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    io: Option<Arc<dyn IoProvisioner>>,
    ids: Option<Arc<dyn IdGenerator>>,
    attempt_policy: Option<Arc<dyn AttemptPolicy>>,
    handlers: HandlerRegistry,
    expected_kinds: Vec<String>,
}

impl ExecutorBuilder {
    pub fn new(config: ExecutorConfig, store: Arc<dyn TaskStore>) -> Self {
        Self {
            config,
            store,
            sink: None,
            clock: None,
            io: None,
            ids: None,
            attempt_policy: None,
            handlers: HandlerRegistry::new(),
            expected_kinds: Vec::new(),
        }
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn io_provisioner(mut self, io: Arc<dyn IoProvisioner>) -> Self {
        self.io = Some(io);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn attempt_policy(mut self, policy: Arc<dyn AttemptPolicy>) -> Self {
        self.attempt_policy = Some(policy);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.register(handler);
        self
    }

    pub fn typed_handler<T: Task, H: Handler<T> + 'static>(mut self, handler: H) -> Self {
        self.handlers.register_typed::<T, H>(handler);
        self
    }

    /// Kinds that must have a handler at build time.
    pub fn expect_kinds(mut self, kinds: &[&str]) -> Self {
        self.expected_kinds = kinds.iter().map(|kind| kind.to_string()).collect();
        self
    }

    pub fn build(self) -> Result<TaskExecutor, ExecutorError> {
        let config = self.config.validate()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        // capability check は record 単位なので、kind だけのダミー record で確かめる
        let missing: Vec<String> = self
            .expected_kinds
            .into_iter()
            .filter(|kind| {
                let sample = TaskRecord::new(TaskId::new(0), TaskKind::new(kind.as_str()), clock.now());
                self.handlers.find(&sample).is_none()
            })
            .collect();
        if !missing.is_empty() {
            return Err(ExecutorError::MissingHandlers(missing));
        }

        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        let audit = StoreEventSink::new(
            self.store.clone(),
            config.executor_id().clone(),
            ids,
            clock.clone(),
        );

        Ok(TaskExecutor::from_parts(ExecutorParts {
            config,
            store: self.store,
            sink: self.sink.unwrap_or_else(|| Arc::new(NoopEventSink)),
            audit,
            clock,
            io: self.io.unwrap_or_else(|| Arc::new(NoIoProvisioner)),
            handlers: self.handlers,
            attempt_policy: self
                .attempt_policy
                .unwrap_or_else(|| Arc::new(RetryPolicy::default())),
        }))
    }
}
