//! EventSink 実装
//!
//! - **RecordingEventSink**: テスト用。受け取った順に保持する
//! - **TracingEventSink**: 構造化ログに流す
//! - **StoreEventSink**: ストアの監査ログ（`write_events`）に書く
//! - **FanoutEventSink**: 複数の sink に配る

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::info;

use crate::domain::errors::{EventSinkError, StoreError};
use crate::domain::events::{AuditEvent, AuditKind, TaskEvent};
use crate::domain::ids::ExecutorId;
use crate::ports::{Clock, EventSink, IdGenerator, TaskStore};

/// Keeps every event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<TaskEvent>>,
    reject: bool,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records events but reports every delivery as failed.
    pub fn rejecting() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            reject: true,
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vec<TaskEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.guard().clone()
    }

    pub fn latest_before(&self) -> Option<TaskEvent> {
        self.guard()
            .iter()
            .rev()
            .find(|event| matches!(event, TaskEvent::BeforeAttempt { .. }))
            .cloned()
    }

    pub fn latest_after(&self) -> Option<TaskEvent> {
        self.guard()
            .iter()
            .rev()
            .find(|event| matches!(event, TaskEvent::AfterAttempt { .. }))
            .cloned()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn on_event(&self, event: &TaskEvent) -> Result<(), EventSinkError> {
        self.guard().push(event.clone());
        if self.reject {
            return Err(EventSinkError::Rejected("recording sink set to reject".to_string()));
        }
        Ok(())
    }
}

/// Writes one log line per event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn on_event(&self, event: &TaskEvent) -> Result<(), EventSinkError> {
        match event {
            TaskEvent::BeforeAttempt { task_id, attempt } => {
                info!(%task_id, attempt, "before task attempt");
            }
            TaskEvent::AfterAttempt {
                task_id,
                attempt,
                success,
            } => {
                info!(%task_id, attempt, success, "after task attempt");
            }
        }
        Ok(())
    }
}

/// Appends events to the store's audit log on behalf of one executor.
#[derive(Clone)]
pub struct StoreEventSink {
    store: Arc<dyn TaskStore>,
    executor_id: ExecutorId,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl StoreEventSink {
    pub fn new(
        store: Arc<dyn TaskStore>,
        executor_id: ExecutorId,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            executor_id,
            ids,
            clock,
        }
    }

    /// Write one audit entry.
    pub async fn record(&self, kind: AuditKind) -> Result<(), StoreError> {
        let event = AuditEvent {
            id: self.ids.generate_event_id(),
            executor_id: self.executor_id.clone(),
            emitted_at: self.clock.now(),
            event: kind,
        };
        self.store.write_events(vec![event]).await
    }
}

#[async_trait]
impl EventSink for StoreEventSink {
    async fn on_event(&self, event: &TaskEvent) -> Result<(), EventSinkError> {
        self.record(AuditKind::Attempt(event.clone())).await?;
        Ok(())
    }
}

/// Delivers to every inner sink; a failing sink does not stop the others.
#[derive(Clone, Default)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanoutEventSink {
    async fn on_event(&self, event: &TaskEvent) -> Result<(), EventSinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.on_event(event).await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
