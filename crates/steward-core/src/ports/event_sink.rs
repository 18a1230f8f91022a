//! EventSink port - イベント記録の抽象化
//!
//! # 設計原則
//! - fire-and-forget: sink のエラーは executor がログに残して捨てる
//! - 制御フローの判断材料にしない（観測とテストのためだけ）

use async_trait::async_trait;

use crate::domain::errors::EventSinkError;
use crate::domain::events::TaskEvent;

/// EventSink は before/after-attempt 通知を受け取る
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn on_event(&self, event: &TaskEvent) -> Result<(), EventSinkError>;
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn on_event(&self, _event: &TaskEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}
