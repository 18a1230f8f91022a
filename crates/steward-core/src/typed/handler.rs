//! Handler trait - タスクを実行する handler の定義
//!
//! # 二層構造
//! - **表層（Typed）**: `Handler<T>` - payload を型付きで受け取る
//! - **内部（Dyn）**: `TaskHandler` - object-safe、registry に格納される
//!
//! `TypedHandler<T, H>` が型消去の橋渡しをする。

use std::marker::PhantomData;

use async_trait::async_trait;

use super::context::TaskContext;
use super::task::Task;
use crate::domain::errors::HandlerError;
use crate::domain::task::TaskRecord;

/// Object-safe handler stored in the [`super::HandlerRegistry`].
///
/// `handle` returns `Ok(true)` only on definitive success. `Ok(false)`, an
/// error, or a panic are all recorded as a failed attempt and the task stays
/// in the store for a later claim, so implementations must be idempotent.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Capability check used for first-match dispatch.
    fn can_handle(&self, task: &TaskRecord) -> bool;

    async fn handle(&self, task: &TaskRecord, ctx: &TaskContext) -> Result<bool, HandlerError>;
}

/// Handler for one typed task kind.
///
/// # 使用例
/// ```ignore
/// struct CleanupHandler;
///
/// #[async_trait]
/// impl Handler<DropTableCleanup> for CleanupHandler {
///     async fn handle(&self, task: DropTableCleanup, record: &TaskRecord, ctx: &TaskContext)
///         -> Result<bool, HandlerError>
///     {
///         let io = ctx.scoped_io(record).await?;
///         // delete files under task.location ...
///         Ok(true)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(
        &self,
        task: T,
        record: &TaskRecord,
        ctx: &TaskContext,
    ) -> Result<bool, HandlerError>;
}

/// Adapts a `Handler<T>` into a [`TaskHandler`] matching `T::KIND`.
pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> TaskHandler for TypedHandler<T, H> {
    fn name(&self) -> &str {
        T::KIND
    }

    fn can_handle(&self, task: &TaskRecord) -> bool {
        task.kind.as_str() == T::KIND
    }

    async fn handle(&self, task: &TaskRecord, ctx: &TaskContext) -> Result<bool, HandlerError> {
        let payload = T::decode(task)?;
        self.handler.handle(payload, task, ctx).await
    }
}


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::fixtures::CleanupHandler;
    use super::*;
    use crate::domain::ids::{ExecutorId, TaskId};
    use crate::domain::task::TaskKind;
    use crate::impls::StaticIoProvisioner;
    use crate::ports::SystemClock;
    use crate::typed::task::fixtures::CleanupTask;
    use chrono::Utc;
    use std::time::Duration;

    fn ctx() -> TaskContext {
        let clock = Arc::new(SystemClock);
        TaskContext::new(
            ExecutorId::new("exec-a").unwrap(),
            Arc::new(StaticIoProvisioner::new(clock.clone(), Duration::from_secs(60))),
            clock,
        )
    }

    #[test]
    fn typed_handler_matches_only_its_kind() {
        let handler = TypedHandler::<CleanupTask, _>::new(CleanupHandler);
        let matching = TaskRecord::new(TaskId::new(1), TaskKind::new(CleanupTask::KIND), Utc::now());
        let other = TaskRecord::new(TaskId::new(2), TaskKind::new("other"), Utc::now());

        assert!(handler.can_handle(&matching));
        assert!(!handler.can_handle(&other));
        assert_eq!(handler.name(), CleanupTask::KIND);
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_runs() {
        let handler = TypedHandler::<CleanupTask, _>::new(CleanupHandler);
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new(CleanupTask::KIND), Utc::now())
            .with_property("location", "s3://bucket/t");

        assert!(handler.handle(&record, &ctx()).await.unwrap());
    }

    #[tokio::test]
    async fn typed_handler_surfaces_decode_errors() {
        let handler = TypedHandler::<CleanupTask, _>::new(CleanupHandler);
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new(CleanupTask::KIND), Utc::now());

        let result = handler.handle(&record, &ctx()).await;
        assert!(matches!(result, Err(HandlerError::Decode(_))));
    }
}
