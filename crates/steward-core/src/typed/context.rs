//! TaskContext - handler に渡す実行コンテキスト

use std::fmt;
use std::sync::Arc;

use crate::domain::errors::ProvisionError;
use crate::domain::ids::ExecutorId;
use crate::domain::task::TaskRecord;
use crate::ports::{Clock, IoProvisioner, ScopedIo};

/// Capabilities available to a handler while it runs one attempt.
#[derive(Clone)]
pub struct TaskContext {
    executor_id: ExecutorId,
    io: Arc<dyn IoProvisioner>,
    clock: Arc<dyn Clock>,
}

impl TaskContext {
    pub fn new(executor_id: ExecutorId, io: Arc<dyn IoProvisioner>, clock: Arc<dyn Clock>) -> Self {
        Self {
            executor_id,
            io,
            clock,
        }
    }

    /// Identity of the executor running this attempt.
    pub fn executor_id(&self) -> &ExecutorId {
        &self.executor_id
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Scoped storage access for `task`'s target location.
    ///
    /// A grant that is already expired when it arrives is rejected here so
    /// handlers never start I/O with dead credentials.
    pub async fn scoped_io(&self, task: &TaskRecord) -> Result<ScopedIo, ProvisionError> {
        let io = self.io.provision(task).await?;
        if io.is_expired(self.clock.now()) {
            return Err(ProvisionError::Expired);
        }
        Ok(io)
    }
}

impl fmt::Debug for TaskContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskContext")
            .field("executor_id", &self.executor_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::TaskId;
    use crate::domain::task::{LOCATION_PROPERTY, TaskKind};
    use crate::impls::StaticIoProvisioner;
    use crate::ports::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn context(ttl: Duration, clock: Arc<FixedClock>) -> TaskContext {
        let io = StaticIoProvisioner::new(clock.clone(), ttl).with_credential("token", "abc");
        TaskContext::new(ExecutorId::new("exec-a").unwrap(), Arc::new(io), clock)
    }

    #[tokio::test]
    async fn scoped_io_returns_grant_for_location() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let ctx = context(Duration::from_secs(60), clock.clone());
        let task = TaskRecord::new(TaskId::new(1), TaskKind::new("cleanup"), clock.now())
            .with_property(LOCATION_PROPERTY, "s3://bucket/table");

        let io = ctx.scoped_io(&task).await.unwrap();
        assert_eq!(io.location, "s3://bucket/table");
        assert_eq!(io.credential("token"), Some("abc"));
    }

    #[tokio::test]
    async fn scoped_io_rejects_expired_grant() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let ctx = context(Duration::ZERO, clock.clone());
        let task = TaskRecord::new(TaskId::new(1), TaskKind::new("cleanup"), clock.now())
            .with_property(LOCATION_PROPERTY, "s3://bucket/table");

        assert_eq!(ctx.scoped_io(&task).await, Err(ProvisionError::Expired));
    }

    #[tokio::test]
    async fn scoped_io_requires_location() {
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let ctx = context(Duration::from_secs(60), clock.clone());
        let task = TaskRecord::new(TaskId::new(1), TaskKind::new("cleanup"), clock.now());

        assert_eq!(
            ctx.scoped_io(&task).await,
            Err(ProvisionError::MissingLocation)
        );
    }
}
