//! Events - タスク試行のライフサイクルイベント
//!
//! イベントは観測専用。claim / retry / delete の判断には一切使わない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{EventId, ExecutorId, TaskId};

/// Notification surfaced to an [`crate::ports::EventSink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Emitted immediately before the handler is invoked.
    BeforeAttempt { task_id: TaskId, attempt: u32 },

    /// Emitted after the handler returns, faults, or no handler is found.
    AfterAttempt {
        task_id: TaskId,
        attempt: u32,
        success: bool,
    },
}

impl TaskEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskEvent::BeforeAttempt { task_id, .. } | TaskEvent::AfterAttempt { task_id, .. } => {
                *task_id
            }
        }
    }

    pub fn attempt(&self) -> u32 {
        match self {
            TaskEvent::BeforeAttempt { attempt, .. } | TaskEvent::AfterAttempt { attempt, .. } => {
                *attempt
            }
        }
    }
}

/// A task event wrapped for the store's audit log (`write_events`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: EventId,
    pub executor_id: ExecutorId,
    pub emitted_at: DateTime<Utc>,
    pub event: AuditKind,
}

/// What an audit entry records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditKind {
    Attempt(TaskEvent),
    /// The attempt policy gave up on a task and it was removed.
    Abandoned {
        task_id: TaskId,
        attempt: u32,
        reason: String,
    },
    /// A stale assignment held by another executor was cleared.
    Released {
        task_id: TaskId,
        previous_executor: ExecutorId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = TaskEvent::AfterAttempt {
            task_id: TaskId::new(3),
            attempt: 2,
            success: true,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["type"], "after_attempt");
        assert_eq!(v["task_id"], 3);
        assert_eq!(v["success"], true);
    }

    #[test]
    fn accessors_cover_both_shapes() {
        let before = TaskEvent::BeforeAttempt {
            task_id: TaskId::new(1),
            attempt: 4,
        };
        assert_eq!(before.task_id(), TaskId::new(1));
        assert_eq!(before.attempt(), 4);
    }
}
