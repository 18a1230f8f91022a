//! Domain identifiers (strongly-typed IDs).
//!
//! - `TaskId`: ストアが採番する数値 ID。再利用されない。
//! - `ExecutorId`: executor プロセスの名前。claim のたびに明示的に渡す。
//! - `EventId`: 監査イベント用の ULID。時刻でソート可能。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::errors::ConfigError;

/// Identifier of a task record, unique within its catalog scope.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(u64);

impl TaskId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Identity of one executor process.
///
/// 空文字や空白だけの名前は受け付けない（claim の所有者として区別できないため）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ExecutorId(String);

impl ExecutorId {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::MissingExecutorId);
        }
        if trimmed.len() != value.len() || value.chars().any(char::is_control) {
            return Err(ConfigError::InvalidExecutorId(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ExecutorId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ExecutorId> for String {
    fn from(id: ExecutorId) -> Self {
        id.0
    }
}

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifier of an audit event written through the store.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Ulid);

impl EventId {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for EventId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn task_id_displays_with_prefix() {
        assert_eq!(TaskId::new(42).to_string(), "task-42");
        assert_eq!(TaskId::from(7).get(), 7);
    }

    #[test]
    fn task_ids_order_numerically() {
        assert!(TaskId::new(2) < TaskId::new(10));
    }

    #[rstest]
    #[case::empty("")]
    #[case::blank("   ")]
    fn executor_id_rejects_missing_name(#[case] raw: &str) {
        assert!(matches!(
            ExecutorId::new(raw),
            Err(ConfigError::MissingExecutorId)
        ));
    }

    #[rstest]
    #[case::padded(" exec-1")]
    #[case::newline("exec\n1")]
    fn executor_id_rejects_malformed_name(#[case] raw: &str) {
        assert!(matches!(
            ExecutorId::new(raw),
            Err(ConfigError::InvalidExecutorId(_))
        ));
    }

    #[test]
    fn executor_id_deserialization_validates() {
        let ok: ExecutorId = serde_json::from_str("\"exec-a\"").unwrap();
        assert_eq!(ok.as_str(), "exec-a");

        let err = serde_json::from_str::<ExecutorId>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn event_ids_are_sortable() {
        let id1 = EventId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = EventId::from_ulid(Ulid::new());

        assert!(id1 < id2);
        assert!(id1.to_string().starts_with("event-"));
    }
}
