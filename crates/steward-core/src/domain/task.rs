//! Task record: the durable unit of deferred work.
//!
//! Design:
//! - The store owns the record and its version token.
//! - The executor never treats an in-memory copy as ground truth; every
//!   transition goes through [`TaskMutation`] + compare-and-update.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ExecutorId, TaskId};

/// Property key holding the storage location a task operates on.
pub const LOCATION_PROPERTY: &str = "location";

/// Opaque discriminator used by handlers' capability checks.
/// The engine never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskKind(String);

impl TaskKind {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Change-tracking token. Bumped by the store on every successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version carried by a record that has not been persisted yet.
    pub const UNSET: Version = Version(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Persisted shape of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub kind: TaskKind,

    /// Task-specific parameters and target entity references.
    pub properties: BTreeMap<String, String>,

    /// Number of claims so far. Never decremented.
    pub attempt: u32,

    /// Executor that performed the latest claim, if any.
    pub assigned_executor: Option<ExecutorId>,

    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// A fresh, unclaimed record ready for `create_if_absent`.
    pub fn new(id: TaskId, kind: TaskKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            properties: BTreeMap::new(),
            attempt: 0,
            assigned_executor: None,
            version: Version::UNSET,
            created_at,
            updated_at: created_at,
            last_attempt_at: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.property(LOCATION_PROPERTY)
    }

    pub fn is_unclaimed(&self) -> bool {
        self.assigned_executor.is_none()
    }

    pub fn is_assigned_to(&self, executor: &ExecutorId) -> bool {
        self.assigned_executor.as_ref() == Some(executor)
    }

    /// Attempt number the next claim would commit. `None` once the counter is spent.
    pub fn next_attempt(&self) -> Option<u32> {
        self.attempt.checked_add(1)
    }

    /// Next state for a claim by `executor`: assignment set, attempt + 1.
    ///
    /// `None` when the attempt counter cannot advance; such a record can only
    /// be abandoned.
    pub fn claim_for(&self, executor: &ExecutorId, now: DateTime<Utc>) -> Option<TaskMutation> {
        Some(TaskMutation {
            properties: self.properties.clone(),
            attempt: self.next_attempt()?,
            assigned_executor: Some(executor.clone()),
            last_attempt_at: Some(now),
        })
    }

    /// Next state that keeps the record on `executor` without starting an
    /// attempt. Other executors stop listing it.
    pub fn hold_for(&self, executor: &ExecutorId) -> TaskMutation {
        TaskMutation {
            properties: self.properties.clone(),
            attempt: self.attempt,
            assigned_executor: Some(executor.clone()),
            last_attempt_at: self.last_attempt_at,
        }
    }

    /// Next state that clears the assignment. The attempt count is kept.
    pub fn release(&self) -> TaskMutation {
        TaskMutation {
            properties: self.properties.clone(),
            attempt: self.attempt,
            assigned_executor: None,
            last_attempt_at: self.last_attempt_at,
        }
    }
}

/// The mutable part of a record, written atomically by compare-and-update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMutation {
    pub properties: BTreeMap<String, String>,
    pub attempt: u32,
    pub assigned_executor: Option<ExecutorId>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl TaskMutation {
    /// Apply onto a stored record. Identity, kind and creation time are immutable.
    pub fn apply_to(self, record: &mut TaskRecord, now: DateTime<Utc>) {
        record.properties = self.properties;
        record.attempt = self.attempt;
        record.assigned_executor = self.assigned_executor;
        record.last_attempt_at = self.last_attempt_at;
        record.updated_at = now;
        record.version = record.version.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn executor(name: &str) -> ExecutorId {
        ExecutorId::new(name).unwrap()
    }

    #[test]
    fn new_record_is_unclaimed() {
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new("noop"), at(0));
        assert!(record.is_unclaimed());
        assert_eq!(record.attempt, 0);
        assert_eq!(record.version, Version::UNSET);
        assert_eq!(record.last_attempt_at, None);
    }

    #[test]
    fn claim_increments_attempt_and_assigns() {
        let record = TaskRecord::new(TaskId::new(1), TaskKind::new("noop"), at(0))
            .with_property(LOCATION_PROPERTY, "s3://bucket/t1");
        let me = executor("exec-a");

        let mutation = record.claim_for(&me, at(10)).unwrap();
        assert_eq!(mutation.attempt, 1);
        assert_eq!(mutation.assigned_executor, Some(me.clone()));
        assert_eq!(mutation.last_attempt_at, Some(at(10)));
        assert_eq!(
            mutation.properties.get(LOCATION_PROPERTY).map(String::as_str),
            Some("s3://bucket/t1")
        );
    }

    #[test]
    fn apply_bumps_version_and_keeps_identity() {
        let mut record = TaskRecord::new(TaskId::new(9), TaskKind::new("noop"), at(0));
        record.version = Version::new(3);
        let me = executor("exec-a");

        record.claim_for(&me, at(5)).unwrap().apply_to(&mut record, at(5));

        assert_eq!(record.id, TaskId::new(9));
        assert_eq!(record.version, Version::new(4));
        assert_eq!(record.updated_at, at(5));
        assert!(record.is_assigned_to(&me));
        assert_eq!(record.created_at, at(0));
    }

    #[test]
    fn release_keeps_attempt() {
        let mut record = TaskRecord::new(TaskId::new(1), TaskKind::new("noop"), at(0));
        let me = executor("exec-a");
        record.claim_for(&me, at(1)).unwrap().apply_to(&mut record, at(1));

        let released = record.release();
        assert_eq!(released.attempt, 1);
        assert_eq!(released.assigned_executor, None);
    }

    #[test]
    fn exhausted_attempt_counter_cannot_be_claimed() {
        let mut record = TaskRecord::new(TaskId::new(1), TaskKind::new("noop"), at(0));
        record.attempt = u32::MAX - 1;
        let me = executor("exec-a");

        assert_eq!(record.claim_for(&me, at(1)).map(|m| m.attempt), Some(u32::MAX));

        record.attempt = u32::MAX;
        assert_eq!(record.next_attempt(), None);
        assert!(record.claim_for(&me, at(2)).is_none());
    }

    #[test]
    fn hold_assigns_without_new_attempt() {
        let mut record = TaskRecord::new(TaskId::new(1), TaskKind::new("noop"), at(0));
        record.attempt = 3;
        record.last_attempt_at = Some(at(7));
        let me = executor("exec-a");

        let held = record.hold_for(&me);
        assert_eq!(held.attempt, 3);
        assert_eq!(held.assigned_executor, Some(me));
        assert_eq!(held.last_attempt_at, Some(at(7)));
    }
}
