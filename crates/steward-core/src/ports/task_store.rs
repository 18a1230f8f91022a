//! TaskStore port - メタデータストアが実装する正本（source of truth）
//!
//! executor がストアに要求する最小限の操作だけを定義する。
//! 一般的なエンティティ CRUD や権限モデルはこの境界の外側。
//!
//! # 設計原則
//! - タスク状態の変更経路は `compare_and_update` のみ
//! - 所有権（assignment）と attempt の増加は同一の書き込みでコミットされる
//! - すべての状態はストアから再構築可能（executor はキャッシュを正本扱いしない）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::StoreError;
use crate::domain::events::AuditEvent;
use crate::domain::ids::{ExecutorId, TaskId};
use crate::domain::task::{TaskMutation, TaskRecord, Version};

/// Opaque cursor returned by a listing call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Where a listing starts and how many records it may return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub token: Option<PageToken>,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { token: None, limit }
    }

    pub fn after(token: PageToken, limit: usize) -> Self {
        Self {
            token: Some(token),
            limit,
        }
    }
}

/// One page of a listing. `next` is `None` on the last page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageToken>,
}

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateResult {
    /// `false` when a record with the same id already existed.
    pub created: bool,
    /// The record as stored after the call.
    pub current: TaskRecord,
}

/// Contract the task engine needs from the metadata store.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Globally unique id. Monotonic ordering is not required.
    async fn generate_id(&self) -> Result<TaskId, StoreError>;

    /// Idempotent create. Returns the existing record when the id is taken.
    async fn create_if_absent(&self, record: TaskRecord) -> Result<CreateResult, StoreError>;

    /// Change-tracking read: the current record including its version.
    async fn load(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError>;

    /// Records that are unassigned or already assigned to `executor`.
    ///
    /// Ordering must be stable across pages so that repeated polling
    /// eventually observes every outstanding task.
    async fn list_assigned_or_unclaimed(
        &self,
        executor: &ExecutorId,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, StoreError>;

    /// Every task record regardless of assignment. Only the reaper uses this.
    async fn list_tasks(&self, page: PageRequest) -> Result<Page<TaskRecord>, StoreError>;

    /// The optimistic-claim primitive.
    ///
    /// Returns `Ok(false)` without mutating anything when the stored version
    /// differs from `expected` or the record is gone.
    async fn compare_and_update(
        &self,
        id: TaskId,
        expected: Version,
        next: TaskMutation,
    ) -> Result<bool, StoreError>;

    /// Returns `false` when the record did not exist.
    async fn delete(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Best-effort append to the audit log.
    async fn write_events(&self, events: Vec<AuditEvent>) -> Result<(), StoreError>;
}
