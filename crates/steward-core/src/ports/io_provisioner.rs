//! IoProvisioner port - 期限付きストレージアクセスの払い出し
//!
//! handler はタスクの対象ロケーションに対して、期限付きの資格情報を
//! このポート経由で受け取る。実際のストレージ I/O 実装は範囲外。

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::ProvisionError;
use crate::domain::task::TaskRecord;

/// Time-boxed storage access for one task's target location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedIo {
    pub location: String,
    pub credentials: BTreeMap<String, String>,
    pub expires_at: DateTime<Utc>,
}

impl ScopedIo {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }
}

/// Supplies scoped storage access for a task's target entity.
#[async_trait]
pub trait IoProvisioner: Send + Sync {
    async fn provision(&self, task: &TaskRecord) -> Result<ScopedIo, ProvisionError>;
}

/// Refuses every request. Used when no storage access is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIoProvisioner;

#[async_trait]
impl IoProvisioner for NoIoProvisioner {
    async fn provision(&self, _task: &TaskRecord) -> Result<ScopedIo, ProvisionError> {
        Err(ProvisionError::Denied(
            "no storage access is configured for this executor".to_string(),
        ))
    }
}
