//! StaticIoProvisioner - 固定の資格情報を期限付きで払い出す
//!
//! 本番では資格情報の発行サービスに置き換える。ここでは TTL と
//! 拒否するロケーション prefix だけを設定できる。

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::ProvisionError;
use crate::domain::task::TaskRecord;
use crate::ports::{Clock, IoProvisioner, ScopedIo};

pub struct StaticIoProvisioner {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    credentials: BTreeMap<String, String>,
    denied_prefixes: Vec<String>,
}

impl StaticIoProvisioner {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            clock,
            ttl,
            credentials: BTreeMap::new(),
            denied_prefixes: Vec::new(),
        }
    }

    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    /// Refuse access to any location starting with `prefix`.
    pub fn deny_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.denied_prefixes.push(prefix.into());
        self
    }
}

#[async_trait]
impl IoProvisioner for StaticIoProvisioner {
    async fn provision(&self, task: &TaskRecord) -> Result<ScopedIo, ProvisionError> {
        let location = task.location().ok_or(ProvisionError::MissingLocation)?;
        if let Some(prefix) = self
            .denied_prefixes
            .iter()
            .find(|prefix| location.starts_with(prefix.as_str()))
        {
            return Err(ProvisionError::Denied(format!(
                "{location} is under denied prefix {prefix}"
            )));
        }

        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let now = self.clock.now();
        Ok(ScopedIo {
            location: location.to_string(),
            credentials: self.credentials.clone(),
            expires_at: now.checked_add_signed(ttl).unwrap_or(now),
        })
    }
}
