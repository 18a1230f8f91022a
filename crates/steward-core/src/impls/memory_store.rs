//! InMemoryTaskStore - 開発・テスト用の正本
//!
//! # 実装詳細
//! - BTreeMap<TaskId, TaskRecord> で id 順を安定させる（ページングが安定する）
//! - tokio::sync::Mutex で排他制御（1 回の compare-and-update は 1 回のロック内で完結）
//! - 書き込みのたびに version を進める
//! - テスト用に障害注入（list / update / write_events の失敗）を持つ

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::errors::StoreError;
use crate::domain::events::AuditEvent;
use crate::domain::ids::{ExecutorId, TaskId};
use crate::domain::task::{TaskMutation, TaskRecord, Version};
use crate::ports::{Clock, CreateResult, Page, PageRequest, PageToken, TaskStore};

#[derive(Default)]
struct StoreState {
    records: BTreeMap<TaskId, TaskRecord>,
    next_id: u64,
    audit: Vec<AuditEvent>,
    failing_lists: u32,
    failing_updates: u32,
    failing_event_writes: bool,
}

impl StoreState {
    fn allocate_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId::new(self.next_id)
    }

    fn take_list_fault(&mut self) -> Result<(), StoreError> {
        if self.failing_lists > 0 {
            self.failing_lists -= 1;
            return Err(StoreError::Unavailable("injected list failure".to_string()));
        }
        Ok(())
    }

    fn page<F>(&self, request: &PageRequest, include: F) -> Result<Page<TaskRecord>, StoreError>
    where
        F: Fn(&TaskRecord) -> bool,
    {
        let after = match &request.token {
            Some(token) => Some(decode_token(token)?),
            None => None,
        };
        let limit = request.limit.max(1);

        let mut items: Vec<TaskRecord> = self
            .records
            .values()
            .filter(|record| after.is_none_or(|after| record.id > after))
            .filter(|record| include(record))
            .take(limit + 1)
            .cloned()
            .collect();

        let next = if items.len() > limit {
            items.truncate(limit);
            items.last().map(|record| encode_token(record.id))
        } else {
            None
        };

        Ok(Page { items, next })
    }
}

fn encode_token(id: TaskId) -> PageToken {
    PageToken::new(id.get().to_string())
}

fn decode_token(token: &PageToken) -> Result<TaskId, StoreError> {
    token
        .as_str()
        .parse::<u64>()
        .map(TaskId::new)
        .map_err(|_| StoreError::InvalidPageToken(token.as_str().to_string()))
}

/// In-memory implementation of the full [`TaskStore`] contract.
pub struct InMemoryTaskStore {
    state: Arc<Mutex<StoreState>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            clock,
        }
    }

    /// Make the next `n` listing calls fail with `StoreError::Unavailable`.
    pub async fn fail_next_lists(&self, n: u32) {
        self.state.lock().await.failing_lists = n;
    }

    /// Make the next `n` compare-and-update calls fail with `StoreError::Unavailable`.
    pub async fn fail_next_updates(&self, n: u32) {
        self.state.lock().await.failing_updates = n;
    }

    pub async fn fail_event_writes(&self, failing: bool) {
        self.state.lock().await.failing_event_writes = failing;
    }

    /// Audit events written so far, in write order.
    pub async fn audit_log(&self) -> Vec<AuditEvent> {
        self.state.lock().await.audit.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn generate_id(&self) -> Result<TaskId, StoreError> {
        Ok(self.state.lock().await.allocate_id())
    }

    async fn create_if_absent(&self, mut record: TaskRecord) -> Result<CreateResult, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.records.get(&record.id) {
            return Ok(CreateResult {
                created: false,
                current: existing.clone(),
            });
        }

        // 外部で決めた id でも再利用されないように採番位置を進める
        state.next_id = state.next_id.max(record.id.get());
        record.version = Version::UNSET.next();
        state.records.insert(record.id, record.clone());
        Ok(CreateResult {
            created: true,
            current: record,
        })
    }

    async fn load(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        Ok(self.state.lock().await.records.get(&id).cloned())
    }

    async fn list_assigned_or_unclaimed(
        &self,
        executor: &ExecutorId,
        page: PageRequest,
    ) -> Result<Page<TaskRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.take_list_fault()?;
        state.page(&page, |record| {
            record.is_unclaimed() || record.is_assigned_to(executor)
        })
    }

    async fn list_tasks(&self, page: PageRequest) -> Result<Page<TaskRecord>, StoreError> {
        let mut state = self.state.lock().await;
        state.take_list_fault()?;
        state.page(&page, |_| true)
    }

    async fn compare_and_update(
        &self,
        id: TaskId,
        expected: Version,
        next: TaskMutation,
    ) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        if state.failing_updates > 0 {
            state.failing_updates -= 1;
            return Err(StoreError::Unavailable(
                "injected update failure".to_string(),
            ));
        }

        match state.records.get_mut(&id) {
            Some(record) if record.version == expected => {
                next.apply_to(record, now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: TaskId) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.records.remove(&id).is_some())
    }

    async fn write_events(&self, events: Vec<AuditEvent>) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_event_writes {
            return Err(StoreError::Unavailable(
                "injected event write failure".to_string(),
            ));
        }
        state.audit.extend(events);
        Ok(())
    }
}
