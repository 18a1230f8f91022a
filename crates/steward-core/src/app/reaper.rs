//! ReaperLoop - 放置された assignment の回収
//!
//! executor が死ぬと assignment が残ったままになる（heartbeat は無い）。
//! 同じ identity で再起動すれば自分のタスクは再 list されるが、二度と戻らない
//! identity のタスクは ReapPolicy が stale と判断したときだけ解放される。
//!
//! # フロー
//! 1. `TaskStore::list_tasks` で全ページを走査
//! 2. `ReapPolicy::is_stale` が true の record を release（CAS、attempt はそのまま）
//! 3. 解放したら監査ログに `Released` を書く（best effort）

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::policy::ReapPolicy;
use crate::domain::events::AuditKind;
use crate::domain::ids::{ExecutorId, TaskId};
use crate::impls::StoreEventSink;
use crate::ports::{Clock, PageRequest, TaskStore};

/// Counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReapReport {
    pub scanned: usize,
    pub released: usize,
    pub lost_race: usize,
    pub store_faults: usize,
}

pub struct ReaperLoop {
    store: Arc<dyn TaskStore>,
    policy: Arc<dyn ReapPolicy>,
    clock: Arc<dyn Clock>,
    audit: Option<StoreEventSink>,
    page_size: usize,
}

impl ReaperLoop {
    pub fn new(store: Arc<dyn TaskStore>, policy: Arc<dyn ReapPolicy>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            policy,
            clock,
            audit: None,
            page_size: 100,
        }
    }

    pub fn with_audit(mut self, audit: StoreEventSink) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sweep every page once.
    pub async fn reap_once(&self) -> ReapReport {
        let mut report = ReapReport::default();
        let mut request = PageRequest::first(self.page_size);

        loop {
            let page = match self.store.list_tasks(request).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(error = %e, "reaper failed to list tasks");
                    report.store_faults += 1;
                    return report;
                }
            };

            for record in page.items {
                report.scanned += 1;
                let Some(previous) = record.assigned_executor.clone() else {
                    continue;
                };
                if !self.policy.is_stale(&record, self.clock.now()) {
                    continue;
                }

                match self
                    .store
                    .compare_and_update(record.id, record.version, record.release())
                    .await
                {
                    Ok(true) => {
                        report.released += 1;
                        info!(task_id = %record.id, previous_executor = %previous, attempt = record.attempt, "released stale assignment");
                        self.audit_release(record.id, previous).await;
                    }
                    Ok(false) => {
                        debug!(task_id = %record.id, "stale record changed before release");
                        report.lost_race += 1;
                    }
                    Err(e) => {
                        warn!(task_id = %record.id, error = %e, "reaper failed to release task");
                        report.store_faults += 1;
                        return report;
                    }
                }
            }

            match page.next {
                Some(token) => request = PageRequest::after(token, self.page_size),
                None => return report,
            }
        }
    }

    async fn audit_release(&self, task_id: TaskId, previous: ExecutorId) {
        let Some(audit) = &self.audit else {
            return;
        };
        let kind = AuditKind::Released {
            task_id,
            previous_executor: previous,
        };
        if let Err(e) = audit.record(kind).await {
            warn!(%task_id, error = %e, "failed to write audit event");
        }
    }

    /// Sweep every `interval` until the handle shuts it down.
    pub fn spawn(self, interval: Duration) -> ReaperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                let report = self.reap_once().await;
                debug!(?report, "reaper sweep finished");

                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }
        });
        ReaperHandle { shutdown_tx, join }
    }
}

#[derive(Debug)]
pub struct ReaperHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ReaperHandle {
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        if let Err(e) = self.join.await {
            warn!(error = %e, "reaper task terminated abnormally");
        }
    }
}
