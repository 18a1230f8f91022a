//! Worker pool and in-flight bookkeeping.
//!
//! The executor's only transient state lives here: which task ids are running
//! on this process right now. It is never persisted and never consulted by
//! another executor.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, warn};

use super::config::WorkerMode;
use crate::domain::ids::TaskId;

/// Task ids currently executing on this executor.
#[derive(Debug, Clone, Default)]
pub(crate) struct InFlight {
    ids: Arc<Mutex<HashSet<TaskId>>>,
}

impl InFlight {
    fn guard(&self) -> MutexGuard<'_, HashSet<TaskId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.guard().contains(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.guard().len()
    }

    /// Mark `id` as running until the returned guard drops.
    pub(crate) fn enter(&self, id: TaskId) -> InFlightGuard {
        self.guard().insert(id);
        InFlightGuard {
            id,
            owner: self.clone(),
        }
    }
}

/// Removes its task id from the in-flight set on drop, including when the
/// attempt is aborted.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    id: TaskId,
    owner: InFlight,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.owner.guard().remove(&self.id);
    }
}

/// Outcome of draining the pool at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Attempts that finished within the drain timeout.
    pub completed: usize,
    /// Attempts interrupted after the timeout. Their tasks stay in the store.
    pub aborted: usize,
}

/// A reserved execution slot. Holding it keeps one unit of concurrency busy.
pub(crate) enum Slot {
    Inline,
    Pooled(OwnedSemaphorePermit),
}

pub(crate) enum WorkerPool {
    Inline,
    Pool {
        permits: Arc<Semaphore>,
        running: tokio::sync::Mutex<JoinSet<()>>,
    },
}

impl WorkerPool {
    pub(crate) fn new(mode: WorkerMode) -> Self {
        match mode {
            WorkerMode::Inline => WorkerPool::Inline,
            WorkerMode::Pool(n) => WorkerPool::Pool {
                permits: Arc::new(Semaphore::new(n.get())),
                running: tokio::sync::Mutex::new(JoinSet::new()),
            },
        }
    }

    pub(crate) fn is_inline(&self) -> bool {
        matches!(self, WorkerPool::Inline)
    }

    /// Wait for a free slot. Returns `None` only if the pool was closed.
    pub(crate) async fn reserve(&self) -> Option<Slot> {
        match self {
            WorkerPool::Inline => Some(Slot::Inline),
            WorkerPool::Pool { permits, .. } => {
                permits.clone().acquire_owned().await.ok().map(Slot::Pooled)
            }
        }
    }

    /// Run `job` in the reserved slot. Inline slots run to completion before
    /// this returns; pooled slots return as soon as the job is spawned.
    pub(crate) async fn submit<F>(&self, slot: Slot, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match (self, slot) {
            (WorkerPool::Pool { running, .. }, Slot::Pooled(permit)) => {
                running.lock().await.spawn(async move {
                    let _permit = permit;
                    job.await;
                });
            }
            _ => job.await,
        }
    }

    /// Collect attempts that already finished, logging any that panicked
    /// outside the dispatch boundary.
    pub(crate) async fn reap_finished(&self) -> usize {
        let WorkerPool::Pool { running, .. } = self else {
            return 0;
        };
        let mut running = running.lock().await;
        let mut finished = 0;
        while let Some(result) = running.try_join_next() {
            log_join_result(result);
            finished += 1;
        }
        finished
    }

    /// Wait until `deadline` for pooled attempts, then abort the rest.
    ///
    /// Inline attempts run inside the poll cycle, so the caller accounts for them.
    pub(crate) async fn drain(&self, deadline: Instant) -> DrainReport {
        let WorkerPool::Pool { running, .. } = self else {
            return DrainReport::default();
        };
        let mut running = running.lock().await;
        let mut report = DrainReport::default();

        loop {
            match tokio::time::timeout_at(deadline, running.join_next()).await {
                Ok(Some(result)) => {
                    log_join_result(result);
                    report.completed += 1;
                }
                Ok(None) => break,
                Err(_) => {
                    report.aborted = running.len();
                    warn!(
                        aborted = report.aborted,
                        "drain timeout elapsed, interrupting in-flight attempts"
                    );
                    running.shutdown().await;
                    break;
                }
            }
        }
        report
    }
}

fn log_join_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        error!(error = %e, "worker task panicked");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn after(duration: Duration) -> Instant {
        Instant::now() + duration
    }

    #[test]
    fn in_flight_guard_clears_on_drop() {
        let in_flight = InFlight::default();
        let guard = in_flight.enter(TaskId::new(7));
        assert!(in_flight.contains(TaskId::new(7)));
        assert_eq!(in_flight.len(), 1);

        drop(guard);
        assert!(!in_flight.contains(TaskId::new(7)));
    }

    #[tokio::test]
    async fn inline_pool_runs_job_before_returning() {
        let pool = WorkerPool::new(WorkerMode::Inline);
        let counter = Arc::new(AtomicUsize::new(0));

        let slot = pool.reserve().await.unwrap();
        let c = counter.clone();
        pool.submit(slot, async move {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(pool.drain(after(Duration::from_secs(1))).await, DrainReport::default());
    }

    #[tokio::test]
    async fn pool_limits_concurrency() {
        let pool = WorkerPool::new(WorkerMode::Pool(NonZeroUsize::new(1).unwrap()));
        let first = pool.reserve().await.unwrap();

        // 1 枠しかないので、解放されるまで 2 つ目は取れない
        let second = tokio::time::timeout(Duration::from_millis(50), pool.reserve()).await;
        assert!(second.is_err());

        pool.submit(first, async {}).await;
        let report = pool.drain(after(Duration::from_secs(1))).await;
        assert_eq!(report.completed, 1);
        assert!(pool.reserve().await.is_some());
    }

    #[tokio::test]
    async fn drain_aborts_after_timeout() {
        let pool = WorkerPool::new(WorkerMode::Pool(NonZeroUsize::new(2).unwrap()));
        let quick = pool.reserve().await.unwrap();
        pool.submit(quick, async {}).await;
        let slow = pool.reserve().await.unwrap();
        pool.submit(slow, async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        })
        .await;

        let report = pool.drain(after(Duration::from_millis(50))).await;
        assert_eq!(
            report,
            DrainReport {
                completed: 1,
                aborted: 1
            }
        );
    }
}
