//! TaskExecutor - poll / claim / dispatch
//!
//! # 処理フロー
//! ```text
//! list page → in-flight? → policy.decide → reserve slot → claim (CAS)
//!     → submit(handle_task) → next page
//! ```
//!
//! `handle_task` は 1 回の attempt を実行する:
//! before イベント → load → first-match handler → 成功なら delete → after イベント
//!
//! # 不変条件
//! - CAS に負けた executor はそのタスクを実行しない
//! - handler の失敗・panic・handler 不在は制御ループを止めない
//! - event sink の失敗は claim / retry / delete の判断に影響しない

use std::any::Any;
use std::ops::ControlFlow;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use arc_swap::ArcSwap;
use futures::FutureExt;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::claim::{ClaimResult, abandon, claim};
use super::config::ValidatedConfig;
use super::policy::{AttemptPolicy, ClaimDecision};
use super::worker::{DrainReport, InFlight, WorkerPool};
use crate::domain::errors::ExecutorError;
use crate::domain::events::{AuditKind, TaskEvent};
use crate::domain::ids::{ExecutorId, TaskId};
use crate::domain::outcome::AttemptOutcome;
use crate::domain::task::TaskRecord;
use crate::impls::StoreEventSink;
use crate::ports::{Clock, EventSink, IoProvisioner, PageRequest, TaskStore};
use crate::typed::{Handler, HandlerRegistry, Task, TaskContext, TaskHandler};

const EXHAUSTED_REASON: &str = "attempt counter exhausted";

/// Counters for one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    pub listed: usize,
    pub claimed: usize,
    pub lost_race: usize,
    /// Skipped because this executor is already running them.
    pub in_flight: usize,
    /// Skipped because the attempt policy's backoff has not elapsed.
    pub not_due: usize,
    pub abandoned: usize,
    pub store_faults: usize,
    /// Shutdown was requested before every page was processed.
    pub stopped_early: bool,
}

/// Everything the builder hands over.
pub(crate) struct ExecutorParts {
    pub config: ValidatedConfig,
    pub store: Arc<dyn TaskStore>,
    pub sink: Arc<dyn EventSink>,
    pub audit: StoreEventSink,
    pub clock: Arc<dyn Clock>,
    pub io: Arc<dyn IoProvisioner>,
    pub handlers: HandlerRegistry,
    pub attempt_policy: Arc<dyn AttemptPolicy>,
}

struct ExecutorInner {
    config: ValidatedConfig,
    store: Arc<dyn TaskStore>,
    sink: Arc<dyn EventSink>,
    audit: StoreEventSink,
    clock: Arc<dyn Clock>,
    io: Arc<dyn IoProvisioner>,
    handlers: ArcSwap<HandlerRegistry>,
    attempt_policy: Arc<dyn AttemptPolicy>,
    in_flight: InFlight,
    pool: WorkerPool,
    running: AtomicBool,
    stopping: AtomicBool,
}

/// Executor for one identity. Cheap to clone; clones share all state.
///
/// Built with [`super::ExecutorBuilder`].
#[derive(Clone)]
pub struct TaskExecutor {
    inner: Arc<ExecutorInner>,
}

impl TaskExecutor {
    pub(crate) fn from_parts(parts: ExecutorParts) -> Self {
        let pool = WorkerPool::new(parts.config.worker_mode());
        Self {
            inner: Arc::new(ExecutorInner {
                config: parts.config,
                store: parts.store,
                sink: parts.sink,
                audit: parts.audit,
                clock: parts.clock,
                io: parts.io,
                handlers: ArcSwap::from_pointee(parts.handlers),
                attempt_policy: parts.attempt_policy,
                in_flight: InFlight::default(),
                pool,
                running: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
            }),
        }
    }

    pub fn executor_id(&self) -> &ExecutorId {
        self.inner.config.executor_id()
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.inner.config
    }

    /// Register a handler after the ones already present.
    ///
    /// Takes effect from the next dispatch; attempts already running keep the
    /// handler they matched.
    pub fn add_task_handler(&self, handler: Arc<dyn TaskHandler>) {
        info!(handler = handler.name(), "registering task handler");
        self.inner.handlers.rcu(|current| {
            let mut next = HandlerRegistry::clone(current);
            next.register(handler.clone());
            next
        });
    }

    pub fn add_typed_handler<T: Task, H: Handler<T> + 'static>(&self, handler: H) {
        self.add_task_handler(Arc::new(crate::typed::TypedHandler::<T, H>::new(handler)));
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.inner.handlers.load().names()
    }

    /// Number of attempts currently running on this executor.
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight.len()
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Context handed to handlers for attempts run by this executor.
    pub fn task_context(&self) -> TaskContext {
        TaskContext::new(
            self.executor_id().clone(),
            self.inner.io.clone(),
            self.inner.clock.clone(),
        )
    }

    /// Run exactly one attempt of an already-claimed task.
    ///
    /// Emits `BeforeAttempt` before dispatch and `AfterAttempt` afterwards
    /// whatever the outcome. On success the record is deleted; on any other
    /// outcome it is left as it is for a later claim.
    pub async fn handle_task(&self, task_id: TaskId, ctx: &TaskContext, attempt: u32) -> bool {
        self.emit(TaskEvent::BeforeAttempt { task_id, attempt }).await;

        let outcome = self.run_attempt(task_id, ctx).await;
        let success = outcome.is_success();
        match &outcome {
            AttemptOutcome::Succeeded => {
                info!(%task_id, attempt, "attempt succeeded");
            }
            AttemptOutcome::NoHandler | AttemptOutcome::Missing => {
                info!(%task_id, attempt, reason = outcome.reason(), "attempt skipped");
            }
            AttemptOutcome::Failed(reason) | AttemptOutcome::Faulted(reason) => {
                warn!(%task_id, attempt, %reason, "attempt failed");
            }
        }

        self.emit(TaskEvent::AfterAttempt {
            task_id,
            attempt,
            success,
        })
        .await;
        success
    }

    async fn run_attempt(&self, task_id: TaskId, ctx: &TaskContext) -> AttemptOutcome {
        let record = match self.inner.store.load(task_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return AttemptOutcome::Missing,
            Err(e) => return AttemptOutcome::Failed(format!("failed to load task: {e}")),
        };

        let Some(handler) = self.inner.handlers.load().find(&record) else {
            return AttemptOutcome::NoHandler;
        };
        debug!(%task_id, handler = handler.name(), "dispatching");

        let result = AssertUnwindSafe(handler.handle(&record, ctx))
            .catch_unwind()
            .await;
        match result {
            Ok(Ok(true)) => {
                // 成功は確定。削除に失敗しても次の claim で再実行されるだけ
                if let Err(e) = self.inner.store.delete(task_id).await {
                    warn!(%task_id, error = %e, "failed to delete completed task");
                }
                AttemptOutcome::Succeeded
            }
            Ok(Ok(false)) => AttemptOutcome::Failed(format!("{} reported failure", handler.name())),
            Ok(Err(e)) => AttemptOutcome::Failed(e.to_string()),
            Err(payload) => AttemptOutcome::Faulted(panic_message(payload.as_ref())),
        }
    }

    async fn emit(&self, event: TaskEvent) {
        if let Err(e) = self.inner.sink.on_event(&event).await {
            warn!(task_id = %event.task_id(), attempt = event.attempt(), error = %e, "event sink rejected event");
        }
    }

    /// One full cycle over every page of claimable tasks.
    ///
    /// Store faults end the cycle early; the next cycle starts from the first
    /// page again.
    pub async fn poll_once(&self) -> PollReport {
        let inner = &self.inner;
        let mut report = PollReport::default();
        inner.pool.reap_finished().await;

        let page_size = inner.config.page_size();
        let mut request = PageRequest::first(page_size);
        loop {
            if self.is_stopping() {
                report.stopped_early = true;
                break;
            }

            let page = match inner
                .store
                .list_assigned_or_unclaimed(self.executor_id(), request)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(executor_id = %self.executor_id(), error = %e, "failed to list tasks");
                    report.store_faults += 1;
                    break;
                }
            };

            for record in page.items {
                report.listed += 1;
                if self.is_stopping() {
                    report.stopped_early = true;
                    return report;
                }
                if self.consider(record, &mut report).await.is_break() {
                    return report;
                }
            }

            match page.next {
                Some(token) => request = PageRequest::after(token, page_size),
                None => break,
            }
        }
        report
    }

    async fn consider(&self, record: TaskRecord, report: &mut PollReport) -> ControlFlow<()> {
        let inner = &self.inner;
        if inner.in_flight.contains(record.id) {
            report.in_flight += 1;
            return ControlFlow::Continue(());
        }
        if record.next_attempt().is_none() {
            return self.abandon_task(&record, EXHAUSTED_REASON.to_string(), report).await;
        }

        match inner.attempt_policy.decide(&record, inner.clock.now()) {
            ClaimDecision::Claim => {}
            ClaimDecision::NotYet => {
                report.not_due += 1;
                return ControlFlow::Continue(());
            }
            ClaimDecision::Abandon { reason } => {
                return self.abandon_task(&record, reason, report).await;
            }
        }

        // 空き枠を確保してから claim する。claim 済みのまま待たせない
        let Some(slot) = inner.pool.reserve().await else {
            report.stopped_early = true;
            return ControlFlow::Break(());
        };
        if self.is_stopping() {
            report.stopped_early = true;
            return ControlFlow::Break(());
        }

        match claim(
            inner.store.as_ref(),
            self.executor_id(),
            &record,
            inner.clock.now(),
        )
        .await
        {
            Ok(ClaimResult::Claimed { task_id, attempt }) => {
                report.claimed += 1;
                let guard = inner.in_flight.enter(task_id);
                let executor = self.clone();
                let ctx = self.task_context();
                inner
                    .pool
                    .submit(slot, async move {
                        let _guard = guard;
                        executor.handle_task(task_id, &ctx, attempt).await;
                    })
                    .await;
                ControlFlow::Continue(())
            }
            Ok(ClaimResult::LostRace) => {
                report.lost_race += 1;
                ControlFlow::Continue(())
            }
            Ok(ClaimResult::Exhausted) => {
                drop(slot);
                self.abandon_task(&record, EXHAUSTED_REASON.to_string(), report)
                    .await
            }
            Err(e) => {
                warn!(task_id = %record.id, error = %e, "failed to claim task");
                report.store_faults += 1;
                ControlFlow::Break(())
            }
        }
    }

    async fn abandon_task(
        &self,
        record: &TaskRecord,
        reason: String,
        report: &mut PollReport,
    ) -> ControlFlow<()> {
        match abandon(self.inner.store.as_ref(), self.executor_id(), record).await {
            Ok(true) => {
                report.abandoned += 1;
                warn!(task_id = %record.id, attempt = record.attempt, %reason, "task abandoned");
                let audit = AuditKind::Abandoned {
                    task_id: record.id,
                    attempt: record.attempt,
                    reason,
                };
                if let Err(e) = self.inner.audit.record(audit).await {
                    warn!(task_id = %record.id, error = %e, "failed to write audit event");
                }
                ControlFlow::Continue(())
            }
            Ok(false) => {
                report.lost_race += 1;
                ControlFlow::Continue(())
            }
            Err(e) => {
                warn!(task_id = %record.id, error = %e, "failed to abandon task");
                report.store_faults += 1;
                ControlFlow::Break(())
            }
        }
    }

    /// Attempts running inside the poll cycle itself (inline mode only).
    fn inline_in_flight(&self) -> usize {
        if self.inner.pool.is_inline() {
            self.inner.in_flight.len()
        } else {
            0
        }
    }

    fn is_stopping(&self) -> bool {
        self.inner.stopping.load(Ordering::SeqCst)
    }

    fn next_poll_delay(&self) -> Duration {
        let interval = self.inner.config.poll_interval();
        let jitter_ms = u64::try_from(self.inner.config.poll_jitter().as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return interval;
        }
        interval + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }

    /// Spawn the control loop on the current tokio runtime.
    pub fn start(&self) -> Result<ExecutorHandle, ExecutorError> {
        if self.inner.running.swap(true, Ordering::SeqCst) {
            return Err(ExecutorError::AlreadyRunning);
        }
        self.inner.stopping.store(false, Ordering::SeqCst);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let executor = self.clone();
        let control = tokio::spawn(async move { executor.control_loop(shutdown_rx).await });

        Ok(ExecutorHandle {
            shutdown_tx,
            control,
        })
    }

    async fn control_loop(self, mut shutdown: watch::Receiver<bool>) -> DrainReport {
        let drain_timeout = self.inner.config.drain_timeout();
        info!(
            executor_id = %self.executor_id(),
            handlers = ?self.handler_names(),
            "executor started"
        );

        // 停止要求の時点で一度だけ決める。サイクルの打ち切りと pool の drain で共有する
        let mut deadline = None;
        let mut inline = DrainReport::default();
        loop {
            if *shutdown.borrow() {
                break;
            }

            let cycle = self.poll_once();
            tokio::pin!(cycle);
            tokio::select! {
                report = &mut cycle => {
                    debug!(?report, "poll cycle finished");
                }
                _ = shutdown.changed() => {
                    self.inner.stopping.store(true, Ordering::SeqCst);
                    let until = Instant::now() + drain_timeout;
                    deadline = Some(until);
                    let running = self.inline_in_flight();
                    if tokio::time::timeout_at(until, &mut cycle).await.is_ok() {
                        inline.completed = running;
                    } else {
                        // inline の attempt はサイクルと一緒に drop される
                        inline.aborted = self.inline_in_flight();
                        warn!(
                            aborted = inline.aborted,
                            "poll cycle did not stop within the drain timeout"
                        );
                    }
                    break;
                }
            }

            // handle が drop されても changed() は Err で返るので停止する
            tokio::select! {
                _ = tokio::time::sleep(self.next_poll_delay()) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.inner.stopping.store(true, Ordering::SeqCst);
        let deadline = deadline.unwrap_or_else(|| Instant::now() + drain_timeout);
        let mut report = self.inner.pool.drain(deadline).await;
        report.completed += inline.completed;
        report.aborted += inline.aborted;
        self.inner.running.store(false, Ordering::SeqCst);
        info!(
            executor_id = %self.executor_id(),
            completed = report.completed,
            aborted = report.aborted,
            "executor stopped"
        );
        report
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("executor_id", self.executor_id())
            .field("handlers", &self.handler_names())
            .field("in_flight", &self.in_flight_count())
            .finish_non_exhaustive()
    }
}

/// Controls a started executor. Dropping it also stops the control loop.
#[derive(Debug)]
pub struct ExecutorHandle {
    shutdown_tx: watch::Sender<bool>,
    control: JoinHandle<DrainReport>,
}

impl ExecutorHandle {
    /// Stop issuing polls and claims without waiting.
    pub fn request_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.control.is_finished()
    }

    /// Stop, then wait for the drain to complete.
    pub async fn shutdown(self) -> DrainReport {
        self.request_shutdown();
        match self.control.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "executor control loop terminated abnormally");
                DrainReport::default()
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ExecutorBuilder;
    use crate::app::config::ExecutorConfig;
    use crate::domain::task::TaskKind;
    use crate::impls::{InMemoryTaskStore, RecordingEventSink};
    use crate::ports::FixedClock;
    use crate::typed::handler::fixtures::{
        AnyTaskHandler, CleanupHandler, KindHandler, PanickingHandler,
    };
    use crate::typed::task::fixtures::CleanupTask;
    use chrono::{TimeZone, Utc};

    struct Harness {
        store: Arc<InMemoryTaskStore>,
        events: Arc<RecordingEventSink>,
        executor: TaskExecutor,
    }

    fn harness(sink: RecordingEventSink) -> Harness {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryTaskStore::new(clock.clone()));
        let events = Arc::new(sink);
        let config = ExecutorConfig {
            worker_concurrency: 0,
            ..ExecutorConfig::default()
        }
        .with_executor_id("exec-a");
        let executor = ExecutorBuilder::new(config, store.clone())
            .clock(clock)
            .event_sink(events.clone())
            .build()
            .unwrap();
        Harness {
            store,
            events,
            executor,
        }
    }

    async fn enqueue(store: &InMemoryTaskStore, record: TaskRecord) -> TaskId {
        store.create_if_absent(record).await.unwrap().current.id
    }

    fn record(id: u64, kind: &str) -> TaskRecord {
        TaskRecord::new(
            TaskId::new(id),
            TaskKind::new(kind),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn successful_attempt_emits_both_events_and_deletes() {
        let h = harness(RecordingEventSink::new());
        h.executor.add_task_handler(Arc::new(AnyTaskHandler::new(true)));
        let id = enqueue(&h.store, record(1, "noop")).await;

        let ctx = h.executor.task_context();
        assert!(h.executor.handle_task(id, &ctx, 1).await);

        assert_eq!(
            h.events.events(),
            vec![
                TaskEvent::BeforeAttempt {
                    task_id: id,
                    attempt: 1
                },
                TaskEvent::AfterAttempt {
                    task_id: id,
                    attempt: 1,
                    success: true
                },
            ]
        );
        assert!(h.store.load(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unmatched_kind_fails_without_deleting() {
        let h = harness(RecordingEventSink::new());
        h.executor.add_task_handler(Arc::new(KindHandler {
            kind: TaskKind::new("A"),
            label: "a-only",
        }));
        let id = enqueue(&h.store, record(1, "B")).await;

        assert!(!h.executor.handle_task(id, &h.executor.task_context(), 1).await);
        assert_eq!(
            h.events.latest_after(),
            Some(TaskEvent::AfterAttempt {
                task_id: id,
                attempt: 1,
                success: false
            })
        );
        assert!(h.store.load(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn panic_is_contained_as_failure() {
        let h = harness(RecordingEventSink::new());
        h.executor.add_task_handler(Arc::new(PanickingHandler));
        let id = enqueue(&h.store, record(1, "noop")).await;

        assert!(!h.executor.handle_task(id, &h.executor.task_context(), 1).await);
        assert_eq!(h.events.events().len(), 2);
        assert!(h.store.load(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn first_registered_match_wins() {
        let h = harness(RecordingEventSink::new());
        let failing = Arc::new(AnyTaskHandler::new(false));
        let succeeding = Arc::new(AnyTaskHandler::new(true));
        h.executor.add_task_handler(failing.clone());
        h.executor.add_task_handler(succeeding.clone());
        let id = enqueue(&h.store, record(1, "noop")).await;

        assert!(!h.executor.handle_task(id, &h.executor.task_context(), 1).await);
        assert_eq!(failing.calls(), 1);
        assert_eq!(succeeding.calls(), 0);
    }

    #[tokio::test]
    async fn typed_handler_decodes_properties() {
        let h = harness(RecordingEventSink::new());
        h.executor
            .add_typed_handler::<CleanupTask, _>(CleanupHandler);
        let good = enqueue(
            &h.store,
            record(1, "table_cleanup").with_property("location", "s3://bucket/t1"),
        )
        .await;
        let undecodable = enqueue(&h.store, record(2, "table_cleanup")).await;

        let ctx = h.executor.task_context();
        assert!(h.executor.handle_task(good, &ctx, 1).await);
        assert!(!h.executor.handle_task(undecodable, &ctx, 1).await);
    }

    #[tokio::test]
    async fn sink_errors_do_not_change_outcome() {
        let h = harness(RecordingEventSink::rejecting());
        h.executor.add_task_handler(Arc::new(AnyTaskHandler::new(true)));
        let id = enqueue(&h.store, record(1, "noop")).await;

        assert!(h.executor.handle_task(id, &h.executor.task_context(), 1).await);
        assert!(h.store.load(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_record_is_a_failed_attempt() {
        let h = harness(RecordingEventSink::new());
        h.executor.add_task_handler(Arc::new(AnyTaskHandler::new(true)));

        assert!(!h.executor.handle_task(TaskId::new(99), &h.executor.task_context(), 3).await);
        assert_eq!(
            h.events.latest_after(),
            Some(TaskEvent::AfterAttempt {
                task_id: TaskId::new(99),
                attempt: 3,
                success: false
            })
        );
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let h = harness(RecordingEventSink::new());
        let handle = h.executor.start().unwrap();
        assert!(matches!(
            h.executor.start(),
            Err(ExecutorError::AlreadyRunning)
        ));
        handle.shutdown().await;
        assert!(!h.executor.is_running());
    }

    fn with_jitter(interval_ms: u64, jitter_ms: u64) -> TaskExecutor {
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        ));
        let config = ExecutorConfig {
            poll_interval_ms: interval_ms,
            poll_jitter_ms: jitter_ms,
            ..ExecutorConfig::default()
        }
        .with_executor_id("exec-a");
        ExecutorBuilder::new(config, Arc::new(InMemoryTaskStore::new(clock.clone())))
            .clock(clock)
            .build()
            .unwrap()
    }

    #[test]
    fn poll_delay_stays_within_jitter_window() {
        let executor = with_jitter(100, 50);
        let delays: Vec<Duration> = (0..500).map(|_| executor.next_poll_delay()).collect();

        assert!(delays.iter().all(|d| {
            (Duration::from_millis(100)..=Duration::from_millis(150)).contains(d)
        }));
        // 500 回引いて一度も揺れないことはまず無い
        assert!(delays.iter().any(|d| *d != delays[0]));

        let fixed = with_jitter(100, 0);
        assert_eq!(fixed.next_poll_delay(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn exhausted_attempt_counter_is_abandoned() {
        let h = harness(RecordingEventSink::new());
        let handler = Arc::new(AnyTaskHandler::new(true));
        h.executor.add_task_handler(handler.clone());
        let mut spent = record(1, "noop");
        spent.attempt = u32::MAX;
        let id = enqueue(&h.store, spent).await;

        let report = h.executor.poll_once().await;
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.claimed, 0);
        assert_eq!(handler.calls(), 0);
        assert!(h.store.load(id).await.unwrap().is_none());
        assert!(h.store.audit_log().await.iter().any(|event| matches!(
            &event.event,
            AuditKind::Abandoned { task_id, attempt: u32::MAX, .. } if *task_id == id
        )));
    }

    #[test]
    fn panic_messages_are_extracted() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "handler panicked: boom");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "handler panicked");
    }
}
