use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use clap::Parser;
use serde::Deserialize;
use tokio::time::{Duration, sleep};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use steward_core::app::{LeaseTimeout, ReaperLoop, RetryPolicy};
use steward_core::domain::{HandlerError, TaskKind, TaskRecord};
use steward_core::impls::{
    FanoutEventSink, InMemoryTaskStore, StaticIoProvisioner, StoreEventSink, TracingEventSink,
};
use steward_core::ports::{Clock, EventSink, SystemClock, TaskStore, UlidGenerator};
use steward_core::typed::{Handler, Task, TaskContext};
use steward_core::{ExecutorBuilder, ExecutorConfig};

/// Runs a task executor against an in-memory store seeded with demo tasks.
#[derive(Debug, Parser)]
#[command(name = "steward", version)]
struct Args {
    /// Executor identity used in every claim.
    #[arg(long, env = "STEWARD_EXECUTOR_ID")]
    executor_id: Option<String>,

    /// JSON config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Concurrent handler executions (0 = inline).
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Number of demo cleanup tasks to enqueue.
    #[arg(long, default_value_t = 5)]
    tasks: u64,

    /// Release assignments older than this many seconds.
    #[arg(long)]
    lease_timeout_secs: Option<u64>,

    /// Print the audit log as JSON lines before exiting.
    #[arg(long)]
    print_audit: bool,
}

#[derive(Debug, Deserialize)]
struct DropTableCleanup {
    location: String,
}

impl Task for DropTableCleanup {
    const KIND: &'static str = "drop_table_cleanup";
}

/// 一時的な失敗を数回起こしてから成功する
struct CleanupHandler {
    remaining_failures: AtomicU32,
}

#[async_trait]
impl Handler<DropTableCleanup> for CleanupHandler {
    async fn handle(
        &self,
        task: DropTableCleanup,
        record: &TaskRecord,
        ctx: &TaskContext,
    ) -> Result<bool, HandlerError> {
        let io = ctx.scoped_io(record).await?;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(HandlerError::failed(format!(
                "intentional failure (left={left})"
            )));
        }

        info!(
            task_id = %record.id,
            attempt = record.attempt,
            location = %task.location,
            expires_at = %io.expires_at,
            "purged table files"
        );
        Ok(true)
    }
}

fn load_config(args: &Args) -> Result<ExecutorConfig, String> {
    let mut config = match &args.config {
        Some(path) => ExecutorConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => ExecutorConfig::default(),
    };
    if let Some(id) = &args.executor_id {
        config = config.with_executor_id(id.clone());
    }
    if let Some(workers) = args.workers {
        config.worker_concurrency = workers;
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    Ok(config)
}

async fn seed(store: &InMemoryTaskStore, clock: &dyn Clock, count: u64) -> Result<(), String> {
    for n in 0..count {
        let id = store.generate_id().await.map_err(|e| e.to_string())?;
        let record = TaskRecord::new(id, TaskKind::new(DropTableCleanup::KIND), clock.now())
            .with_property("location", format!("s3://warehouse/db/table_{n}"));
        store
            .create_if_absent(record)
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    // (A) store / clock / sink を用意
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryTaskStore::new(clock.clone()));
    if let Err(e) = seed(&store, clock.as_ref(), args.tasks).await {
        error!(error = %e, "failed to seed demo tasks");
        return ExitCode::FAILURE;
    }

    let validated = match config.validate() {
        Ok(validated) => validated,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let audit = StoreEventSink::new(
        store.clone(),
        validated.executor_id().clone(),
        Arc::new(UlidGenerator::new(clock.clone())),
        clock.clone(),
    );
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(TracingEventSink), Arc::new(audit.clone())];
    let sink = FanoutEventSink::new(sinks);

    // (B) executor を構築（handler 不足や identity 不在はここで失敗）
    let executor = match ExecutorBuilder::new(config, store.clone())
        .clock(clock.clone())
        .event_sink(Arc::new(sink))
        .io_provisioner(Arc::new(
            StaticIoProvisioner::new(clock.clone(), Duration::from_secs(900))
                .with_credential("access_key", "demo"),
        ))
        .attempt_policy(Arc::new(
            RetryPolicy::exponential(Duration::from_millis(200), 2.0).with_max_attempts(10),
        ))
        .typed_handler::<DropTableCleanup, _>(CleanupHandler {
            remaining_failures: AtomicU32::new(2),
        })
        .expect_kinds(&[DropTableCleanup::KIND])
        .build()
    {
        Ok(executor) => executor,
        Err(e) => {
            error!(error = %e, "failed to build executor");
            return ExitCode::FAILURE;
        }
    };

    // (C) 起動
    let handle = match executor.start() {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to start executor");
            return ExitCode::FAILURE;
        }
    };
    let reaper = args.lease_timeout_secs.map(|secs| {
        ReaperLoop::new(
            store.clone(),
            Arc::new(LeaseTimeout::new(Duration::from_secs(secs))),
            clock.clone(),
        )
        .with_audit(audit.clone())
        .spawn(Duration::from_secs(secs.max(1)))
    });

    // (D) 全部片付くか ctrl-c まで待つ
    tokio::select! {
        _ = async {
            while !store.is_empty().await {
                sleep(Duration::from_millis(100)).await;
            }
        } => info!("all tasks completed"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }

    let report = handle.shutdown().await;
    if let Some(reaper) = reaper {
        reaper.shutdown().await;
    }
    let remaining = store.len().await;
    info!(
        completed = report.completed,
        aborted = report.aborted,
        remaining,
        "shutdown complete"
    );

    if args.print_audit {
        for event in store.audit_log().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => error!(error = %e, "failed to encode audit event"),
            }
        }
    }
    ExitCode::SUCCESS
}
