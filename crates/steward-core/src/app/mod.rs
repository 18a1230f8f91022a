//! App - アプリケーション層
//!
//! ports を組み合わせて executor の振る舞いを実装する。
//!
//! # 主要コンポーネント
//! - **ExecutorBuilder**: 構築とワイヤリング（fail-fast 検証）
//! - **TaskExecutor**: poll → claim → dispatch、`handle_task`
//! - **claim**: version 付き CAS による排他的な claim
//! - **policy**: retry / 上限 / stale 判定
//! - **ReaperLoop**: 放置された assignment の回収

pub mod builder;
pub mod claim;
pub mod config;
pub mod executor;
pub mod policy;
pub mod reaper;
pub mod worker;

pub use self::builder::ExecutorBuilder;
pub use self::claim::ClaimResult;
pub use self::config::{ExecutorConfig, ValidatedConfig, WorkerMode};
pub use self::executor::{ExecutorHandle, PollReport, TaskExecutor};
pub use self::policy::{AttemptPolicy, ClaimDecision, LeaseTimeout, NeverReap, ReapPolicy, RetryPolicy};
pub use self::reaper::{ReapReport, ReaperHandle, ReaperLoop};
pub use self::worker::DrainReport;
