//! steward-core
//!
//! Claim / dispatch / retry engine for a catalog's deferred background tasks.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task record, events, outcome, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, EventSink, Clock, IdGenerator, IoProvisioner）
//! - **typed**: handler API（TaskHandler, Handler<T>, HandlerRegistry, TaskContext）
//! - **app**: アプリケーションロジック（builder, executor, claim, policy, reaper）
//! - **impls**: 実装（InMemoryTaskStore, event sinks, StaticIoProvisioner）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod typed;

pub use app::{ExecutorBuilder, ExecutorConfig, ExecutorHandle, TaskExecutor};
