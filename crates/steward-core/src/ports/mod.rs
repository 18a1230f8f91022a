//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」。各 trait は外部の協力者
//! （メタデータストア、イベント sink、ストレージ資格情報）への境界を表す。
//!
//! # 設計原則
//! - メタデータストアが source of truth（正本）
//! - executor 自身はメモリ上の一時状態（どのタスクを実行中か）しか持たない

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod io_provisioner;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::{EventSink, NoopEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::io_provisioner::{IoProvisioner, NoIoProvisioner, ScopedIo};
pub use self::task_store::{CreateResult, Page, PageRequest, PageToken, TaskStore};
