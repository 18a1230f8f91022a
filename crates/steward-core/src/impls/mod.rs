//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: テスト・デモ用の正本
//! - **RecordingEventSink / TracingEventSink / StoreEventSink / FanoutEventSink**
//! - **StaticIoProvisioner**: 固定資格情報の払い出し
//!
//! 本番用のストア実装はカタログサービス側に置く。

pub mod memory_store;
pub mod sinks;
pub mod static_io;

pub use self::memory_store::InMemoryTaskStore;
pub use self::sinks::{FanoutEventSink, RecordingEventSink, StoreEventSink, TracingEventSink};
pub use self::static_io::StaticIoProvisioner;
