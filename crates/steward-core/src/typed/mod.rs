//! Typed - handler API
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait, `Handler<T>` trait - payload を型で受け取る
//! - **内部（Dyn）**: `TaskHandler` trait - object-safe、登録順に first-match

pub mod context;
pub mod handler;
pub mod registry;
pub mod task;

pub use self::context::TaskContext;
pub use self::handler::{Handler, TaskHandler, TypedHandler};
pub use self::registry::HandlerRegistry;
pub use self::task::Task;
