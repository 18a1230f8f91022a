//! HandlerRegistry - handler の登録と first-match dispatch
//!
//! # 設計原則
//! - 登録順を保持する（暗黙の優先度は持たない）
//! - `can_handle` が true を返す最初の handler を選ぶ
//! - 該当なしは失敗として記録される（古い executor は未知の kind を単に実行しない）

use std::sync::Arc;

use super::handler::{Handler, TaskHandler, TypedHandler};
use super::task::Task;
use crate::domain::task::TaskRecord;

/// Ordered collection of handlers.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn TaskHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn TaskHandler>) {
        self.handlers.push(handler);
    }

    pub fn register_typed<T: Task, H: Handler<T> + 'static>(&mut self, handler: H) {
        self.register(Arc::new(TypedHandler::<T, H>::new(handler)));
    }

    /// First registered handler whose capability check accepts `task`.
    pub fn find(&self, task: &TaskRecord) -> Option<Arc<dyn TaskHandler>> {
        self.handlers
            .iter()
            .find(|handler| handler.can_handle(task))
            .cloned()
    }

    /// Handler names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.handlers.iter().map(|h| h.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::TaskId;
    use crate::domain::task::TaskKind;
    use crate::typed::handler::fixtures::{AnyTaskHandler, CleanupHandler, KindHandler};
    use crate::typed::task::fixtures::CleanupTask;
    use chrono::Utc;

    fn task(kind: &str) -> TaskRecord {
        TaskRecord::new(TaskId::new(1), TaskKind::new(kind), Utc::now())
    }

    #[test]
    fn empty_registry_finds_nothing() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.find(&task("noop")).is_none());
    }

    #[test]
    fn first_match_wins_in_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(KindHandler {
            kind: TaskKind::new("A"),
            label: "first-a",
        }));
        registry.register(Arc::new(KindHandler {
            kind: TaskKind::new("A"),
            label: "second-a",
        }));
        registry.register(Arc::new(AnyTaskHandler::new(true)));

        assert_eq!(registry.find(&task("A")).unwrap().name(), "first-a");
        assert_eq!(registry.find(&task("B")).unwrap().name(), "any");
        assert_eq!(registry.names(), vec!["first-a", "second-a", "any"]);
    }

    #[test]
    fn catch_all_registered_first_shadows_later_handlers() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(AnyTaskHandler::new(true)));
        registry.register(Arc::new(KindHandler {
            kind: TaskKind::new("A"),
            label: "a",
        }));

        assert_eq!(registry.find(&task("A")).unwrap().name(), "any");
    }

    #[test]
    fn typed_registration_matches_kind() {
        let mut registry = HandlerRegistry::new();
        registry.register_typed::<CleanupTask, _>(CleanupHandler);

        assert_eq!(registry.len(), 1);
        assert!(registry.find(&task(CleanupTask::KIND)).is_some());
        assert!(registry.find(&task("other")).is_none());
    }
}
