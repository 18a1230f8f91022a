//! Outcome model: what happened during one attempt.
//!
//! `handle_task` only reports a boolean, but the executor keeps the reason so
//! the log line says whether the handler failed, faulted, or was missing.

use serde::{Deserialize, Serialize};

/// Result of dispatching one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptOutcome {
    /// The handler reported definitive success.
    Succeeded,

    /// The handler returned `false` or an error.
    Failed(String),

    /// The handler panicked; caught at the dispatch boundary.
    Faulted(String),

    /// No registered handler accepts the task kind (version skew).
    NoHandler,

    /// The record was not in the store (already completed or never created).
    Missing,
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AttemptOutcome::Failed(reason) | AttemptOutcome::Faulted(reason) => Some(reason),
            AttemptOutcome::NoHandler => Some("no handler accepts this task kind"),
            AttemptOutcome::Missing => Some("task record not found"),
            AttemptOutcome::Succeeded => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_succeeded_is_success() {
        assert!(AttemptOutcome::Succeeded.is_success());
        assert!(!AttemptOutcome::Failed("x".into()).is_success());
        assert!(!AttemptOutcome::Faulted("boom".into()).is_success());
        assert!(!AttemptOutcome::NoHandler.is_success());
        assert!(!AttemptOutcome::Missing.is_success());
    }

    #[test]
    fn outcome_serializes_as_screaming_names() {
        let v = serde_json::to_value(AttemptOutcome::Failed("oops".into())).unwrap();
        assert_eq!(v["kind"], "FAILED");
        assert_eq!(v["reason"], "oops");

        let v = serde_json::to_value(AttemptOutcome::NoHandler).unwrap();
        assert_eq!(v["kind"], "NO_HANDLER");
    }
}
