//! Policies: retry timing, attempt ceiling, and stale-assignment reaping.
//!
//! Policies are pure deciders (record + now -> decision). Executing the
//! decision is the caller's job.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::task::TaskRecord;

/// What the poll loop should do with a listed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    Claim,
    /// Backoff since the previous attempt has not elapsed yet.
    NotYet,
    /// Give up: the record is removed from the store.
    Abandon { reason: String },
}

/// Decides whether a listed task may be claimed now.
pub trait AttemptPolicy: Send + Sync {
    fn decide(&self, task: &TaskRecord, now: DateTime<Utc>) -> ClaimDecision;
}

/// Exponential backoff between attempts with an optional attempt ceiling.
///
/// The default claims immediately and never gives up.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay after the first attempt.
    pub base_delay: Duration,

    /// Backoff multiplier for exponential backoff.
    pub multiplier: f64,

    /// Abandon once this many attempts have been made.
    pub max_attempts: Option<u32>,
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            multiplier: 1.0,
            max_attempts: None,
        }
    }

    pub fn exponential(base_delay: Duration, multiplier: f64) -> Self {
        Self {
            base_delay,
            multiplier,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Delay before the attempt following attempt number `attempts`.
    ///
    /// delay = base_delay * multiplier^(attempts - 1)
    ///
    /// With base_delay=2s, multiplier=2.0: 2s, 4s, 8s, 16s, ...
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(delay_secs).unwrap_or(Duration::MAX)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

impl AttemptPolicy for RetryPolicy {
    fn decide(&self, task: &TaskRecord, now: DateTime<Utc>) -> ClaimDecision {
        if let Some(max) = self.max_attempts
            && task.attempt >= max
        {
            return ClaimDecision::Abandon {
                reason: format!("attempt limit of {max} reached"),
            };
        }

        let Some(last_attempt_at) = task.last_attempt_at else {
            return ClaimDecision::Claim;
        };
        let delay = chrono::Duration::from_std(self.next_delay(task.attempt))
            .unwrap_or(chrono::Duration::MAX);
        match last_attempt_at.checked_add_signed(delay) {
            Some(due) if now >= due => ClaimDecision::Claim,
            _ => ClaimDecision::NotYet,
        }
    }
}

/// Decides whether an assignment held by another executor may be cleared.
///
/// There is no heartbeat in the engine, so a crashed executor leaves its
/// assignment behind. Only a reap policy can hand such tasks to someone else.
pub trait ReapPolicy: Send + Sync {
    fn is_stale(&self, task: &TaskRecord, now: DateTime<Utc>) -> bool;
}

/// Never releases anything. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverReap;

impl ReapPolicy for NeverReap {
    fn is_stale(&self, _task: &TaskRecord, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Releases assignments whose last attempt started more than `timeout` ago.
///
/// The timeout must exceed the longest expected handler run, otherwise a live
/// executor's task is handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseTimeout {
    timeout: Duration,
}

impl LeaseTimeout {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl ReapPolicy for LeaseTimeout {
    fn is_stale(&self, task: &TaskRecord, now: DateTime<Utc>) -> bool {
        if task.is_unclaimed() {
            return false;
        }
        let started = task.last_attempt_at.unwrap_or(task.updated_at);
        let timeout = chrono::Duration::from_std(self.timeout).unwrap_or(chrono::Duration::MAX);
        match started.checked_add_signed(timeout) {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}
