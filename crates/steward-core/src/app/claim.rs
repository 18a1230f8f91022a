//! Claim protocol: optimistic, version-checked ownership.
//!
//! A claim is one `compare_and_update` that sets the assignment to this
//! executor and increments the attempt counter against the version observed
//! at list time. Ownership and the attempt number commit together, so there
//! is no separate lock table. A lost race is expected contention and is
//! reported as [`ClaimResult::LostRace`], never as an error.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::errors::StoreError;
use crate::domain::ids::{ExecutorId, TaskId};
use crate::domain::task::TaskRecord;
use crate::ports::TaskStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// This executor now exclusively owns `attempt` of `task_id`.
    Claimed { task_id: TaskId, attempt: u32 },
    /// Another writer changed the record first. The caller must not execute it.
    LostRace,
    /// The attempt counter cannot advance. Nothing was written.
    Exhausted,
}

impl ClaimResult {
    pub fn is_claimed(&self) -> bool {
        matches!(self, ClaimResult::Claimed { .. })
    }
}

/// Claim `observed` for `executor`.
pub async fn claim(
    store: &dyn TaskStore,
    executor: &ExecutorId,
    observed: &TaskRecord,
    now: DateTime<Utc>,
) -> Result<ClaimResult, StoreError> {
    let Some(next) = observed.claim_for(executor, now) else {
        return Ok(ClaimResult::Exhausted);
    };
    let attempt = next.attempt;

    if store
        .compare_and_update(observed.id, observed.version, next)
        .await?
    {
        debug!(task_id = %observed.id, attempt, %executor, "task claimed");
        Ok(ClaimResult::Claimed {
            task_id: observed.id,
            attempt,
        })
    } else {
        debug!(task_id = %observed.id, %executor, version = %observed.version, "lost claim race");
        Ok(ClaimResult::LostRace)
    }
}

/// Remove a record the attempt policy gave up on.
///
/// The record is first held for `executor` with a version-checked write, so a
/// concurrent claim wins over abandonment and nobody else can list it between
/// the hold and the delete. Returns `false` on a lost race.
pub async fn abandon(
    store: &dyn TaskStore,
    executor: &ExecutorId,
    observed: &TaskRecord,
) -> Result<bool, StoreError> {
    if !store
        .compare_and_update(observed.id, observed.version, observed.hold_for(executor))
        .await?
    {
        return Ok(false);
    }
    store.delete(observed.id).await
}
