//! Domain model (ids, task records, events, outcomes, errors).

pub mod errors;
pub mod events;
pub mod ids;
pub mod outcome;
pub mod task;

pub use errors::{
    ConfigError, EventSinkError, ExecutorError, HandlerError, ProvisionError, StoreError,
};
pub use events::{AuditEvent, AuditKind, TaskEvent};
pub use ids::{EventId, ExecutorId, TaskId};
pub use outcome::AttemptOutcome;
pub use task::{LOCATION_PROPERTY, TaskKind, TaskMutation, TaskRecord, Version};
