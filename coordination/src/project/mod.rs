//! Project data model: the persisted aggregate and the task state machine.

pub mod status;
pub mod types;

pub use status::TaskStatus;
pub use types::{
    validate_id, Debater, LogEntry, Mode, Project, Task, SCHEMA_VERSION, SYSTEM_ACTOR,
};
