//! Multi-Agent Task Coordination Library
//!
//! Tracks work for independent workers (human or automated agents) in a
//! durable per-project record and answers "what may run next". The engine
//! never executes work itself.
//!
//! # Modes
//!
//! - **linear**: a fixed stage pipeline with a cursor; only the current stage
//!   may start, and finishing it advances the cursor.
//! - **dag**: tasks with dependency edges; the ready-set is every pending task
//!   whose dependencies are all done.
//! - **debate**: debaters run rounds of start → submit → cross-review →
//!   synthesize.
//!
//! # Usage
//!
//! ```no_run
//! use coordination::{Engine, EngineConfig, InitRequest, Mode, NewTask, TaskStatus};
//!
//! # fn main() -> coordination::CoordResult<()> {
//! let engine = Engine::new(EngineConfig::from_env());
//! engine.init(InitRequest::new("auth", Mode::Dag).goal("ship login"))?;
//! engine.add_task("auth", NewTask::new("schema"))?;
//! engine.add_task("auth", NewTask::new("api").depends_on(["schema"]))?;
//!
//! let ready = engine.ready("auth")?;
//! assert_eq!(ready.ready[0].id, "schema");
//!
//! engine.update("auth", "schema", TaskStatus::InProgress)?;
//! let outcome = engine.update("auth", "schema", TaskStatus::Done)?;
//! assert_eq!(outcome.unblocked, vec!["api"]);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod debate;
pub mod engine;
pub mod error;
pub mod project;
pub mod report;
pub mod scheduler;
pub mod store;

pub use config::EngineConfig;
pub use debate::{RoundAction, RoundOutcome, RoundPhase};
pub use engine::{Engine, InitRequest, NewTask};
pub use error::{CoordError, CoordResult, ErrorKind, StructuredError};
pub use project::{Debater, LogEntry, Mode, Project, Task, TaskStatus};
pub use report::TextReport;
pub use scheduler::{NextStage, ReadyState, Readiness, TransitionOutcome};
pub use store::ProjectStore;
