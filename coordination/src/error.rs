//! Coordination error types
//!
//! Every engine failure is a typed [`CoordError`]. Each variant maps to one
//! [`ErrorKind`], a stable process exit code, and a structured JSON shape
//! that external dispatchers can inspect before deciding to retry.

use crate::debate::RoundPhase;
use crate::project::{Mode, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for coordination operations
pub type CoordResult<T> = Result<T, CoordError>;

/// Coarse failure category, one per exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    ModeMismatch,
    Validation,
    Contention,
    CorruptStore,
    Internal,
}

impl ErrorKind {
    /// Process exit code for this category.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Internal => 1,
            Self::NotFound => 2,
            Self::Validation => 3,
            Self::ModeMismatch => 4,
            Self::Contention => 5,
            Self::CorruptStore => 6,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::ModeMismatch => write!(f, "mode_mismatch"),
            Self::Validation => write!(f, "validation"),
            Self::Contention => write!(f, "contention"),
            Self::CorruptStore => write!(f, "corrupt_store"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

// ============================================================================
// Structured Error Response
// ============================================================================

/// Machine-readable error payload printed by the CLI in `--json` mode.
///
/// ```json
/// {
///   "code": "INVALID_TRANSITION",
///   "message": "Invalid transition for task 'build' in project 'p': pending -> done",
///   "recovery_action": "Move the task to in-progress first",
///   "context": { "project": "p", "task": "build" },
///   "retryable": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code (e.g., "PROJECT_NOT_FOUND")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Actionable recovery instruction for the caller
    pub recovery_action: String,

    /// Entity details (project, task, transition, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,

    /// Whether re-invoking the same command may succeed
    #[serde(default)]
    pub retryable: bool,
}

impl StructuredError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        recovery_action: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            recovery_action: recovery_action.into(),
            context: HashMap::new(),
            retryable: false,
        }
    }

    /// Add context key-value pair
    pub fn with_context(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Mark as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StructuredError {}

/// Errors that can occur during coordination operations
#[derive(Error, Debug)]
pub enum CoordError {
    #[error("Project '{project}' not found")]
    ProjectNotFound { project: String },

    #[error("Task '{task}' not found in project '{project}'")]
    TaskNotFound { project: String, task: String },

    #[error("Debater '{debater}' not found in project '{project}'")]
    DebaterNotFound { project: String, debater: String },

    #[error("No debate round exists yet in project '{project}'")]
    NoRound { project: String },

    /// Command invoked against a project of an incompatible mode
    #[error("'{command}' is not supported in {actual} mode (project '{project}' needs {expected})")]
    ModeMismatch {
        project: String,
        command: String,
        actual: Mode,
        expected: String,
    },

    #[error("Project '{project}' already exists")]
    ProjectExists { project: String },

    #[error("Duplicate {kind} '{id}' in project '{project}'")]
    DuplicateId {
        project: String,
        kind: &'static str,
        id: String,
    },

    #[error("Invalid transition for task '{task}' in project '{project}': {from} -> {to}")]
    InvalidTransition {
        project: String,
        task: String,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Stage '{task}' in project '{project}' is not the current stage ('{current}')")]
    NotCurrentStage {
        project: String,
        task: String,
        current: String,
    },

    #[error("Task '{task}' in project '{project}' depends on unknown task '{dependency}'")]
    MissingDependency {
        project: String,
        task: String,
        dependency: String,
    },

    #[error("Dependency cycle in project '{project}': {}", .cycle.join(" -> "))]
    DependencyCycle { project: String, cycle: Vec<String> },

    /// Round action not legal in the round's current phase
    #[error("Cannot {action} round {round} of project '{project}' in phase {phase}: {reason}")]
    RoundPhase {
        project: String,
        round: u32,
        phase: RoundPhase,
        action: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Lock could not be acquired within the configured bound
    #[error("Project '{project}' is locked by another command (waited {waited_ms}ms{})",
        .holder.map(|pid| format!(", held by pid {pid}")).unwrap_or_default())]
    Contention {
        project: String,
        waited_ms: u64,
        holder: Option<u32>,
    },

    /// Stored record failed to parse; never coerced to an empty project
    #[error("Project record at {path} is corrupt: {reason}")]
    CorruptStore { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoordError {
    pub fn project_not_found(project: impl Into<String>) -> Self {
        Self::ProjectNotFound {
            project: project.into(),
        }
    }

    pub fn task_not_found(project: impl Into<String>, task: impl Into<String>) -> Self {
        Self::TaskNotFound {
            project: project.into(),
            task: task.into(),
        }
    }

    pub fn debater_not_found(project: impl Into<String>, debater: impl Into<String>) -> Self {
        Self::DebaterNotFound {
            project: project.into(),
            debater: debater.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CorruptStore {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProjectNotFound { .. }
            | Self::TaskNotFound { .. }
            | Self::DebaterNotFound { .. }
            | Self::NoRound { .. } => ErrorKind::NotFound,
            Self::ModeMismatch { .. } => ErrorKind::ModeMismatch,
            Self::ProjectExists { .. }
            | Self::DuplicateId { .. }
            | Self::InvalidTransition { .. }
            | Self::NotCurrentStage { .. }
            | Self::MissingDependency { .. }
            | Self::DependencyCycle { .. }
            | Self::RoundPhase { .. }
            | Self::Validation { .. } => ErrorKind::Validation,
            Self::Contention { .. } => ErrorKind::Contention,
            Self::CorruptStore { .. } => ErrorKind::CorruptStore,
            Self::Io(_) | Self::Json(_) => ErrorKind::Internal,
        }
    }

    /// Process exit code
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Only lock contention succeeds on plain re-invocation.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Contention { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Get recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ProjectNotFound { .. } => {
                "Create the project with `init`, or run `list` to see known projects."
            }
            Self::TaskNotFound { .. } => "Run `status` to list the project's tasks.",
            Self::DebaterNotFound { .. } => "Register the debater with `add-debater` first.",
            Self::NoRound { .. } => "Open a round with `round start`.",
            Self::ModeMismatch { .. } => {
                "Use the command for this project's mode: linear uses `next`, dag uses \
                 `add`/`ready`, debate uses `add-debater`/`round`."
            }
            Self::ProjectExists { .. } => {
                "Pick another name, `reset` the existing project, or pass --force to replace it."
            }
            Self::DuplicateId { .. } => "Ids are unique within a project; choose a new id.",
            Self::InvalidTransition { .. } => {
                "Legal moves: pending -> in-progress -> done|failed|skipped, and \
                 done|failed|skipped -> pending as an explicit override."
            }
            Self::NotCurrentStage { .. } => {
                "Linear stages run in order. Finish the current stage (see `next`) first."
            }
            Self::MissingDependency { .. } => "Add the dependency task before its dependents.",
            Self::DependencyCycle { .. } => "Remove the edge that closes the cycle.",
            Self::RoundPhase { .. } => {
                "Round protocol: start -> submit (every debater) -> cross-review -> synthesize. \
                 Check `round status`."
            }
            Self::Validation { .. } => "Check the command arguments and try again.",
            Self::Contention { .. } => {
                "Another command holds the project lock. Retry shortly or raise \
                 --lock-timeout-ms."
            }
            Self::CorruptStore { .. } => {
                "Inspect the record by hand. The previous version may be in the \
                 `.json.backup` file next to it."
            }
            Self::Io(_) => "Check that the data directory exists and is writable.",
            Self::Json(_) => "Internal serialization failure; report this as a bug.",
        }
    }

    /// Machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound { .. } => "PROJECT_NOT_FOUND",
            Self::TaskNotFound { .. } => "TASK_NOT_FOUND",
            Self::DebaterNotFound { .. } => "DEBATER_NOT_FOUND",
            Self::NoRound { .. } => "NO_ROUND",
            Self::ModeMismatch { .. } => "MODE_MISMATCH",
            Self::ProjectExists { .. } => "PROJECT_EXISTS",
            Self::DuplicateId { .. } => "DUPLICATE_ID",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::NotCurrentStage { .. } => "NOT_CURRENT_STAGE",
            Self::MissingDependency { .. } => "MISSING_DEPENDENCY",
            Self::DependencyCycle { .. } => "DEPENDENCY_CYCLE",
            Self::RoundPhase { .. } => "INVALID_ROUND_PHASE",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Contention { .. } => "LOCK_TIMEOUT",
            Self::CorruptStore { .. } => "CORRUPT_STORE",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
        }
    }

    /// Convert to structured error for `--json` output
    pub fn to_structured(&self) -> StructuredError {
        let mut structured =
            StructuredError::new(self.code(), self.to_string(), self.recovery_suggestion())
                .with_context("kind", self.kind().to_string());

        structured = match self {
            Self::ProjectNotFound { project }
            | Self::NoRound { project }
            | Self::ProjectExists { project } => structured.with_context("project", project.as_str()),
            Self::TaskNotFound { project, task } | Self::NotCurrentStage { project, task, .. } => {
                structured
                    .with_context("project", project.as_str())
                    .with_context("task", task.as_str())
            }
            Self::DebaterNotFound { project, debater } => structured
                .with_context("project", project.as_str())
                .with_context("debater", debater.as_str()),
            Self::ModeMismatch {
                project,
                command,
                actual,
                ..
            } => structured
                .with_context("project", project.as_str())
                .with_context("command", command.as_str())
                .with_context("mode", actual.to_string()),
            Self::DuplicateId { project, kind, id } => structured
                .with_context("project", project.as_str())
                .with_context("entity", *kind)
                .with_context("id", id.as_str()),
            Self::InvalidTransition {
                project,
                task,
                from,
                to,
            } => structured
                .with_context("project", project.as_str())
                .with_context("task", task.as_str())
                .with_context("from", from.to_string())
                .with_context("to", to.to_string()),
            Self::MissingDependency {
                project,
                task,
                dependency,
            } => structured
                .with_context("project", project.as_str())
                .with_context("task", task.as_str())
                .with_context("dependency", dependency.as_str()),
            Self::DependencyCycle { project, cycle } => structured
                .with_context("project", project.as_str())
                .with_context("cycle", cycle.clone()),
            Self::RoundPhase {
                project,
                round,
                phase,
                action,
                ..
            } => structured
                .with_context("project", project.as_str())
                .with_context("round", *round)
                .with_context("phase", phase.to_string())
                .with_context("action", action.as_str()),
            Self::Contention {
                project, waited_ms, ..
            } => structured
                .with_context("project", project.as_str())
                .with_context("waited_ms", *waited_ms),
            Self::CorruptStore { path, .. } => {
                structured.with_context("path", path.display().to_string())
            }
            Self::Validation { .. } | Self::Io(_) | Self::Json(_) => structured,
        };

        if self.is_retryable() {
            structured.retryable()
        } else {
            structured
        }
    }
}
