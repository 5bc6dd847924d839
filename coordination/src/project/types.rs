//! Persisted project record and its owned entities.
//!
//! The whole record is serialized as one JSON document. Every field added
//! after the first schema carries `#[serde(default)]` so older records keep
//! loading, and unknown fields are ignored so older binaries can read newer
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::status::TaskStatus;
use crate::debate::Round;
use crate::error::{CoordError, CoordResult};

/// Current record schema version.
pub const SCHEMA_VERSION: u32 = 1;

/// Actor recorded for mutations not attributable to a task or debater.
pub const SYSTEM_ACTOR: &str = "system";

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Coordination mode, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Ordered pipeline of stages.
    Linear,
    /// Tasks with explicit dependency edges.
    Dag,
    /// Multi-round argument between debaters.
    Debate,
}

impl Mode {
    pub fn all() -> &'static [Mode] {
        &[Self::Linear, Self::Dag, Self::Debate]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Dag => "dag",
            Self::Debate => "debate",
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                CoordError::validation(format!("unknown mode '{}' (valid: linear, dag, debate)", s))
            })
    }
}

/// A unit of work: a stage in linear mode, a graph node in dag mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Advisory worker label for the external dispatcher.
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub description: String,
    /// Dag mode only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    /// Opaque result text, last write wins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// New pending task; the agent label defaults to the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            agent: id.clone(),
            id,
            description: String::new(),
            dependencies: Vec::new(),
            status: TaskStatus::Pending,
            result: None,
            assigned_at: None,
            completed_at: None,
        }
    }

    pub fn with_agent(mut self, agent: Option<String>) -> Self {
        if let Some(agent) = agent.filter(|a| !a.trim().is_empty()) {
            self.agent = agent;
        }
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description.unwrap_or_default();
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Apply an already-validated status change and stamp the timestamps.
    pub(crate) fn set_status(&mut self, to: TaskStatus, now: DateTime<Utc>) {
        match to {
            TaskStatus::InProgress => self.assigned_at = Some(now),
            TaskStatus::Done | TaskStatus::Failed | TaskStatus::Skipped => {
                self.completed_at = Some(now)
            }
            TaskStatus::Pending => {
                self.assigned_at = None;
                self.completed_at = None;
            }
        }
        self.status = to;
    }

    /// Same identity and definition, fresh lifecycle state.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            id: self.id.clone(),
            agent: self.agent.clone(),
            description: self.description.clone(),
            dependencies: self.dependencies.clone(),
            ..Self::new(self.id.clone())
        }
    }
}

/// A debate participant. Perspective is immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debater {
    pub id: String,
    #[serde(default)]
    pub agent: String,
    #[serde(default)]
    pub perspective: String,
    pub added_at: DateTime<Utc>,
}

impl Debater {
    pub fn new(id: impl Into<String>, perspective: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            agent: id.clone(),
            id,
            perspective: perspective.into(),
            added_at: Utc::now(),
        }
    }

    pub fn with_agent(mut self, agent: Option<String>) -> Self {
        if let Some(agent) = agent.filter(|a| !a.trim().is_empty()) {
            self.agent = agent;
        }
        self
    }
}

/// One applied mutation. Never rewritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    /// Task id, debater id, or [`SYSTEM_ACTOR`].
    pub actor: String,
    pub action: String,
    pub description: String,
}

impl LogEntry {
    pub fn new(
        actor: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            actor: actor.into(),
            action: action.into(),
            description: description.into(),
        }
    }

    /// Single-line rendering for text output.
    pub fn to_log_line(&self) -> String {
        format!(
            "{} | {} | {} | {}",
            self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            self.actor,
            self.action,
            self.description
        )
    }
}

/// Top-level aggregate. One record per project, keyed by `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub name: String,
    pub mode: Mode,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Linear mode cursor into `tasks`.
    #[serde(default)]
    pub current_stage: usize,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub debaters: Vec<Debater>,
    #[serde(default)]
    pub rounds: Vec<Round>,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl Project {
    pub fn new(name: impl Into<String>, mode: Mode, goal: impl Into<String>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            name: name.into(),
            mode,
            goal: goal.into(),
            workspace: None,
            created_at: Utc::now(),
            current_stage: 0,
            tasks: Vec::new(),
            debaters: Vec::new(),
            rounds: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn with_workspace(mut self, workspace: Option<String>) -> Self {
        self.workspace = workspace.filter(|w| !w.is_empty());
        self
    }

    /// Fail with `ModeMismatch` unless the project runs in one of `allowed`.
    pub fn ensure_mode(&self, command: &str, allowed: &[Mode]) -> CoordResult<()> {
        if allowed.contains(&self.mode) {
            return Ok(());
        }
        let expected: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
        Err(CoordError::ModeMismatch {
            project: self.name.clone(),
            command: command.to_string(),
            actual: self.mode,
            expected: expected.join(" or "),
        })
    }

    pub fn task_index(&self, id: &str) -> CoordResult<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CoordError::task_not_found(&self.name, id))
    }

    pub fn task(&self, id: &str) -> CoordResult<&Task> {
        self.task_index(id).map(|i| &self.tasks[i])
    }

    pub fn task_mut(&mut self, id: &str) -> CoordResult<&mut Task> {
        let index = self.task_index(id)?;
        Ok(&mut self.tasks[index])
    }

    pub fn has_task(&self, id: &str) -> bool {
        self.tasks.iter().any(|t| t.id == id)
    }

    pub fn debater(&self, id: &str) -> CoordResult<&Debater> {
        self.debaters
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| CoordError::debater_not_found(&self.name, id))
    }

    pub fn has_debater(&self, id: &str) -> bool {
        self.debaters.iter().any(|d| d.id == id)
    }

    pub fn debater_ids(&self) -> Vec<&str> {
        self.debaters.iter().map(|d| d.id.as_str()).collect()
    }

    /// Append to the execution log.
    pub fn record(
        &mut self,
        actor: impl Into<String>,
        action: impl Into<String>,
        description: impl Into<String>,
    ) {
        self.log.push(LogEntry::new(actor, action, description));
    }

    /// Clear owned state, keeping identity, mode, goal and workspace.
    ///
    /// Linear stages are part of the project definition: they come back fresh
    /// rather than disappearing.
    pub fn clear_state(&mut self) {
        self.tasks = match self.mode {
            Mode::Linear => self.tasks.iter().map(Task::fresh).collect(),
            Mode::Dag | Mode::Debate => Vec::new(),
        };
        self.current_stage = 0;
        self.debaters.clear();
        self.rounds.clear();
        self.log.clear();
    }
}

/// Check an id used as a task, stage or debater key.
pub fn validate_id(kind: &str, id: &str) -> CoordResult<()> {
    if id.trim().is_empty() {
        return Err(CoordError::validation(format!("{} id must not be empty", kind)));
    }
    if id.chars().any(|c| c.is_whitespace() || c == ',') {
        return Err(CoordError::validation(format!(
            "{} id '{}' must not contain whitespace or commas",
            kind, id
        )));
    }
    Ok(())
}
