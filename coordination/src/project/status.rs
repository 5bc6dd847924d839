//! Task status state machine.
//!
//! ```text
//! pending ──► in-progress ──► done | failed | skipped
//!    ▲                              │
//!    └──────── operator override ───┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::CoordError;

/// Status of a task or linear stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Created, never started (or reset by the operator).
    #[default]
    Pending,
    /// Claimed by a worker.
    InProgress,
    /// Finished successfully.
    Done,
    /// Finished unsuccessfully.
    Failed,
    /// Abandoned by the worker or operator.
    Skipped,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub fn all() -> &'static [TaskStatus] {
        &[
            Self::Pending,
            Self::InProgress,
            Self::Done,
            Self::Failed,
            Self::Skipped,
        ]
    }

    /// Whether this is a terminal status for scheduling purposes.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Skipped)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(self) -> &'static [TaskStatus] {
        match self {
            Self::Pending => &[Self::InProgress],
            Self::InProgress => &[Self::Done, Self::Failed, Self::Skipped],
            Self::Done | Self::Failed | Self::Skipped => &[Self::Pending],
        }
    }

    pub fn can_transition_to(self, to: TaskStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Terminal back to pending. Never applied automatically.
    pub fn is_override(self, to: TaskStatus) -> bool {
        self.is_terminal() && to == Self::Pending
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }

    /// Fixed-width marker for text reports.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Pending => "[ ]",
            Self::InProgress => "[~]",
            Self::Done => "[x]",
            Self::Failed => "[!]",
            Self::Skipped => "[-]",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::all().iter().map(|s| s.as_str()).collect();
                CoordError::validation(format!(
                    "invalid status '{}' (valid: {})",
                    s,
                    valid.join(", ")
                ))
            })
    }
}
