//! Task scheduling for linear and dag projects.
//!
//! Status changes go through [`transition`], which applies the shared task
//! state machine and then hands off to the mode's scheduler:
//!
//! ```text
//! update(task, to)
//!   ├─ status check   from.can_transition_to(to)      (both modes)
//!   ├─ linear         only the cursor stage may start; done advances cursor
//!   └─ dag            done reports tasks that just became ready
//! ```

pub mod dag;
pub mod linear;

use chrono::Utc;
use serde::{Deserialize, Serialize};

pub use dag::{BlockedTask, BlockingDependency, DagView, ReadyState, Readiness};
pub use linear::{CursorMove, NextStage};

use crate::error::{CoordError, CoordResult};
use crate::project::{Mode, Project, TaskStatus};

const RESULT_PREVIEW_CHARS: usize = 80;

/// What a status change did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub project: String,
    pub task: String,
    pub from: TaskStatus,
    pub to: TaskStatus,
    /// Linear projects only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<CursorMove>,
    /// Dag tasks that entered the ready-set because of this change.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unblocked: Vec<String>,
}

impl TransitionOutcome {
    /// A linear pipeline just ran its last stage.
    pub fn pipeline_complete(&self) -> bool {
        matches!(&self.cursor, Some(CursorMove::Advanced { to: None }))
    }
}

/// Validate and apply a task status change.
pub fn transition(
    project: &mut Project,
    task_id: &str,
    to: TaskStatus,
) -> CoordResult<TransitionOutcome> {
    project.ensure_mode("update", &[Mode::Linear, Mode::Dag])?;
    let index = project.task_index(task_id)?;
    let from = project.tasks[index].status;

    if !from.can_transition_to(to) {
        return Err(CoordError::InvalidTransition {
            project: project.name.clone(),
            task: task_id.to_string(),
            from,
            to,
        });
    }
    if project.mode == Mode::Linear {
        linear::check_transition(project, index, to)?;
    }

    let ready_before = match project.mode {
        Mode::Dag if to == TaskStatus::Done => dag::ready_ids(project),
        _ => Vec::new(),
    };

    project.tasks[index].set_status(to, Utc::now());
    let description = if from.is_override(to) {
        format!("{} -> {} (override)", from, to)
    } else {
        format!("{} -> {}", from, to)
    };
    project.record(task_id, "update", description);

    let mut outcome = TransitionOutcome {
        project: project.name.clone(),
        task: task_id.to_string(),
        from,
        to,
        cursor: None,
        unblocked: Vec::new(),
    };

    match project.mode {
        Mode::Linear => {
            outcome.cursor = Some(linear::after_transition(project, index, to));
        }
        Mode::Dag if to == TaskStatus::Done => {
            outcome.unblocked = dag::ready_ids(project)
                .into_iter()
                .filter(|id| !ready_before.contains(id))
                .collect();
        }
        _ => {}
    }

    Ok(outcome)
}

/// Attach result text to a task. Status is left alone; last write wins.
pub fn record_result(project: &mut Project, task_id: &str, text: &str) -> CoordResult<bool> {
    project.ensure_mode("result", &[Mode::Linear, Mode::Dag])?;
    let task = project.task_mut(task_id)?;
    let replaced = task.result.replace(text.to_string()).is_some();

    let preview: String = text.chars().take(RESULT_PREVIEW_CHARS).collect();
    let ellipsis = if text.chars().count() > RESULT_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };
    project.record(task_id, "result", format!("{}{}", preview, ellipsis));
    Ok(replaced)
}
