//! Linear pipeline scheduling.
//!
//! Readiness is positional: the stage under the project's cursor is the only
//! one that may start, and the cursor moves forward only when that stage is
//! done (or when the operator explicitly moves past a failed/skipped stage).

use serde::{Deserialize, Serialize};

use crate::error::{CoordError, CoordResult};
use crate::project::{validate_id, Project, Task, TaskStatus, SYSTEM_ACTOR};

/// Answer to "what runs next" for a linear project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NextStage {
    /// The stage under the cursor, whatever its status.
    Current { index: usize, total: usize, stage: Task },
    /// The cursor has passed the last stage.
    Complete { total: usize },
}

impl NextStage {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn stage_id(&self) -> Option<&str> {
        match self {
            Self::Current { stage, .. } => Some(&stage.id),
            Self::Complete { .. } => None,
        }
    }
}

/// How a status change moved the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CursorMove {
    Unchanged,
    /// Current stage finished; `to` is the new current stage, `None` when
    /// the pipeline is complete.
    Advanced { to: Option<String> },
    /// A stage behind the cursor was reset to pending and is current again.
    Rewound { to: String },
}

/// Build the stage list for a new pipeline.
pub fn stages_from(names: &[String]) -> CoordResult<Vec<Task>> {
    let mut stages: Vec<Task> = Vec::with_capacity(names.len());
    for name in names {
        validate_id("stage", name)?;
        if stages.iter().any(|s| &s.id == name) {
            return Err(CoordError::validation(format!(
                "stage '{}' appears more than once in the pipeline",
                name
            )));
        }
        stages.push(Task::new(name.clone()));
    }
    Ok(stages)
}

/// Current stage or completion.
pub fn next(project: &Project) -> NextStage {
    let total = project.tasks.len();
    match project.tasks.get(project.current_stage) {
        Some(stage) => NextStage::Current {
            index: project.current_stage,
            total,
            stage: stage.clone(),
        },
        None => NextStage::Complete { total },
    }
}

/// Positional gating for an already status-valid transition.
pub(crate) fn check_transition(project: &Project, index: usize, to: TaskStatus) -> CoordResult<()> {
    if to == TaskStatus::InProgress && index != project.current_stage {
        let current = project
            .tasks
            .get(project.current_stage)
            .map(|s| s.id.clone())
            .unwrap_or_else(|| "complete".to_string());
        return Err(CoordError::NotCurrentStage {
            project: project.name.clone(),
            task: project.tasks[index].id.clone(),
            current,
        });
    }
    if to == TaskStatus::Pending && index < project.current_stage {
        if let Some(running) = project.tasks[project.current_stage..]
            .iter()
            .find(|s| s.status == TaskStatus::InProgress)
        {
            return Err(CoordError::validation(format!(
                "cannot reset stage '{}' while stage '{}' is in progress; finish or fail it first",
                project.tasks[index].id, running.id
            )));
        }
    }
    Ok(())
}

/// Move the cursor forward over stages that are already done.
fn skip_done(project: &mut Project) {
    while project
        .tasks
        .get(project.current_stage)
        .is_some_and(|s| s.status == TaskStatus::Done)
    {
        project.current_stage += 1;
    }
}

/// Move the cursor after stage `index` changed to `to`.
pub(crate) fn after_transition(project: &mut Project, index: usize, to: TaskStatus) -> CursorMove {
    if to == TaskStatus::Done && index == project.current_stage {
        // Stages finished before a rewind stay finished.
        skip_done(project);
        let next_id = project.tasks.get(project.current_stage).map(|s| s.id.clone());
        let description = match &next_id {
            Some(id) => format!("auto-advanced to stage '{}'", id),
            None => "pipeline complete".to_string(),
        };
        project.record(SYSTEM_ACTOR, "advance", description);
        return CursorMove::Advanced { to: next_id };
    }

    if to == TaskStatus::Pending && index < project.current_stage {
        project.current_stage = index;
        let id = project.tasks[index].id.clone();
        project.record(SYSTEM_ACTOR, "rewind", format!("cursor moved back to stage '{}'", id));
        return CursorMove::Rewound { to: id };
    }

    CursorMove::Unchanged
}

/// Operator override: move past a failed or skipped current stage.
pub fn advance(project: &mut Project) -> CoordResult<NextStage> {
    let stage = project.tasks.get(project.current_stage).ok_or_else(|| {
        CoordError::validation(format!("pipeline '{}' is already complete", project.name))
    })?;
    if !matches!(stage.status, TaskStatus::Failed | TaskStatus::Skipped) {
        return Err(CoordError::validation(format!(
            "stage '{}' is {}; only a failed or skipped stage can be advanced past",
            stage.id, stage.status
        )));
    }

    let description = format!("operator moved past {} stage '{}'", stage.status, stage.id);
    let actor = stage.id.clone();
    project.current_stage += 1;
    skip_done(project);
    project.record(actor, "advance", description);
    Ok(next(project))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Mode;
    use chrono::Utc;

    fn pipeline(names: &[&str]) -> Project {
        let mut project = Project::new("p", Mode::Linear, "");
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        project.tasks = stages_from(&names).unwrap();
        project
    }

    fn set(project: &mut Project, index: usize, to: TaskStatus) -> CursorMove {
        check_transition(project, index, to).unwrap();
        project.tasks[index].set_status(to, Utc::now());
        after_transition(project, index, to)
    }

    #[test]
    fn test_stages_from_rejects_duplicates() {
        let names = vec!["a".to_string(), "a".to_string()];
        assert!(stages_from(&names).is_err());
    }

    #[test]
    fn test_next_starts_at_first_stage() {
        let project = pipeline(&["x", "y"]);
        assert_eq!(next(&project).stage_id(), Some("x"));
    }

    #[test]
    fn test_done_auto_advances() {
        let mut project = pipeline(&["x", "y"]);
        set(&mut project, 0, TaskStatus::InProgress);
        let moved = set(&mut project, 0, TaskStatus::Done);
        assert_eq!(moved, CursorMove::Advanced { to: Some("y".into()) });
        assert_eq!(next(&project).stage_id(), Some("y"));

        set(&mut project, 1, TaskStatus::InProgress);
        let moved = set(&mut project, 1, TaskStatus::Done);
        assert_eq!(moved, CursorMove::Advanced { to: None });
        assert!(next(&project).is_complete());
    }

    #[test]
    fn test_only_current_stage_may_start() {
        let project = pipeline(&["x", "y"]);
        let err = check_transition(&project, 1, TaskStatus::InProgress).unwrap_err();
        assert!(matches!(err, CoordError::NotCurrentStage { ref current, .. } if current == "x"));
    }

    #[test]
    fn test_failed_stage_holds_cursor() {
        let mut project = pipeline(&["x", "y"]);
        set(&mut project, 0, TaskStatus::InProgress);
        assert_eq!(set(&mut project, 0, TaskStatus::Failed), CursorMove::Unchanged);
        match next(&project) {
            NextStage::Current { stage, .. } => {
                assert_eq!(stage.id, "x");
                assert_eq!(stage.status, TaskStatus::Failed);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_advance_past_skipped() {
        let mut project = pipeline(&["x", "y"]);
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Skipped);
        let next_stage = advance(&mut project).unwrap();
        assert_eq!(next_stage.stage_id(), Some("y"));
        assert_eq!(project.log.last().unwrap().action, "advance");
    }

    #[test]
    fn test_advance_refuses_pending_or_done() {
        let mut project = pipeline(&["x"]);
        assert!(advance(&mut project).is_err());
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Done);
        assert!(advance(&mut project).is_err());
    }

    #[test]
    fn test_reset_behind_cursor_rewinds() {
        let mut project = pipeline(&["x", "y", "z"]);
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Done);
        set(&mut project, 1, TaskStatus::InProgress);
        set(&mut project, 1, TaskStatus::Done);
        assert_eq!(project.current_stage, 2);

        let moved = set(&mut project, 0, TaskStatus::Pending);
        assert_eq!(moved, CursorMove::Rewound { to: "x".into() });
        assert_eq!(next(&project).stage_id(), Some("x"));
        assert!(check_transition(&project, 2, TaskStatus::InProgress).is_err());
    }

    #[test]
    fn test_rewind_refused_while_later_stage_runs() {
        let mut project = pipeline(&["x", "y"]);
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Done);
        set(&mut project, 1, TaskStatus::InProgress);

        let err = check_transition(&project, 0, TaskStatus::Pending).unwrap_err();
        assert!(err.to_string().contains("'y' is in progress"));
        assert_eq!(project.current_stage, 1);
    }

    #[test]
    fn test_redone_stage_skips_finished_stages() {
        let mut project = pipeline(&["x", "y", "z"]);
        for i in 0..2 {
            set(&mut project, i, TaskStatus::InProgress);
            set(&mut project, i, TaskStatus::Done);
        }
        set(&mut project, 0, TaskStatus::Pending);
        set(&mut project, 0, TaskStatus::InProgress);

        let moved = set(&mut project, 0, TaskStatus::Done);
        assert_eq!(moved, CursorMove::Advanced { to: Some("z".into()) });
        assert_eq!(project.current_stage, 2);
    }

    #[test]
    fn test_advance_skips_finished_stages() {
        let mut project = pipeline(&["x", "y"]);
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Done);
        set(&mut project, 1, TaskStatus::InProgress);
        set(&mut project, 1, TaskStatus::Done);
        set(&mut project, 0, TaskStatus::Pending);
        set(&mut project, 0, TaskStatus::InProgress);
        set(&mut project, 0, TaskStatus::Failed);

        assert!(advance(&mut project).unwrap().is_complete());
    }
}
