//! `status` snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::round::RoundSummary;
use super::{preview, TextReport};
use crate::debate::Round;
use crate::project::{Debater, Mode, Project, Task, TaskStatus};
use crate::scheduler::dag;

const RESULT_PREVIEW: usize = 60;

/// Task count per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub done: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl StatusCounts {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        let mut counts = Self {
            total: tasks.len(),
            ..Self::default()
        };
        for task in tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Failed => counts.failed += 1,
                TaskStatus::Skipped => counts.skipped += 1,
            }
        }
        counts
    }
}

/// A task with its scheduling flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskLine {
    #[serde(flatten)]
    pub task: Task,
    /// Linear: under the cursor.
    #[serde(default)]
    pub current: bool,
    /// Dag: in the ready-set.
    #[serde(default)]
    pub ready: bool,
}

/// Mode-specific part of the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusDetail {
    Linear {
        current_stage: usize,
        stages: Vec<TaskLine>,
    },
    Dag {
        tasks: Vec<TaskLine>,
    },
    /// Full rounds: arguments, critiques and syntheses included.
    Debate {
        debaters: Vec<Debater>,
        rounds: Vec<Round>,
    },
}

/// Point-in-time view of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub project: String,
    pub mode: Mode,
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub created_at: DateTime<Utc>,
    pub counts: StatusCounts,
    pub detail: StatusDetail,
}

impl StatusReport {
    pub fn build(project: &Project) -> Self {
        let detail = match project.mode {
            Mode::Linear => StatusDetail::Linear {
                current_stage: project.current_stage,
                stages: project
                    .tasks
                    .iter()
                    .enumerate()
                    .map(|(i, t)| TaskLine {
                        task: t.clone(),
                        current: i == project.current_stage,
                        ready: false,
                    })
                    .collect(),
            },
            Mode::Dag => {
                let ready = dag::ready_ids(project);
                StatusDetail::Dag {
                    tasks: project
                        .tasks
                        .iter()
                        .map(|t| TaskLine {
                            task: t.clone(),
                            current: false,
                            ready: ready.contains(&t.id),
                        })
                        .collect(),
                }
            }
            Mode::Debate => StatusDetail::Debate {
                debaters: project.debaters.clone(),
                rounds: project.rounds.clone(),
            },
        };

        Self {
            project: project.name.clone(),
            mode: project.mode,
            goal: project.goal.clone(),
            workspace: project.workspace.clone(),
            created_at: project.created_at,
            counts: StatusCounts::from_tasks(&project.tasks),
            detail,
        }
    }
}

fn task_line_text(line: &TaskLine, prefix: &str) -> Vec<String> {
    let task = &line.task;
    let mut head = format!("  {} {}{}", task.status.marker(), prefix, task.id);
    if task.agent != task.id {
        head.push_str(&format!(" (agent: {})", task.agent));
    }
    if !task.dependencies.is_empty() {
        head.push_str(&format!(" <- {}", task.dependencies.join(", ")));
    }
    head.push_str(&format!(" — {}", task.status));
    if line.current {
        head.push_str("  <== current");
    }
    if line.ready {
        head.push_str("  <== ready");
    }

    let mut lines = vec![head];
    if !task.description.is_empty() {
        lines.push(format!("        {}", task.description));
    }
    if let Some(result) = &task.result {
        lines.push(format!("        result: {}", preview(result, RESULT_PREVIEW)));
    }
    lines
}

fn round_text(round: &Round) -> Vec<String> {
    let mut lines = vec![format!("  {}", RoundSummary::from_round(round).to_text())];
    for (debater, argument) in &round.submissions {
        lines.push(format!("    {}: {}", debater, preview(&argument.text, RESULT_PREVIEW)));
    }
    for (reviewer, targets) in &round.critiques {
        for (target, critique) in targets {
            lines.push(format!(
                "    {} on {}: {}",
                reviewer,
                target,
                preview(&critique.text, RESULT_PREVIEW)
            ));
        }
    }
    if let Some(synthesis) = &round.synthesis {
        lines.push(format!("    synthesis: {}", preview(&synthesis.text, RESULT_PREVIEW)));
    }
    lines
}

impl TextReport for StatusReport {
    fn to_text(&self) -> String {
        let mut out = vec![format!("Project: {}  mode: {}", self.project, self.mode)];
        if !self.goal.is_empty() {
            out.push(format!("Goal: {}", self.goal));
        }
        if let Some(workspace) = &self.workspace {
            out.push(format!("Workspace: {}", workspace));
        }

        match &self.detail {
            StatusDetail::Linear {
                current_stage,
                stages,
            } => {
                out.push(format!(
                    "Progress: {}/{} done",
                    self.counts.done, self.counts.total
                ));
                if *current_stage >= stages.len() {
                    out.push("Pipeline complete".to_string());
                }
                out.push(String::new());
                for (i, line) in stages.iter().enumerate() {
                    out.extend(task_line_text(line, &format!("[{}] ", i)));
                }
            }
            StatusDetail::Dag { tasks } => {
                out.push(format!(
                    "Progress: {}/{} done, {} in progress",
                    self.counts.done, self.counts.total, self.counts.in_progress
                ));
                out.push(String::new());
                if tasks.is_empty() {
                    out.push("  (no tasks)".to_string());
                }
                for line in tasks {
                    out.extend(task_line_text(line, ""));
                }
            }
            StatusDetail::Debate { debaters, rounds } => {
                out.push(String::new());
                out.push(format!("Debaters ({}):", debaters.len()));
                for d in debaters {
                    if d.perspective.is_empty() {
                        out.push(format!("  - {}", d.id));
                    } else {
                        out.push(format!("  - {} — {}", d.id, d.perspective));
                    }
                }
                out.push(format!("Rounds ({}):", rounds.len()));
                for r in rounds {
                    out.extend(round_text(r));
                }
            }
        }
        out.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{self, linear};

    #[test]
    fn test_linear_status_marks_cursor() {
        let mut p = Project::new("p", Mode::Linear, "ship");
        p.tasks = linear::stages_from(&["a".to_string(), "b".to_string()]).unwrap();
        scheduler::transition(&mut p, "a", TaskStatus::InProgress).unwrap();
        scheduler::transition(&mut p, "a", TaskStatus::Done).unwrap();

        let report = StatusReport::build(&p);
        assert_eq!(report.counts.done, 1);
        match &report.detail {
            StatusDetail::Linear { stages, current_stage } => {
                assert_eq!(*current_stage, 1);
                assert!(!stages[0].current);
                assert!(stages[1].current);
            }
            other => panic!("unexpected {:?}", other),
        }
        let text = report.to_text();
        assert!(text.contains("[1] b"));
        assert!(text.contains("<== current"));
    }

    #[test]
    fn test_dag_status_flags_ready() {
        let mut p = Project::new("p", Mode::Dag, "");
        dag::add_task(&mut p, Task::new("a")).unwrap();
        dag::add_task(&mut p, Task::new("b").with_dependencies(vec!["a".into()])).unwrap();
        let report = StatusReport::build(&p);
        match &report.detail {
            StatusDetail::Dag { tasks } => {
                assert!(tasks[0].ready);
                assert!(!tasks[1].ready);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_debate_status_carries_round_contents() {
        use crate::debate::{DebateCoordinator, RoundAction};

        let mut p = Project::new("d", Mode::Debate, "tabs or spaces");
        {
            let mut coord = DebateCoordinator::new(&mut p, "round").unwrap();
            coord.add_debater(Debater::new("a", "tabs")).unwrap();
            coord.add_debater(Debater::new("b", "spaces")).unwrap();
            coord.apply(RoundAction::Start).unwrap();
            coord.submit("a", "alignment is personal").unwrap();
            coord.submit("b", "one width everywhere").unwrap();
            coord.cross_review().unwrap();
            coord
                .critique("a", &["b".to_string()], "editors disagree")
                .unwrap();
            coord.synthesize("spaces in shared code").unwrap();
        }

        let report = StatusReport::build(&p);
        let json = serde_json::to_value(&report).unwrap();
        let round = &json["detail"]["rounds"][0];
        assert_eq!(round["submissions"]["a"]["text"], "alignment is personal");
        assert_eq!(round["critiques"]["a"]["b"]["text"], "editors disagree");
        assert_eq!(round["synthesis"]["text"], "spaces in shared code");

        let text = report.to_text();
        assert!(text.contains("b: one width everywhere"));
        assert!(text.contains("a on b: editors disagree"));
        assert!(text.contains("synthesis: spaces in shared code"));
    }

    #[test]
    fn test_json_shape() {
        let p = Project::new("p", Mode::Dag, "g");
        let json = serde_json::to_value(StatusReport::build(&p)).unwrap();
        assert_eq!(json["mode"], "dag");
        assert_eq!(json["detail"]["kind"], "dag");
        assert_eq!(json["counts"]["total"], 0);
    }
}
