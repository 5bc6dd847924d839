//! Text renderings for command outcomes and scheduling answers.

use super::TextReport;
use crate::debate::{RoundOutcome, RoundPhase};
use crate::scheduler::{CursorMove, NextStage, ReadyState, Readiness, TransitionOutcome};

impl TextReport for NextStage {
    fn to_text(&self) -> String {
        match self {
            Self::Complete { total } => format!("All {} stages complete", total),
            Self::Current {
                index,
                total,
                stage,
            } => {
                let mut out = format!(
                    "Next stage: {} (agent: {}) [{}/{}] {}",
                    stage.id,
                    stage.agent,
                    index + 1,
                    total,
                    stage.status
                );
                if !stage.description.is_empty() {
                    out.push_str(&format!("\n  {}", stage.description));
                }
                out
            }
        }
    }
}

impl TextReport for Readiness {
    fn to_text(&self) -> String {
        match self.state {
            ReadyState::Empty => "No tasks yet. Add some with `add`.".to_string(),
            ReadyState::AllComplete => "All tasks complete".to_string(),
            ReadyState::Dispatchable => {
                let mut out = vec![format!("Ready to dispatch ({}):", self.ready.len())];
                for task in &self.ready {
                    let mut line = format!("  {} (agent: {})", task.id, task.agent);
                    if !task.description.is_empty() {
                        line.push_str(&format!(": {}", task.description));
                    }
                    out.push(line);
                }
                out.join("\n")
            }
            ReadyState::Waiting => {
                let mut out = vec!["Nothing ready; waiting on:".to_string()];
                if !self.in_progress.is_empty() {
                    out.push(format!("  in progress: {}", self.in_progress.join(", ")));
                }
                for blocked in &self.blocked {
                    let deps: Vec<String> = blocked
                        .waiting_on
                        .iter()
                        .map(|d| match d.status {
                            Some(status) => format!("{} ({})", d.id, status),
                            None => format!("{} (missing)", d.id),
                        })
                        .collect();
                    out.push(format!("  {} <- {}", blocked.id, deps.join(", ")));
                }
                out.join("\n")
            }
        }
    }
}

impl TextReport for TransitionOutcome {
    fn to_text(&self) -> String {
        let mut out = vec![format!(
            "{}: {} -> {}",
            self.task, self.from, self.to
        )];
        match &self.cursor {
            Some(CursorMove::Advanced { to: Some(next) }) => {
                out.push(format!("Advanced to stage '{}'", next))
            }
            Some(CursorMove::Advanced { to: None }) => out.push("Pipeline complete".to_string()),
            Some(CursorMove::Rewound { to }) => {
                out.push(format!("Cursor moved back to stage '{}'", to))
            }
            Some(CursorMove::Unchanged) | None => {}
        }
        if !self.unblocked.is_empty() {
            out.push(format!("Now ready: {}", self.unblocked.join(", ")));
        }
        out.join("\n")
    }
}

impl TextReport for RoundOutcome {
    fn to_text(&self) -> String {
        let mut out = format!("round {} {}: now {}", self.round, self.action, self.phase);
        if self.replaced {
            out.push_str(" (replaced earlier entry)");
        }
        if self.phase == RoundPhase::Open && !self.awaiting.is_empty() {
            out.push_str(&format!("\nAwaiting: {}", self.awaiting.join(", ")));
        }
        if self.phase == RoundPhase::Open && self.awaiting.is_empty() && self.action == "submit" {
            out.push_str("\nAll debaters have submitted; run `round cross-review`");
        }
        out
    }
}
