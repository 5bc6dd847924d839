//! Read-only projections of a project record.
//!
//! Every report is a plain serde struct built from a `&Project`; the CLI
//! prints it as JSON or through [`TextReport`]. Building a report never
//! touches the store.

pub mod graph;
pub mod log;
mod outcome;
pub mod round;
pub mod status;

use serde::{Deserialize, Serialize};

pub use graph::{GraphEdge, GraphNode, GraphReport};
pub use log::{LogReport, TaskResult};
pub use round::{
    DebaterRoundState, PeerArgument, ReviewPrompt, ReviewPrompts, RoundStatus, RoundSummary,
};
pub use status::{StatusCounts, StatusDetail, StatusReport, TaskLine};

use crate::project::{Mode, Project};

/// Human-readable rendering alongside the JSON form.
pub trait TextReport {
    fn to_text(&self) -> String;
}

/// One row of `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    /// `None` when the record could not be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub goal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProjectSummary {
    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            mode: Some(project.mode),
            goal: project.goal.clone(),
            error: None,
        }
    }

    pub fn unreadable(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: None,
            goal: String::new(),
            error: Some(error.into()),
        }
    }
}

/// All projects in the store, by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectList {
    pub projects: Vec<ProjectSummary>,
}

impl TextReport for ProjectList {
    fn to_text(&self) -> String {
        if self.projects.is_empty() {
            return "No projects yet. Create one with `init`.".to_string();
        }
        let width = self
            .projects
            .iter()
            .map(|p| p.name.len())
            .max()
            .unwrap_or(0);
        self.projects
            .iter()
            .map(|p| match (&p.mode, &p.error) {
                (Some(mode), _) => format!("{:<width$}  {:<6}  {}", p.name, mode, p.goal),
                (None, Some(err)) => format!("{:<width$}  ??????  unreadable: {}", p.name, err),
                (None, None) => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// First `max` characters of `text`, with an ellipsis when cut.
pub(crate) fn preview(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    let cut: String = first_line.chars().take(max).collect();
    if cut.len() < text.len() {
        format!("{}...", cut)
    } else {
        cut
    }
}
