//! `log` projection: the execution log plus the latest result per task.

use serde::{Deserialize, Serialize};

use super::TextReport;
use crate::project::{LogEntry, Project, TaskStatus};

/// Latest recorded result of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task: String,
    pub status: TaskStatus,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogReport {
    pub project: String,
    /// Entries in append order, optionally only the last `tail`.
    pub entries: Vec<LogEntry>,
    /// Total entries in the record, before any `tail`.
    pub total_entries: usize,
    pub results: Vec<TaskResult>,
}

impl LogReport {
    pub fn build(project: &Project, tail: Option<usize>) -> Self {
        let skip = tail
            .map(|n| project.log.len().saturating_sub(n))
            .unwrap_or(0);
        Self {
            project: project.name.clone(),
            entries: project.log[skip..].to_vec(),
            total_entries: project.log.len(),
            results: project
                .tasks
                .iter()
                .filter_map(|t| {
                    t.result.as_ref().map(|r| TaskResult {
                        task: t.id.clone(),
                        status: t.status,
                        result: r.clone(),
                    })
                })
                .collect(),
        }
    }
}

impl TextReport for LogReport {
    fn to_text(&self) -> String {
        let mut out = Vec::new();
        if self.entries.is_empty() {
            out.push(format!("Project '{}': log is empty", self.project));
        } else {
            if self.entries.len() < self.total_entries {
                out.push(format!(
                    "(showing last {} of {} entries)",
                    self.entries.len(),
                    self.total_entries
                ));
            }
            out.extend(self.entries.iter().map(LogEntry::to_log_line));
        }

        if !self.results.is_empty() {
            out.push(String::new());
            out.push("Results:".to_string());
            for r in &self.results {
                out.push(format!("  {} {}:", r.status.marker(), r.task));
                out.extend(r.result.lines().map(|l| format!("    {}", l)));
            }
        }
        out.join("\n")
    }
}
