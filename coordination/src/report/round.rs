//! Debate round projections: per-round summaries, `round status`, and the
//! review prompts handed to debaters during cross-review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TextReport;
use crate::debate::{Round, RoundPhase};
use crate::error::{CoordError, CoordResult};
use crate::project::{Mode, Project};

/// Compact view of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub number: u32,
    pub phase: RoundPhase,
    pub started_at: DateTime<Utc>,
    pub submissions: usize,
    pub critiques: usize,
    pub synthesized: bool,
}

impl RoundSummary {
    pub fn from_round(round: &Round) -> Self {
        Self {
            number: round.number,
            phase: round.phase,
            started_at: round.started_at,
            submissions: round.submissions.len(),
            critiques: round.critique_count(),
            synthesized: round.synthesis.is_some(),
        }
    }
}

impl TextReport for RoundSummary {
    fn to_text(&self) -> String {
        format!(
            "round {} [{}] {} submissions, {} critiques{}",
            self.number,
            self.phase,
            self.submissions,
            self.critiques,
            if self.synthesized { ", synthesized" } else { "" }
        )
    }
}

/// One debater's standing in the latest round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebaterRoundState {
    pub id: String,
    pub agent: String,
    pub perspective: String,
    pub submitted: bool,
    /// Peers this debater has critiqued.
    pub critiqued: Vec<String>,
}

/// `round status`: the latest round, per debater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundStatus {
    pub project: String,
    pub total_rounds: usize,
    /// `None` before the first `round start`.
    pub round: Option<RoundSummary>,
    pub debaters: Vec<DebaterRoundState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<String>,
}

impl RoundStatus {
    pub fn build(project: &Project) -> CoordResult<Self> {
        project.ensure_mode("round status", &[Mode::Debate])?;
        let latest = project.rounds.last();

        let debaters = project
            .debaters
            .iter()
            .map(|d| DebaterRoundState {
                id: d.id.clone(),
                agent: d.agent.clone(),
                perspective: d.perspective.clone(),
                submitted: latest.is_some_and(|r| r.has_submitted(&d.id)),
                critiqued: latest
                    .and_then(|r| r.critiques.get(&d.id))
                    .map(|targets| targets.keys().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(Self {
            project: project.name.clone(),
            total_rounds: project.rounds.len(),
            round: latest.map(RoundSummary::from_round),
            debaters,
            synthesis: latest
                .and_then(|r| r.synthesis.as_ref())
                .map(|s| s.text.clone()),
        })
    }

    /// Debaters still owing an argument in the latest round.
    pub fn awaiting(&self) -> Vec<&str> {
        match &self.round {
            Some(r) if r.phase == RoundPhase::Open => self
                .debaters
                .iter()
                .filter(|d| !d.submitted)
                .map(|d| d.id.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl TextReport for RoundStatus {
    fn to_text(&self) -> String {
        let Some(round) = &self.round else {
            return format!(
                "Project '{}': no rounds yet ({} debaters). Open one with `round start`.",
                self.project,
                self.debaters.len()
            );
        };

        let mut out = vec![format!("Project '{}': {}", self.project, round.to_text())];
        for d in &self.debaters {
            let mark = if d.submitted { "[x]" } else { "[ ]" };
            let mut line = format!("  {} {}", mark, d.id);
            if !d.critiqued.is_empty() {
                line.push_str(&format!("  critiqued: {}", d.critiqued.join(", ")));
            }
            out.push(line);
        }
        let awaiting = self.awaiting();
        if !awaiting.is_empty() {
            out.push(format!("Awaiting: {}", awaiting.join(", ")));
        }
        if let Some(synthesis) = &self.synthesis {
            out.push(String::new());
            out.push(format!("Synthesis:\n{}", synthesis));
        }
        out.join("\n")
    }
}

/// A peer argument to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerArgument {
    pub debater: String,
    pub perspective: String,
    pub text: String,
}

/// What one debater is asked to review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPrompt {
    pub reviewer: String,
    pub agent: String,
    pub perspective: String,
    pub peers: Vec<PeerArgument>,
}

/// Review prompts for every debater in the latest round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewPrompts {
    pub project: String,
    pub goal: String,
    pub round: u32,
    pub prompts: Vec<ReviewPrompt>,
}

impl ReviewPrompts {
    /// Available once the latest round has reached cross-review.
    pub fn build(project: &Project) -> CoordResult<Self> {
        project.ensure_mode("round prompts", &[Mode::Debate])?;
        let round = project.rounds.last().ok_or_else(|| CoordError::NoRound {
            project: project.name.clone(),
        })?;
        if round.phase == RoundPhase::Open {
            return Err(CoordError::RoundPhase {
                project: project.name.clone(),
                round: round.number,
                phase: round.phase,
                action: "build review prompts for".to_string(),
                reason: "arguments are still being collected".to_string(),
            });
        }

        let prompts = project
            .debaters
            .iter()
            .map(|reviewer| ReviewPrompt {
                reviewer: reviewer.id.clone(),
                agent: reviewer.agent.clone(),
                perspective: reviewer.perspective.clone(),
                peers: project
                    .debaters
                    .iter()
                    .filter(|peer| peer.id != reviewer.id)
                    .filter_map(|peer| {
                        round.submissions.get(&peer.id).map(|c| PeerArgument {
                            debater: peer.id.clone(),
                            perspective: peer.perspective.clone(),
                            text: c.text.clone(),
                        })
                    })
                    .collect(),
            })
            .collect();

        Ok(Self {
            project: project.name.clone(),
            goal: project.goal.clone(),
            round: round.number,
            prompts,
        })
    }
}

impl TextReport for ReviewPrompts {
    fn to_text(&self) -> String {
        let mut out = Vec::new();
        for prompt in &self.prompts {
            out.push(format!(
                "=== Review prompt for {} (round {}) ===",
                prompt.reviewer, self.round
            ));
            if !self.goal.is_empty() {
                out.push(format!("Question: {}", self.goal));
            }
            if !prompt.perspective.is_empty() {
                out.push(format!("Your perspective: {}", prompt.perspective));
            }
            out.push("Review these arguments from the other debaters:".to_string());
            for peer in &prompt.peers {
                out.push(String::new());
                if peer.perspective.is_empty() {
                    out.push(format!("--- {} ---", peer.debater));
                } else {
                    out.push(format!("--- {} ({}) ---", peer.debater, peer.perspective));
                }
                out.push(peer.text.clone());
            }
            out.push(String::new());
        }
        out.join("\n")
    }
}
