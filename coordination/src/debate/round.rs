//! Debate round state machine: phases, contributions, and transitions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of a debate round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundPhase {
    /// Collecting one argument per debater.
    Open,
    /// Debaters critique each other's arguments.
    CrossReview,
    /// Synthesis recorded; round closed.
    Synthesized,
}

impl RoundPhase {
    /// Whether this round is finished and a new one may start.
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Synthesized)
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [RoundPhase] {
        match self {
            Self::Open => &[Self::CrossReview],
            Self::CrossReview => &[Self::Synthesized],
            Self::Synthesized => &[],
        }
    }

    pub fn can_transition_to(self, to: RoundPhase) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::CrossReview => write!(f, "cross-review"),
            Self::Synthesized => write!(f, "synthesized"),
        }
    }
}

/// Opaque text contributed to a round, with its recording time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

impl Contribution {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: RoundPhase,
    pub to: RoundPhase,
    pub timestamp: DateTime<Utc>,
}

/// One cycle of the debate protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Round number (1-indexed).
    pub number: u32,
    pub phase: RoundPhase,
    pub started_at: DateTime<Utc>,
    /// Argument per debater id.
    #[serde(default)]
    pub submissions: BTreeMap<String, Contribution>,
    /// Reviewer id → reviewed debater id → critique.
    #[serde(default)]
    pub critiques: BTreeMap<String, BTreeMap<String, Contribution>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<Contribution>,
    #[serde(default)]
    pub transitions: Vec<PhaseTransition>,
}

impl Round {
    pub fn new(number: u32) -> Self {
        Self {
            number,
            phase: RoundPhase::Open,
            started_at: Utc::now(),
            submissions: BTreeMap::new(),
            critiques: BTreeMap::new(),
            synthesis: None,
            transitions: Vec::new(),
        }
    }

    /// Move to `to`, returning the current phase on an illegal move.
    pub fn transition(&mut self, to: RoundPhase) -> Result<(), RoundPhase> {
        if !self.phase.can_transition_to(to) {
            return Err(self.phase);
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
        });
        self.phase = to;
        Ok(())
    }

    /// Record an argument. Returns true when an earlier one was replaced.
    pub fn submit(&mut self, debater: &str, text: &str) -> bool {
        self.submissions
            .insert(debater.to_string(), Contribution::new(text))
            .is_some()
    }

    pub fn has_submitted(&self, debater: &str) -> bool {
        self.submissions.contains_key(debater)
    }

    /// Debaters from `roster` with no argument in this round, in roster order.
    pub fn missing_submissions<'a>(&self, roster: &[&'a str]) -> Vec<&'a str> {
        roster
            .iter()
            .copied()
            .filter(|id| !self.has_submitted(id))
            .collect()
    }

    /// Record `reviewer`'s critique of `target`. Returns true when replaced.
    pub fn critique(&mut self, reviewer: &str, target: &str, text: &str) -> bool {
        self.critiques
            .entry(reviewer.to_string())
            .or_default()
            .insert(target.to_string(), Contribution::new(text))
            .is_some()
    }

    pub fn critique_count(&self) -> usize {
        self.critiques.values().map(BTreeMap::len).sum()
    }

    /// Compact status line.
    pub fn status_line(&self) -> String {
        format!(
            "round {} [{}] | {} submissions | {} critiques{}",
            self.number,
            self.phase,
            self.submissions.len(),
            self.critique_count(),
            if self.synthesis.is_some() {
                " | synthesized"
            } else {
                ""
            }
        )
    }
}
