//! Debate coordinator: drives the start → submit → cross-review → synthesize
//! protocol against a project record.
//!
//! Every action validates fully before touching the record, so a failed
//! action leaves the project exactly as it was.

use serde::{Deserialize, Serialize};

use super::round::{Contribution, Round, RoundPhase};
use crate::error::{CoordError, CoordResult};
use crate::project::{validate_id, Debater, Mode, Project, SYSTEM_ACTOR};

/// A mutating round command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum RoundAction {
    Start,
    Submit {
        debater: String,
        text: String,
    },
    CrossReview,
    Critique {
        reviewer: String,
        targets: Vec<String>,
        text: String,
    },
    Synthesize {
        text: String,
    },
}

impl RoundAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Submit { .. } => "submit",
            Self::CrossReview => "cross-review",
            Self::Critique { .. } => "critique",
            Self::Synthesize { .. } => "synthesize",
        }
    }
}

/// What a round action did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub action: String,
    pub round: u32,
    pub phase: RoundPhase,
    /// An earlier submission or critique was overwritten.
    #[serde(default)]
    pub replaced: bool,
    /// Debaters still owing an argument this round.
    #[serde(default)]
    pub awaiting: Vec<String>,
}

/// Mutating view over a debate-mode project.
pub struct DebateCoordinator<'a> {
    project: &'a mut Project,
}

impl<'a> DebateCoordinator<'a> {
    /// Fails with `ModeMismatch` unless the project is in debate mode.
    pub fn new(project: &'a mut Project, command: &str) -> CoordResult<Self> {
        project.ensure_mode(command, &[Mode::Debate])?;
        Ok(Self { project })
    }

    /// Register a debater. Ids are unique; debaters are never removed.
    pub fn add_debater(&mut self, debater: Debater) -> CoordResult<()> {
        validate_id("debater", &debater.id)?;
        if self.project.has_debater(&debater.id) {
            return Err(CoordError::DuplicateId {
                project: self.project.name.clone(),
                kind: "debater",
                id: debater.id,
            });
        }
        let description = if debater.perspective.is_empty() {
            "joined".to_string()
        } else {
            format!("joined with perspective: {}", debater.perspective)
        };
        self.project
            .record(debater.id.clone(), "add-debater", description);
        self.project.debaters.push(debater);
        Ok(())
    }

    /// Dispatch one protocol action.
    pub fn apply(&mut self, action: RoundAction) -> CoordResult<RoundOutcome> {
        match action {
            RoundAction::Start => self.start(),
            RoundAction::Submit { debater, text } => self.submit(&debater, &text),
            RoundAction::CrossReview => self.cross_review(),
            RoundAction::Critique {
                reviewer,
                targets,
                text,
            } => self.critique(&reviewer, &targets, &text),
            RoundAction::Synthesize { text } => self.synthesize(&text),
        }
    }

    /// Open round n+1. At most one unfinished round at a time.
    pub fn start(&mut self) -> CoordResult<RoundOutcome> {
        if self.project.debaters.is_empty() {
            return Err(CoordError::validation(format!(
                "project '{}' has no debaters; add some before starting a round",
                self.project.name
            )));
        }
        if let Some(round) = self.project.rounds.last() {
            if !round.phase.is_closed() {
                return Err(self.phase_error(round, "start", "a round is already in progress"));
            }
        }

        let number = self.project.rounds.len() as u32 + 1;
        self.project.rounds.push(Round::new(number));
        self.project.record(
            SYSTEM_ACTOR,
            "round-start",
            format!("round {} opened for {} debaters", number, self.project.debaters.len()),
        );
        self.outcome("start", false)
    }

    /// Record (or overwrite) one debater's argument for the open round.
    pub fn submit(&mut self, debater: &str, text: &str) -> CoordResult<RoundOutcome> {
        self.project.debater(debater)?;
        let round = self.current_round()?;
        if round.phase != RoundPhase::Open {
            return Err(self.phase_error(round, "submit to", "arguments are only accepted while open"));
        }

        let replaced = self.current_round_mut()?.submit(debater, text);
        let number = self.current_round()?.number;
        self.project.record(
            debater,
            "round-submit",
            format!(
                "{} argument for round {} ({} chars)",
                if replaced { "replaced" } else { "submitted" },
                number,
                text.chars().count()
            ),
        );
        self.outcome("submit", replaced)
    }

    /// Open → cross-review once every debater has submitted.
    pub fn cross_review(&mut self) -> CoordResult<RoundOutcome> {
        let round = self.current_round()?;
        if round.phase != RoundPhase::Open {
            return Err(self.phase_error(round, "cross-review", "round is not open"));
        }
        let missing = round.missing_submissions(&self.project.debater_ids());
        if !missing.is_empty() {
            let reason = format!("missing submissions from {}", missing.join(", "));
            return Err(self.phase_error(round, "cross-review", &reason));
        }

        let number = round.number;
        self.transition(RoundPhase::CrossReview)?;
        self.project.record(
            SYSTEM_ACTOR,
            "round-cross-review",
            format!("round {} entered cross-review", number),
        );
        self.outcome("cross-review", false)
    }

    /// Attach `reviewer`'s critique to each target's argument.
    pub fn critique(
        &mut self,
        reviewer: &str,
        targets: &[String],
        text: &str,
    ) -> CoordResult<RoundOutcome> {
        self.project.debater(reviewer)?;
        let round = self.current_round()?;
        if round.phase != RoundPhase::CrossReview {
            return Err(self.phase_error(round, "critique in", "critiques are only accepted during cross-review"));
        }
        if targets.is_empty() {
            return Err(CoordError::validation("critique needs at least one target debater"));
        }
        if !round.has_submitted(reviewer) {
            return Err(CoordError::validation(format!(
                "debater '{}' has no argument in round {} and cannot critique",
                reviewer, round.number
            )));
        }
        for target in targets {
            self.project.debater(target)?;
            if target == reviewer {
                return Err(CoordError::validation(format!(
                    "debater '{}' cannot critique their own argument",
                    reviewer
                )));
            }
            if !round.has_submitted(target) {
                return Err(CoordError::validation(format!(
                    "debater '{}' has no argument in round {}",
                    target, round.number
                )));
            }
        }

        let round = self.current_round_mut()?;
        let mut replaced = false;
        for target in targets {
            replaced |= round.critique(reviewer, target, text);
        }
        let number = round.number;
        self.project.record(
            reviewer,
            "round-critique",
            format!("critiqued {} in round {}", targets.join(", "), number),
        );
        self.outcome("critique", replaced)
    }

    /// Cross-review → synthesized with caller-supplied synthesis text.
    pub fn synthesize(&mut self, text: &str) -> CoordResult<RoundOutcome> {
        let round = self.current_round()?;
        if round.phase != RoundPhase::CrossReview {
            return Err(self.phase_error(round, "synthesize", "synthesis requires cross-review first"));
        }
        if text.trim().is_empty() {
            return Err(CoordError::validation("synthesis text must not be empty"));
        }

        self.transition(RoundPhase::Synthesized)?;
        let round = self.current_round_mut()?;
        round.synthesis = Some(Contribution::new(text));
        let number = round.number;
        self.project.record(
            SYSTEM_ACTOR,
            "round-synthesize",
            format!("round {} synthesized ({} chars)", number, text.chars().count()),
        );
        self.outcome("synthesize", false)
    }

    fn current_round(&self) -> CoordResult<&Round> {
        self.project
            .rounds
            .last()
            .ok_or_else(|| CoordError::NoRound {
                project: self.project.name.clone(),
            })
    }

    fn current_round_mut(&mut self) -> CoordResult<&mut Round> {
        let name = &self.project.name;
        self.project
            .rounds
            .last_mut()
            .ok_or_else(|| CoordError::NoRound {
                project: name.clone(),
            })
    }

    fn transition(&mut self, to: RoundPhase) -> CoordResult<()> {
        let project = self.project.name.clone();
        let round = self.current_round_mut()?;
        let number = round.number;
        round.transition(to).map_err(|from| CoordError::RoundPhase {
            project,
            round: number,
            phase: from,
            action: to.to_string(),
            reason: format!("{} cannot follow {}", to, from),
        })
    }

    fn phase_error(&self, round: &Round, action: &str, reason: &str) -> CoordError {
        CoordError::RoundPhase {
            project: self.project.name.clone(),
            round: round.number,
            phase: round.phase,
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }

    fn outcome(&self, action: &str, replaced: bool) -> CoordResult<RoundOutcome> {
        let round = self.current_round()?;
        Ok(RoundOutcome {
            action: action.to_string(),
            round: round.number,
            phase: round.phase,
            replaced,
            awaiting: round
                .missing_submissions(&self.project.debater_ids())
                .into_iter()
                .map(String::from)
                .collect(),
        })
    }
}
