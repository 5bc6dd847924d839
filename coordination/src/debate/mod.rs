//! Debate coordination: multi-round collective argument
//!
//! A fixed four-phase protocol run over a roster of debaters. The engine
//! records arguments, critiques and the synthesis; it never writes them.
//!
//! # Round Flow
//!
//! ```text
//! start → Open ──submit × N──► CrossReview ──critique × M──► Synthesized
//!           │  (all debaters    │                                │
//!           │   submitted)      └─ synthesize(text) ─────────────┘
//!           │                                                     │
//!           └──────────── next `start` opens round n+1 ◄──────────┘
//! ```

pub mod coordinator;
pub mod round;

pub use coordinator::{DebateCoordinator, RoundAction, RoundOutcome};
pub use round::{Contribution, PhaseTransition, Round, RoundPhase};
