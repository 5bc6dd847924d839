use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use coordination::{Mode, RoundAction, TaskStatus};

#[derive(Parser, Debug)]
#[command(name = "team-tasks")]
#[command(author, version, about = "Coordinate multi-agent work: pipelines, dependency graphs and debates", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Directory holding project records (overrides TEAM_TASKS_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Give up waiting for a project lock after this long (overrides TEAM_TASKS_LOCK_TIMEOUT_MS)
    #[arg(long, global = true)]
    pub lock_timeout_ms: Option<u64>,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModeArg {
    Linear,
    Dag,
    Debate,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Linear => Mode::Linear,
            ModeArg::Dag => Mode::Dag,
            ModeArg::Debate => Mode::Debate,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum StatusArg {
    Pending,
    InProgress,
    Done,
    Failed,
    Skipped,
}

impl From<StatusArg> for TaskStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => TaskStatus::Pending,
            StatusArg::InProgress => TaskStatus::InProgress,
            StatusArg::Done => TaskStatus::Done,
            StatusArg::Failed => TaskStatus::Failed,
            StatusArg::Skipped => TaskStatus::Skipped,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a project
    Init {
        project: String,

        #[arg(short, long, value_enum, default_value = "dag")]
        mode: ModeArg,

        /// Project goal, or the question under debate
        #[arg(short, long, default_value = "")]
        goal: String,

        /// Comma-separated stages (linear), root tasks (dag) or debaters (debate)
        #[arg(short, long, alias = "members", value_delimiter = ',')]
        pipeline: Vec<String>,

        /// Working directory label for dispatchers
        #[arg(short, long)]
        workspace: Option<String>,

        /// Replace an existing project with the same name
        #[arg(long)]
        force: bool,
    },

    /// Add a task to a dag project
    Add {
        project: String,
        task_id: String,

        /// Worker label (defaults to the task id)
        #[arg(short, long)]
        agent: Option<String>,

        #[arg(short, long)]
        desc: Option<String>,

        /// Comma-separated ids of tasks this one waits for
        #[arg(long, value_delimiter = ',')]
        deps: Vec<String>,
    },

    /// Add dependencies to an existing dag task
    Depend {
        project: String,
        task_id: String,

        /// Comma-separated ids of tasks to wait for
        #[arg(value_delimiter = ',', required = true)]
        deps: Vec<String>,
    },

    /// Register a debater
    AddDebater {
        project: String,
        debater_id: String,

        #[arg(short, long)]
        agent: Option<String>,

        #[arg(short, long, default_value = "")]
        perspective: String,
    },

    /// Show a project snapshot
    Status { project: String },

    /// Show stage order or dependency edges
    Graph { project: String },

    /// Show the execution log and recorded results
    Log {
        project: String,

        /// Only the last N entries
        #[arg(long)]
        tail: Option<usize>,
    },

    /// Current stage of a linear pipeline
    Next { project: String },

    /// Move a linear pipeline past a failed or skipped stage
    Advance { project: String },

    /// Tasks that can be dispatched now (dag)
    Ready { project: String },

    /// Change a task's status
    Update {
        project: String,
        task_id: String,

        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Record a task's result text
    Result {
        project: String,
        task_id: String,
        text: String,
    },

    /// Drive a debate round
    Round {
        project: String,

        #[command(subcommand)]
        action: RoundCommand,
    },

    /// Clear tasks, debaters, rounds and log; keep name, mode and goal
    Reset { project: String },

    /// Remove a project record
    Delete { project: String },

    /// List projects
    List,
}

#[derive(Subcommand, Debug)]
pub enum RoundCommand {
    /// Open the next round
    Start,

    /// Record a debater's argument
    Submit {
        #[arg(short, long = "debater-id")]
        debater: String,

        #[arg(short, long)]
        text: String,
    },

    /// Close submissions and begin cross-review
    CrossReview,

    /// Record a critique of one or more peers
    Critique {
        #[arg(short, long)]
        reviewer: String,

        /// Comma-separated debater ids being critiqued
        #[arg(long = "target", value_delimiter = ',', required = true)]
        targets: Vec<String>,

        #[arg(short, long)]
        text: String,
    },

    /// Record the synthesis and close the round
    Synthesize {
        #[arg(short, long)]
        text: String,
    },

    /// Per-debater progress in the latest round
    Status,

    /// Peer arguments each debater should review
    Prompts,
}

impl RoundCommand {
    /// The mutating action, or `None` for read-only views.
    pub fn into_action(self) -> Option<RoundAction> {
        match self {
            Self::Start => Some(RoundAction::Start),
            Self::Submit { debater, text } => Some(RoundAction::Submit { debater, text }),
            Self::CrossReview => Some(RoundAction::CrossReview),
            Self::Critique {
                reviewer,
                targets,
                text,
            } => Some(RoundAction::Critique {
                reviewer,
                targets,
                text,
            }),
            Self::Synthesize { text } => Some(RoundAction::Synthesize { text }),
            Self::Status | Self::Prompts => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("team-tasks").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_init_pipeline_split() {
        let cli = parse(&["init", "p", "-m", "linear", "-p", "plan,build,ship"]);
        match cli.command {
            Commands::Init { mode, pipeline, .. } => {
                assert_eq!(mode, ModeArg::Linear);
                assert_eq!(pipeline, vec!["plan", "build", "ship"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_update_status_values() {
        let cli = parse(&["update", "p", "a", "in-progress", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Update { status, .. } => assert_eq!(status, StatusArg::InProgress),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["team-tasks", "update", "p", "a", "finished"]).is_err());
    }

    #[test]
    fn test_round_submit() {
        let cli = parse(&["round", "p", "submit", "--debater-id", "d1", "-t", "argument"]);
        match cli.command {
            Commands::Round { action, .. } => assert_eq!(
                action.into_action(),
                Some(RoundAction::Submit {
                    debater: "d1".into(),
                    text: "argument".into()
                })
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_round_status_is_read_only() {
        let cli = parse(&["round", "p", "status"]);
        match cli.command {
            Commands::Round { action, .. } => assert!(action.into_action().is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["list", "--data-dir", "/tmp/x", "--lock-timeout-ms", "10", "-v"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(cli.lock_timeout_ms, Some(10));
        assert!(cli.verbose);
    }
}
