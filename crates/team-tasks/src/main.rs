//! team-tasks: command-line front end for the coordination engine.
//!
//! # Usage
//!
//! ```bash
//! team-tasks init auth -m dag -g "ship login"
//! team-tasks add auth schema
//! team-tasks add auth api --deps schema
//! team-tasks ready auth --json
//! team-tasks update auth schema in-progress
//!
//! # Custom store and lock bound
//! TEAM_TASKS_DIR=./.tasks TEAM_TASKS_LOCK_TIMEOUT_MS=2000 team-tasks list
//! ```
//!
//! Exit codes: 0 ok, 1 internal, 2 not found, 3 validation, 4 mode mismatch,
//! 5 lock contention, 6 corrupt record, 64 usage.

mod cli;
mod output;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use coordination::{CoordError, Engine, EngineConfig, InitRequest, NewTask, RoundAction};
use serde_json::json;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, RoundCommand};

const USAGE_EXIT: u8 = 64;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(USAGE_EXIT)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(cli.verbose);

    let config = engine_config(&cli);
    debug!(
        data_dir = %config.data_dir.display(),
        lock_timeout_ms = config.lock_timeout.as_millis() as u64,
        keep_backups = config.keep_backups,
        "engine configured"
    );
    let engine = Engine::new(config);
    let json = cli.json;
    debug!(command = ?cli.command, json, "dispatching command");
    match run(cli.command, &engine, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<CoordError>() {
            Some(coord) => {
                output::coord_error(json, coord);
                ExitCode::from(coord.exit_code())
            }
            None => {
                eprintln!("error: {:#}", err);
                ExitCode::FAILURE
            }
        },
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TEAM_TASKS_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn engine_config(cli: &Cli) -> EngineConfig {
    let mut config = EngineConfig::from_env();
    if let Some(dir) = &cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(ms) = cli.lock_timeout_ms {
        config = config.with_lock_timeout(Duration::from_millis(ms));
    }
    config
}

fn run(command: Commands, engine: &Engine, json: bool) -> Result<()> {
    match command {
        Commands::Init {
            project,
            mode,
            goal,
            pipeline,
            workspace,
            force,
        } => {
            let request = InitRequest::new(project, mode.into())
                .goal(goal)
                .members(output::clean_ids(pipeline))
                .workspace(workspace)
                .force(force);
            let created = engine.init(request)?;
            output::message(json, &created, |p| {
                let members = match p.mode {
                    coordination::Mode::Linear => format!("{} stages", p.tasks.len()),
                    coordination::Mode::Dag => format!("{} tasks", p.tasks.len()),
                    coordination::Mode::Debate => format!("{} debaters", p.debaters.len()),
                };
                format!("Created {} project '{}' ({})", p.mode, p.name, members)
            })
        }

        Commands::Add {
            project,
            task_id,
            agent,
            desc,
            deps,
        } => {
            let new = NewTask {
                id: task_id,
                dependencies: output::clean_ids(deps),
                agent,
                description: desc,
            };
            let task = engine.add_task(&project, new)?;
            output::message(json, &task, |t| {
                if t.dependencies.is_empty() {
                    format!("Added task '{}'", t.id)
                } else {
                    format!("Added task '{}' (depends on: {})", t.id, t.dependencies.join(", "))
                }
            })
        }

        Commands::Depend {
            project,
            task_id,
            deps,
        } => {
            let added = engine.add_dependencies(&project, &task_id, &output::clean_ids(deps))?;
            let body = json!({ "project": project, "task": task_id, "added": added });
            output::message(json, &body, |_| {
                if added.is_empty() {
                    format!("'{}' already had those dependencies", task_id)
                } else {
                    format!("'{}' now also depends on: {}", task_id, added.join(", "))
                }
            })
        }

        Commands::AddDebater {
            project,
            debater_id,
            agent,
            perspective,
        } => {
            let debater = engine.add_debater(&project, &debater_id, &perspective, agent)?;
            output::message(json, &debater, |d| format!("Added debater '{}'", d.id))
        }

        Commands::Status { project } => output::report(json, &engine.status(&project)?),
        Commands::Graph { project } => output::report(json, &engine.graph(&project)?),
        Commands::Log { project, tail } => output::report(json, &engine.log(&project, tail)?),
        Commands::Next { project } => output::report(json, &engine.next(&project)?),
        Commands::Advance { project } => output::report(json, &engine.advance(&project)?),
        Commands::Ready { project } => output::report(json, &engine.ready(&project)?),

        Commands::Update {
            project,
            task_id,
            status,
        } => output::report(json, &engine.update(&project, &task_id, status.into())?),

        Commands::Result {
            project,
            task_id,
            text,
        } => {
            let replaced = engine.record_result(&project, &task_id, &text)?;
            let body = json!({ "project": project, "task": task_id, "replaced": replaced });
            output::message(json, &body, |_| {
                format!(
                    "{} result for '{}'",
                    if replaced { "Replaced" } else { "Recorded" },
                    task_id
                )
            })
        }

        Commands::Round { project, action } => match action {
            RoundCommand::Status => output::report(json, &engine.round_status(&project)?),
            RoundCommand::Prompts => output::report(json, &engine.review_prompts(&project)?),
            other => {
                let action: RoundAction = other
                    .into_action()
                    .ok_or_else(|| anyhow::anyhow!("round view has no action"))?;
                output::report(json, &engine.round(&project, action)?)
            }
        },

        Commands::Reset { project } => {
            let reset = engine.reset(&project)?;
            output::message(json, &reset, |p| {
                format!("Reset {} project '{}'", p.mode, p.name)
            })
        }

        Commands::Delete { project } => {
            engine.delete(&project)?;
            let body = json!({ "project": project, "deleted": true });
            output::message(json, &body, |_| format!("Deleted project '{}'", project))
        }

        Commands::List => output::report(json, &engine.list()?),
    }
}
