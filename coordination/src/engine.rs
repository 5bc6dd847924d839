//! Engine facade: one method per command.
//!
//! Mutating methods run inside [`ProjectStore::update`] (lock, load, apply,
//! save) so a failed command leaves the stored record untouched. Query
//! methods load without locking and build a report.

use tracing::info;

use crate::config::EngineConfig;
use crate::debate::{DebateCoordinator, RoundAction, RoundOutcome};
use crate::error::{CoordError, CoordResult};
use crate::project::{Debater, Mode, Project, Task, TaskStatus, SYSTEM_ACTOR};
use crate::report::{
    GraphReport, LogReport, ProjectList, ProjectSummary, ReviewPrompts, RoundStatus, StatusReport,
};
use crate::scheduler::{self, dag, linear, DagView, NextStage, Readiness, TransitionOutcome};
use crate::store::ProjectStore;

/// Arguments to [`Engine::init`].
#[derive(Debug, Clone)]
pub struct InitRequest {
    pub name: String,
    pub mode: Mode,
    pub goal: String,
    /// Stages (linear), root tasks (dag) or debaters (debate).
    pub members: Vec<String>,
    pub workspace: Option<String>,
    /// Replace an existing project of the same name.
    pub force: bool,
}

impl InitRequest {
    pub fn new(name: impl Into<String>, mode: Mode) -> Self {
        Self {
            name: name.into(),
            mode,
            goal: String::new(),
            members: Vec::new(),
            workspace: None,
            force: false,
        }
    }

    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    pub fn members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn workspace(mut self, workspace: Option<String>) -> Self {
        self.workspace = workspace;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

/// Arguments to [`Engine::add_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub id: String,
    pub dependencies: Vec<String>,
    pub agent: Option<String>,
    pub description: Option<String>,
}

impl NewTask {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Coordination engine over a file-backed store.
#[derive(Debug, Clone)]
pub struct Engine {
    store: ProjectStore,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: ProjectStore::new(config),
        }
    }

    pub fn store(&self) -> &ProjectStore {
        &self.store
    }

    /// Raw record, for callers that need more than the reports expose.
    pub fn load(&self, project: &str) -> CoordResult<Project> {
        self.store.load(project)
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn init(&self, req: InitRequest) -> CoordResult<Project> {
        ProjectStore::validate_name(&req.name)?;
        let mut project =
            Project::new(&req.name, req.mode, &req.goal).with_workspace(req.workspace);
        project.record(
            SYSTEM_ACTOR,
            "init",
            format!("created {} project", req.mode),
        );

        match req.mode {
            Mode::Linear => {
                if req.members.is_empty() {
                    return Err(CoordError::validation(
                        "linear projects need at least one stage",
                    ));
                }
                project.tasks = linear::stages_from(&req.members)?;
            }
            Mode::Dag => {
                for id in &req.members {
                    dag::add_task(&mut project, Task::new(id.clone()))?;
                }
            }
            Mode::Debate => {
                let mut coordinator = DebateCoordinator::new(&mut project, "init")?;
                for id in &req.members {
                    coordinator.add_debater(Debater::new(id.clone(), ""))?;
                }
            }
        }

        self.store.create(&project, req.force)?;
        info!(
            project = %project.name,
            mode = %project.mode,
            members = req.members.len(),
            replaced = req.force,
            "project initialized"
        );
        Ok(project)
    }

    pub fn add_task(&self, project: &str, new: NewTask) -> CoordResult<Task> {
        let task = self.store.update(project, |p| {
            p.ensure_mode("add", &[Mode::Dag])?;
            let task = Task::new(new.id)
                .with_agent(new.agent)
                .with_description(new.description)
                .with_dependencies(new.dependencies);
            dag::add_task(p, task.clone())?;
            p.task(&task.id).cloned()
        })?;
        info!(project, task = %task.id, deps = ?task.dependencies, "task added");
        Ok(task)
    }

    /// Add dependency edges to an existing dag task.
    pub fn add_dependencies(
        &self,
        project: &str,
        task: &str,
        deps: &[String],
    ) -> CoordResult<Vec<String>> {
        let added = self.store.update(project, |p| {
            p.ensure_mode("depend", &[Mode::Dag])?;
            dag::add_dependencies(p, task, deps)
        })?;
        info!(project, task, added = ?added, "dependencies added");
        Ok(added)
    }

    pub fn add_debater(
        &self,
        project: &str,
        id: &str,
        perspective: &str,
        agent: Option<String>,
    ) -> CoordResult<Debater> {
        let debater = Debater::new(id, perspective).with_agent(agent);
        self.store.update(project, |p| {
            DebateCoordinator::new(p, "add-debater")?.add_debater(debater.clone())
        })?;
        info!(project, debater = id, "debater added");
        Ok(debater)
    }

    pub fn update(
        &self,
        project: &str,
        task: &str,
        to: TaskStatus,
    ) -> CoordResult<TransitionOutcome> {
        let outcome = self
            .store
            .update(project, |p| scheduler::transition(p, task, to))?;
        info!(
            project,
            task,
            from = %outcome.from,
            to = %outcome.to,
            unblocked = ?outcome.unblocked,
            "task transitioned"
        );
        Ok(outcome)
    }

    /// Returns true when an earlier result was overwritten.
    pub fn record_result(&self, project: &str, task: &str, text: &str) -> CoordResult<bool> {
        let replaced = self
            .store
            .update(project, |p| scheduler::record_result(p, task, text))?;
        info!(project, task, replaced, chars = text.chars().count(), "result recorded");
        Ok(replaced)
    }

    /// Move a linear cursor past a failed or skipped stage.
    pub fn advance(&self, project: &str) -> CoordResult<NextStage> {
        let next = self.store.update(project, |p| {
            p.ensure_mode("advance", &[Mode::Linear])?;
            linear::advance(p)
        })?;
        info!(project, next = ?next.stage_id(), "cursor advanced by operator");
        Ok(next)
    }

    pub fn round(&self, project: &str, action: RoundAction) -> CoordResult<RoundOutcome> {
        let name = action.name();
        let outcome = self
            .store
            .update(project, |p| DebateCoordinator::new(p, "round")?.apply(action))?;
        info!(
            project,
            action = name,
            round = outcome.round,
            phase = %outcome.phase,
            "round action applied"
        );
        Ok(outcome)
    }

    /// Clear owned state; name, mode, goal and workspace survive.
    pub fn reset(&self, project: &str) -> CoordResult<Project> {
        let reset = self.store.update(project, |p| {
            p.clear_state();
            p.record(SYSTEM_ACTOR, "reset", format!("{} project reset", p.mode));
            Ok(p.clone())
        })?;
        info!(project, "project reset");
        Ok(reset)
    }

    pub fn delete(&self, project: &str) -> CoordResult<()> {
        self.store.delete(project)?;
        info!(project, "project deleted");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn next(&self, project: &str) -> CoordResult<NextStage> {
        let p = self.store.load(project)?;
        p.ensure_mode("next", &[Mode::Linear])?;
        Ok(linear::next(&p))
    }

    pub fn ready(&self, project: &str) -> CoordResult<Readiness> {
        let p = self.store.load(project)?;
        Ok(DagView::new(&p, "ready")?.readiness())
    }

    pub fn status(&self, project: &str) -> CoordResult<StatusReport> {
        Ok(StatusReport::build(&self.store.load(project)?))
    }

    pub fn graph(&self, project: &str) -> CoordResult<GraphReport> {
        GraphReport::build(&self.store.load(project)?)
    }

    pub fn log(&self, project: &str, tail: Option<usize>) -> CoordResult<LogReport> {
        Ok(LogReport::build(&self.store.load(project)?, tail))
    }

    pub fn round_status(&self, project: &str) -> CoordResult<RoundStatus> {
        RoundStatus::build(&self.store.load(project)?)
    }

    pub fn review_prompts(&self, project: &str) -> CoordResult<ReviewPrompts> {
        ReviewPrompts::build(&self.store.load(project)?)
    }

    /// Every project in the store. Unreadable records are listed, not skipped.
    pub fn list(&self) -> CoordResult<ProjectList> {
        let projects = self
            .store
            .list()?
            .into_iter()
            .map(|name| match self.store.load(&name) {
                Ok(p) => ProjectSummary::from_project(&p),
                Err(e) => ProjectSummary::unreadable(name, e.to_string()),
            })
            .collect();
        Ok(ProjectList { projects })
    }
}
