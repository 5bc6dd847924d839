//! Dependency-graph scheduling.
//!
//! The ready-set is never stored. It is recomputed from task statuses on
//! every query, so it cannot drift from the record:
//!
//! ```text
//! ready = { t | t.status == pending  and  every dep of t is done }
//! ```
//!
//! Edges run from a dependency to its dependent. A new edge is accepted only
//! if the graph stays acyclic, checked with `petgraph` before the record is
//! touched.

use std::collections::{HashMap, HashSet};

use petgraph::algo::{astar, toposort};
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoordError, CoordResult};
use crate::project::{validate_id, Mode, Project, Task, TaskStatus};

/// Coarse readiness of a dag project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// At least one task can be dispatched now.
    Dispatchable,
    /// Every task is done.
    AllComplete,
    /// Nothing is ready, but the project is not finished.
    Waiting,
    /// No tasks yet.
    Empty,
}

/// An unfinished dependency holding a task back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockingDependency {
    pub id: String,
    /// `None` when the dependency is missing from the record.
    pub status: Option<TaskStatus>,
}

/// A pending task that is not ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTask {
    pub id: String,
    pub waiting_on: Vec<BlockingDependency>,
}

/// Answer to "what can run now" for a dag project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    pub state: ReadyState,
    pub ready: Vec<Task>,
    pub blocked: Vec<BlockedTask>,
    pub in_progress: Vec<String>,
}

/// Read-only scheduling queries over a dag project.
pub struct DagView<'a> {
    project: &'a Project,
}

impl<'a> DagView<'a> {
    /// Fails with `ModeMismatch` unless the project is in dag mode.
    pub fn new(project: &'a Project, command: &str) -> CoordResult<Self> {
        project.ensure_mode(command, &[Mode::Dag])?;
        Ok(Self { project })
    }

    /// Pending tasks whose dependencies are all done, in insertion order.
    pub fn ready(&self) -> Vec<&'a Task> {
        ready_tasks(self.project)
    }

    pub fn ready_ids(&self) -> Vec<String> {
        self.ready().into_iter().map(|t| t.id.clone()).collect()
    }

    /// Dependencies of `task` that are not yet done.
    pub fn blocking(&self, task: &Task) -> Vec<BlockingDependency> {
        task.dependencies
            .iter()
            .filter_map(|dep| match self.project.task(dep) {
                Ok(t) if t.status == TaskStatus::Done => None,
                Ok(t) => Some(BlockingDependency {
                    id: dep.clone(),
                    status: Some(t.status),
                }),
                Err(_) => Some(BlockingDependency {
                    id: dep.clone(),
                    status: None,
                }),
            })
            .collect()
    }

    pub fn readiness(&self) -> Readiness {
        let ready: Vec<Task> = self.ready().into_iter().cloned().collect();
        let blocked: Vec<BlockedTask> = self
            .project
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Pending)
            .filter_map(|t| {
                let waiting_on = self.blocking(t);
                (!waiting_on.is_empty()).then(|| BlockedTask {
                    id: t.id.clone(),
                    waiting_on,
                })
            })
            .collect();
        let in_progress = self
            .project
            .tasks
            .iter()
            .filter(|t| t.status == TaskStatus::InProgress)
            .map(|t| t.id.clone())
            .collect();

        let state = if self.project.tasks.is_empty() {
            ReadyState::Empty
        } else if !ready.is_empty() {
            ReadyState::Dispatchable
        } else if self
            .project
            .tasks
            .iter()
            .all(|t| t.status == TaskStatus::Done)
        {
            ReadyState::AllComplete
        } else {
            ReadyState::Waiting
        };

        Readiness {
            state,
            ready,
            blocked,
            in_progress,
        }
    }

    /// `(dependency, dependent)` pairs in task insertion order.
    pub fn edges(&self) -> Vec<(String, String)> {
        self.project
            .tasks
            .iter()
            .flat_map(|t| {
                t.dependencies
                    .iter()
                    .map(move |dep| (dep.clone(), t.id.clone()))
            })
            .collect()
    }

    /// Topological layers: layer 0 has no dependencies, layer k depends on
    /// something in layer k-1. Insertion order within a layer.
    pub fn layers(&self) -> CoordResult<Vec<Vec<String>>> {
        let graph = build_graph(self.project);
        let order = toposort(&graph, None).map_err(|cycle| CoordError::DependencyCycle {
            project: self.project.name.clone(),
            cycle: vec![cycle.node_id().to_string()],
        })?;

        let mut depth: HashMap<&str, usize> = HashMap::new();
        for node in order {
            let level = graph
                .neighbors_directed(node, petgraph::Direction::Incoming)
                .filter_map(|dep| depth.get(dep))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(node, level);
        }

        let mut layers: Vec<Vec<String>> = Vec::new();
        for task in &self.project.tasks {
            let level = depth.get(task.id.as_str()).copied().unwrap_or(0);
            if layers.len() <= level {
                layers.resize_with(level + 1, Vec::new);
            }
            layers[level].push(task.id.clone());
        }
        Ok(layers)
    }
}

fn ready_tasks(project: &Project) -> Vec<&Task> {
    let done: HashSet<&str> = project
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Done)
        .map(|t| t.id.as_str())
        .collect();
    project
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .filter(|t| t.dependencies.iter().all(|d| done.contains(d.as_str())))
        .collect()
}

/// Ids in the ready-set; used to diff before and after a transition.
pub(crate) fn ready_ids(project: &Project) -> Vec<String> {
    ready_tasks(project).into_iter().map(|t| t.id.clone()).collect()
}

/// Graph over known tasks. Edges to missing tasks are dropped.
fn build_graph(project: &Project) -> DiGraphMap<&str, ()> {
    let mut graph = DiGraphMap::new();
    for task in &project.tasks {
        graph.add_node(task.id.as_str());
    }
    for task in &project.tasks {
        for dep in &task.dependencies {
            if graph.contains_node(dep.as_str()) {
                graph.add_edge(dep.as_str(), task.id.as_str(), ());
            }
        }
    }
    graph
}

/// Precedence path `task -> ... -> dep -> task` closed by adding `dep -> task`.
fn closing_cycle(graph: &DiGraphMap<&str, ()>, task: &str, dep: &str) -> Option<Vec<String>> {
    if task == dep {
        return Some(vec![dep.to_string(), task.to_string()]);
    }
    astar(graph, task, |n| n == dep, |_| 1u32, |_| 0u32).map(|(_, path)| {
        let mut cycle: Vec<String> = path.into_iter().map(str::to_string).collect();
        cycle.push(task.to_string());
        cycle
    })
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn check_dependencies_exist(project: &Project, task: &str, deps: &[String]) -> CoordResult<()> {
    for dep in deps {
        if dep != task && !project.has_task(dep) {
            return Err(CoordError::MissingDependency {
                project: project.name.clone(),
                task: task.to_string(),
                dependency: dep.clone(),
            });
        }
    }
    Ok(())
}

/// Append a new task. Every dependency must already exist.
pub(crate) fn add_task(project: &mut Project, mut task: Task) -> CoordResult<()> {
    validate_id("task", &task.id)?;
    if project.has_task(&task.id) {
        return Err(CoordError::DuplicateId {
            project: project.name.clone(),
            kind: "task",
            id: task.id,
        });
    }

    task.dependencies = dedup(&task.dependencies);
    if task.dependencies.iter().any(|d| d == &task.id) {
        return Err(CoordError::DependencyCycle {
            project: project.name.clone(),
            cycle: vec![task.id.clone(), task.id.clone()],
        });
    }
    check_dependencies_exist(project, &task.id, &task.dependencies)?;

    let description = if task.dependencies.is_empty() {
        format!("added (agent: {})", task.agent)
    } else {
        format!(
            "added (agent: {}, depends on: {})",
            task.agent,
            task.dependencies.join(", ")
        )
    };
    project.record(task.id.clone(), "add", description);
    project.tasks.push(task);
    Ok(())
}

/// Add dependency edges to an existing task. Returns the edges actually added.
pub(crate) fn add_dependencies(
    project: &mut Project,
    task_id: &str,
    deps: &[String],
) -> CoordResult<Vec<String>> {
    let index = project.task_index(task_id)?;
    let deps = dedup(deps);
    for dep in &deps {
        validate_id("task", dep)?;
    }
    check_dependencies_exist(project, task_id, &deps)?;

    let existing = &project.tasks[index].dependencies;
    let new_deps: Vec<String> = deps
        .into_iter()
        .filter(|d| !existing.contains(d))
        .collect();
    if new_deps.is_empty() {
        return Ok(new_deps);
    }

    {
        let mut graph = build_graph(project);
        for dep in &new_deps {
            if let Some(cycle) = closing_cycle(&graph, task_id, dep) {
                return Err(CoordError::DependencyCycle {
                    project: project.name.clone(),
                    cycle,
                });
            }
            graph.add_edge(dep.as_str(), task_id, ());
        }
    }

    project.tasks[index]
        .dependencies
        .extend(new_deps.iter().cloned());
    project.record(
        task_id,
        "depend",
        format!("now depends on: {}", new_deps.join(", ")),
    );
    Ok(new_deps)
}
