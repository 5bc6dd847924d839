//! `graph` projection: stage order for linear projects, edges and
//! topological layers for dag projects. Debate projects have no graph.

use serde::{Deserialize, Serialize};

use super::TextReport;
use crate::error::CoordResult;
use crate::project::{Mode, Project, TaskStatus};
use crate::scheduler::DagView;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub status: TaskStatus,
}

/// `from` must be done before `to` can start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GraphReport {
    Linear {
        project: String,
        stages: Vec<GraphNode>,
        current_stage: usize,
    },
    Dag {
        project: String,
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        layers: Vec<Vec<String>>,
    },
}

impl GraphReport {
    pub fn build(project: &Project) -> CoordResult<Self> {
        project.ensure_mode("graph", &[Mode::Linear, Mode::Dag])?;
        let nodes = project
            .tasks
            .iter()
            .map(|t| GraphNode {
                id: t.id.clone(),
                status: t.status,
            })
            .collect();

        if project.mode == Mode::Linear {
            return Ok(Self::Linear {
                project: project.name.clone(),
                stages: nodes,
                current_stage: project.current_stage,
            });
        }

        let view = DagView::new(project, "graph")?;
        Ok(Self::Dag {
            project: project.name.clone(),
            nodes,
            edges: view
                .edges()
                .into_iter()
                .map(|(from, to)| GraphEdge { from, to })
                .collect(),
            layers: view.layers()?,
        })
    }
}

impl TextReport for GraphReport {
    fn to_text(&self) -> String {
        match self {
            Self::Linear { stages, .. } => {
                if stages.is_empty() {
                    return "(no stages)".to_string();
                }
                stages
                    .iter()
                    .map(|s| format!("{} {}", s.status.marker(), s.id))
                    .collect::<Vec<_>>()
                    .join(" -> ")
            }
            Self::Dag {
                nodes,
                edges,
                layers,
                ..
            } => {
                if nodes.is_empty() {
                    return "(no tasks)".to_string();
                }
                let marker = |id: &str| {
                    nodes
                        .iter()
                        .find(|n| n.id == id)
                        .map(|n| n.status.marker())
                        .unwrap_or("[?]")
                };

                let mut out = Vec::new();
                for (depth, layer) in layers.iter().enumerate() {
                    let members: Vec<String> = layer
                        .iter()
                        .map(|id| format!("{} {}", marker(id), id))
                        .collect();
                    out.push(format!("layer {}: {}", depth, members.join(", ")));
                }
                out.push(String::new());
                for node in nodes {
                    let incoming: Vec<&GraphEdge> =
                        edges.iter().filter(|e| e.to == node.id).collect();
                    if incoming.is_empty() {
                        out.push(format!("  (root) --> {} {}", node.status.marker(), node.id));
                    }
                    for edge in incoming {
                        out.push(format!(
                            "  {} --> {} {}",
                            edge.from,
                            node.status.marker(),
                            node.id
                        ));
                    }
                }
                out.join("\n")
            }
        }
    }
}
