// ── Graph projection ──
//
// Deterministic one-way transform from a Topology to the node/edge graph a
// rendering surface consumes. Nodes come first, then switches, then one
// edge per link, all in document order. Runtime status is never baked in.

use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};

use crate::model::{Link, Participant, Role, Topology};

/// Background and border colors for a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeColor {
    pub background: String,
    pub border: String,
}

impl Default for NodeColor {
    fn default() -> Self {
        Self {
            background: "#83c985".into(),
            border: "#2f6a31".into(),
        }
    }
}

/// Caller-tunable projection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionStyle {
    /// Color pair applied to switches.
    pub switch_color: NodeColor,
    /// Tier for entities without a `level`.
    pub default_level: i64,
    pub shape: String,
    pub layout: LayoutHints,
}

impl Default for ProjectionStyle {
    fn default() -> Self {
        Self {
            switch_color: NodeColor::default(),
            default_level: 0,
            shape: "box".into(),
            layout: LayoutHints::default(),
        }
    }
}

/// Layout options forwarded to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutHints {
    pub hierarchical: bool,
    pub direction: String,
    pub improved_layout: bool,
}

impl Default for LayoutHints {
    fn default() -> Self {
        Self {
            hierarchical: true,
            direction: "UD".into(),
            improved_layout: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, IntoStaticStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeKind {
    Host,
    Net,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub shape: String,
    pub level: i64,
    pub style_class: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<NodeColor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub layout: LayoutHints,
}

impl DisplayGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Project a topology into a display graph.
pub fn project(topology: &Topology, style: &ProjectionStyle) -> DisplayGraph {
    let nodes = topology
        .participants()
        .map(|p| graph_node(p, style))
        .collect();
    let edges = topology.links.iter().map(graph_edge).collect();

    DisplayGraph {
        nodes,
        edges,
        layout: style.layout.clone(),
    }
}

fn graph_node(p: &dyn Participant, style: &ProjectionStyle) -> GraphNode {
    let role = p.role();
    let (kind, color) = match role {
        Role::Node => (NodeKind::Host, None),
        Role::Switch => (NodeKind::Net, Some(style.switch_color.clone())),
    };
    GraphNode {
        id: p.name().to_owned(),
        label: p.name().to_owned(),
        shape: style.shape.clone(),
        level: p.level().unwrap_or(style.default_level),
        style_class: role.to_string(),
        kind,
        color,
    }
}

fn graph_edge(link: &Link) -> GraphEdge {
    let [a, b] = &link.endpoints;
    GraphEdge {
        id: link.effective_name(),
        from: a.name.clone(),
        to: b.name.clone(),
    }
}
