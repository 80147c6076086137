// ── Topology document ──
//
// The canonical model produced by one evaluation. Immutable once built:
// consumers that need "the current topology" hold an `Arc<Topology>`
// snapshot and replace it on re-evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::link::Link;
use super::participant::{Node, Participant, Role, Switch};

/// A reusable artifact reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub switches: Vec<Switch>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<Image>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A borrowed node or switch.
#[derive(Debug, Clone, Copy)]
pub enum EntityRef<'a> {
    Node(&'a Node),
    Switch(&'a Switch),
}

impl EntityRef<'_> {
    pub fn as_participant(&self) -> &dyn Participant {
        match self {
            Self::Node(n) => *n,
            Self::Switch(s) => *s,
        }
    }

    pub fn role(&self) -> Role {
        self.as_participant().role()
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Node(n) => serde_json::to_value(n),
            Self::Switch(s) => serde_json::to_value(s),
        }
        .unwrap_or(Value::Null)
    }
}

impl Topology {
    /// Backend-side name for an entity: `"{topology}_{name}"`.
    pub fn qualify_name(&self, name: &str) -> String {
        format!("{}_{name}", self.name)
    }

    /// Find a node or switch by name. Nodes are searched first.
    pub fn entity(&self, name: &str) -> Option<EntityRef<'_>> {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .map(EntityRef::Node)
            .or_else(|| {
                self.switches
                    .iter()
                    .find(|s| s.name == name)
                    .map(EntityRef::Switch)
            })
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn image(&self, name: &str) -> Option<&Image> {
        self.images.as_ref()?.iter().find(|i| i.name == name)
    }

    /// All nodes then all switches, in document order.
    pub fn participants(&self) -> impl Iterator<Item = &dyn Participant> {
        self.nodes
            .iter()
            .map(|n| n as &dyn Participant)
            .chain(self.switches.iter().map(|s| s as &dyn Participant))
    }

    /// Links attached to `name`.
    pub fn links_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Link> + 'a {
        self.links.iter().filter(move |l| l.touches(name))
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "nodes")?;
        for n in &self.nodes {
            write_participant(f, n)?;
        }
        writeln!(f, "switches")?;
        for s in &self.switches {
            write_participant(f, s)?;
        }
        writeln!(f, "links")?;
        for l in &self.links {
            let [a, b] = &l.endpoints;
            writeln!(f, "  {}  {a} <-> {b}", l.name)?;
        }
        Ok(())
    }
}

fn write_participant(f: &mut fmt::Formatter<'_>, p: &dyn Participant) -> fmt::Result {
    write!(f, "  {}", p.name())?;
    if let Some(image) = p.image() {
        write!(f, "  image={image}")?;
    }
    if let Some(os) = p.os() {
        write!(f, "  os={os}")?;
    }
    if let Some(level) = p.level() {
        write!(f, "  level={level}")?;
    }
    if !p.mounts().is_empty() {
        write!(f, "  mounts={}", p.mounts().len())?;
    }
    writeln!(f)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Topology {
        serde_json::from_value(json!({
            "name": "2net",
            "nodes": [{ "name": "n0", "os": "debian-stretch", "level": 2 }],
            "switches": [{ "name": "nimbus", "os": "cumulus-latest", "level": 1 }],
            "links": [{
                "name": "n0_eth0-nimbus_swp0",
                "endpoints": [{ "name": "n0", "port": "eth0" }, { "name": "nimbus", "port": "swp0" }],
                "props": {}
            }],
            "mgmtip": "172.22.0.1"
        }))
        .unwrap()
    }

    #[test]
    fn lookups() {
        let topo = sample();
        assert_eq!(topo.qualify_name("n0"), "2net_n0");
        assert_eq!(topo.entity("nimbus").unwrap().role(), Role::Switch);
        assert_eq!(topo.entity("n0").unwrap().role(), Role::Node);
        assert!(topo.entity("ghost").is_none());
        assert!(topo.link("n0_eth0-nimbus_swp0").is_some());
        assert_eq!(topo.links_of("nimbus").count(), 1);
        assert_eq!(topo.participants().count(), 2);
        assert_eq!(topo.extra.get("mgmtip"), Some(&json!("172.22.0.1")));
    }

    #[test]
    fn display_summary() {
        let text = sample().to_string();
        assert!(text.starts_with("2net\nnodes\n  n0  os=debian-stretch  level=2\n"));
        assert!(text.contains("n0_eth0-nimbus_swp0  n0.eth0 <-> nimbus.swp0"));
    }
}
