// ── Nodes and switches ──
//
// The two kinds of testbed participant. They share most of their shape and
// are told apart by role, not by type; `Participant` gives uniform access
// for validation, projection and lookups.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, IntoStaticStr};

use crate::units::{Size, SizeUnit};

/// Default CPU model when a document does not name one.
pub const DEFAULT_CPU_ARCH: &str = "kvm64";

/// Default memory capacity, in GiB, for nodes that omit `memory`.
pub const DEFAULT_MEMORY_GIB: f64 = 4.0;

/// Which collection of the topology an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, IntoStaticStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Node,
    Switch,
}

/// Shared read access to nodes and switches.
pub trait Participant {
    fn name(&self) -> &str;
    fn image(&self) -> Option<&str>;
    fn os(&self) -> Option<&str>;
    fn level(&self) -> Option<i64>;
    fn mounts(&self) -> &[Mount];
    fn role(&self) -> Role;
}

// ── Mounts ───────────────────────────────────────────────────────────

/// A bind-mount: `source` on the host appears at `point` inside the guest.
///
/// Accepts the object form `{source, point}` and the `[source, point]`
/// pair form; always serializes as an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "MountRepr")]
pub struct Mount {
    pub source: String,
    pub point: String,
}

impl Mount {
    pub fn new(source: impl Into<String>, point: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            point: point.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged, expecting = "a mount `{source, point}` or a `[source, point]` pair")]
enum MountRepr {
    Object {
        #[serde(default)]
        source: String,
        #[serde(default)]
        point: String,
    },
    Pair(String, String),
}

impl From<MountRepr> for Mount {
    fn from(repr: MountRepr) -> Self {
        match repr {
            MountRepr::Object { source, point } | MountRepr::Pair(source, point) => {
                Self { source, point }
            }
        }
    }
}

// ── Resources ────────────────────────────────────────────────────────

/// CPU request. Only `cores` is interpreted; `sockets`, `threads` and
/// `arch` travel in `extra` for the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cores: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub capacity: Size,
}

/// CPU shape after filling in backend defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveCpu {
    pub sockets: i64,
    pub cores: i64,
    pub threads: i64,
    pub arch: String,
}

// ── Node ─────────────────────────────────────────────────────────────

/// A host in the testbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<Cpu>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Memory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounts: Option<Vec<Mount>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Node {
    /// CPU with sockets, cores and threads defaulted to 1 and the model to
    /// `kvm64`. The document itself is left untouched.
    pub fn effective_cpu(&self) -> EffectiveCpu {
        let extra_int = |key: &str| {
            self.cpu
                .as_ref()
                .and_then(|c| c.extra.get(key))
                .and_then(Value::as_i64)
                .filter(|n| *n > 0)
        };
        EffectiveCpu {
            sockets: extra_int("sockets").unwrap_or(1),
            cores: self
                .cpu
                .as_ref()
                .and_then(|c| c.cores)
                .filter(|n| *n > 0)
                .unwrap_or(1),
            threads: extra_int("threads").unwrap_or(1),
            arch: self
                .cpu
                .as_ref()
                .and_then(|c| c.extra.get("arch"))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_CPU_ARCH)
                .to_owned(),
        }
    }

    /// Declared memory capacity, or 4 GiB.
    pub fn effective_memory(&self) -> Size {
        self.memory
            .as_ref()
            .map_or(Size::trusted(DEFAULT_MEMORY_GIB, SizeUnit::GiB), |m| m.capacity)
    }
}

impl Participant for Node {
    fn name(&self) -> &str {
        &self.name
    }
    fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
    fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }
    fn level(&self) -> Option<i64> {
        self.level
    }
    fn mounts(&self) -> &[Mount] {
        self.mounts.as_deref().unwrap_or_default()
    }
    fn role(&self) -> Role {
        Role::Node
    }
}

// ── Switch ───────────────────────────────────────────────────────────

/// A network device in the testbed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switch {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kernel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mounts: Option<Vec<Mount>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Participant for Switch {
    fn name(&self) -> &str {
        &self.name
    }
    fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }
    fn os(&self) -> Option<&str> {
        self.os.as_deref()
    }
    fn level(&self) -> Option<i64> {
        self.level
    }
    fn mounts(&self) -> &[Mount] {
        self.mounts.as_deref().unwrap_or_default()
    }
    fn role(&self) -> Role {
        Role::Switch
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn mount_accepts_pair_form() {
        let mounts: Vec<Mount> = serde_json::from_value(json!([
            ["/home/ry/deter", "deter"],
            { "source": "/src", "point": "/opt/src" }
        ]))
        .unwrap();
        assert_eq!(
            mounts,
            vec![Mount::new("/home/ry/deter", "deter"), Mount::new("/src", "/opt/src")]
        );
        assert_eq!(
            serde_json::to_value(&mounts[0]).unwrap(),
            json!({ "source": "/home/ry/deter", "point": "deter" })
        );
    }

    #[test]
    fn node_keeps_unknown_fields() {
        let doc = json!({
            "name": "boss",
            "image": "freebsd-11",
            "os": "freebsd",
            "level": 1,
            "no-testnet": true
        });
        let node: Node = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(node.extra.get("no-testnet"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&node).unwrap(), doc);
    }

    #[test]
    fn effective_resources_fill_defaults() {
        let node: Node = serde_json::from_value(json!({
            "name": "thing",
            "cpu": { "cores": 2, "threads": 0 }
        }))
        .unwrap();
        assert_eq!(
            node.effective_cpu(),
            EffectiveCpu {
                sockets: 1,
                cores: 2,
                threads: 1,
                arch: DEFAULT_CPU_ARCH.into(),
            }
        );
        assert_eq!(node.effective_memory().to_string(), "4 GiB");
        assert!(node.memory.is_none());
    }
}
