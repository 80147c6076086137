// ── Status map ──
//
// The backend reports status as `{nodes: {name: ...}, switches: {...},
// links: {...}}` plus loose top-level extras such as `mgmtip`. Node and
// switch entries are usually structured domain records; link entries are
// plain strings. Lookups never fail: a missing entry reads as `"?"`.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::error::CoreError;

/// Sentinel for a category/name pair that has never been reported.
pub const UNKNOWN: &str = "?";

/// Which kind of entity a status entry describes.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Nodes,
    Switches,
    Links,
}

/// A virtual machine as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainStatus {
    #[serde(default)]
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub config_state: String,
    #[serde(default, rename = "IP")]
    pub ip: String,
    #[serde(default)]
    pub macs: Option<Vec<String>>,
    #[serde(default, rename = "VNC")]
    pub vnc: i64,
}

/// One status entry: a structured domain record, a plain string, or
/// anything else the backend chose to send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Domain(DomainStatus),
    Text(String),
    Other(Value),
}

impl StatusValue {
    /// Short display state: the domain state or the text itself.
    pub fn state(&self) -> &str {
        match self {
            Self::Domain(d) => &d.state,
            Self::Text(s) => s,
            Self::Other(v) => v.as_str().unwrap_or(UNKNOWN),
        }
    }

    pub fn domain(&self) -> Option<&DomainStatus> {
        match self {
            Self::Domain(d) => Some(d),
            _ => None,
        }
    }

    /// Config state for domains; links and unknown shapes have none.
    pub fn config_state(&self) -> Option<&str> {
        self.domain()
            .map(|d| d.config_state.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Category → name → status, as returned by one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusMap {
    #[serde(flatten)]
    entries: BTreeMap<Category, IndexMap<String, StatusValue>>,
    /// Top-level keys that are not a category (e.g. `mgmtip`).
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl StatusMap {
    /// Decode a backend status payload. A `null` payload (the backend has
    /// no built topology) yields an empty map.
    pub fn from_json(value: Value) -> Result<Self, CoreError> {
        let object = match value {
            Value::Null => return Ok(Self::default()),
            Value::Object(object) => object,
            other => {
                return Err(CoreError::UnexpectedResponse {
                    message: format!("status payload is not an object: {other}"),
                });
            }
        };

        let mut map = Self::default();
        for (key, value) in object {
            let Ok(category) = key.parse::<Category>() else {
                map.extra.insert(key, value);
                continue;
            };
            let entries: IndexMap<String, StatusValue> = serde_json::from_value(value)
                .map_err(|e| CoreError::UnexpectedResponse {
                    message: format!("malformed `{category}` status: {e}"),
                })?;
            map.entries.insert(category, entries);
        }
        Ok(map)
    }

    pub fn insert(&mut self, category: Category, name: impl Into<String>, value: StatusValue) {
        self.entries
            .entry(category)
            .or_default()
            .insert(name.into(), value);
    }

    pub fn get(&self, category: Category, name: &str) -> Option<&StatusValue> {
        self.entries.get(&category)?.get(name)
    }

    /// The display state for an entry, or [`UNKNOWN`].
    pub fn state(&self, category: Category, name: &str) -> &str {
        self.get(category, name).map_or(UNKNOWN, StatusValue::state)
    }

    /// Every entry of a category, in backend order.
    pub fn category(&self, category: Category) -> impl Iterator<Item = (&str, &StatusValue)> {
        self.entries
            .get(&category)
            .into_iter()
            .flatten()
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }

    pub fn len(&self) -> usize {
        Category::iter()
            .filter_map(|c| self.entries.get(&c))
            .map(IndexMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_entries_read_as_sentinel() {
        let map = StatusMap::default();
        assert_eq!(map.state(Category::Nodes, "n0"), UNKNOWN);
        assert!(map.get(Category::Links, "l0").is_none());
        assert!(map.is_empty());
    }

    #[test]
    fn decodes_backend_payload() {
        let map = StatusMap::from_json(json!({
            "nodes": {
                "n0": { "Name": "n0", "State": "running", "ConfigState": "success",
                        "IP": "172.22.0.2", "Macs": ["04:70:00:00:00:01"], "VNC": 5900 }
            },
            "switches": { "nimbus": { "Name": "nimbus", "State": "off" } },
            "links": { "n0_eth0-nimbus_swp0": "up" },
            "mgmtip": "172.22.0.1"
        }))
        .unwrap();

        assert_eq!(map.state(Category::Nodes, "n0"), "running");
        assert_eq!(
            map.get(Category::Nodes, "n0").unwrap().config_state(),
            Some("success")
        );
        assert_eq!(map.state(Category::Switches, "nimbus"), "off");
        assert_eq!(map.state(Category::Links, "n0_eth0-nimbus_swp0"), "up");
        assert_eq!(map.extra("mgmtip"), Some(&json!("172.22.0.1")));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn null_payload_is_empty() {
        assert!(StatusMap::from_json(Value::Null).unwrap().is_empty());
        assert!(StatusMap::from_json(json!([1])).is_err());
    }

    #[test]
    fn category_names() {
        assert_eq!("switches".parse::<Category>().unwrap(), Category::Switches);
        assert_eq!(Category::Links.to_string(), "links");
    }
}
