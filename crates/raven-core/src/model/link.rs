// ── Links ──
//
// A point-to-point connection between two named entities' named ports.
// Ports are canonical strings: numeric ports are normalized when a document
// is read or a link is built, so `3` and `"3"` are the same endpoint.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::units::integral;

/// One side of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: String,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.name, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// Derived from the endpoints when empty; see [`Link::derive_name`].
    #[serde(default)]
    pub name: String,
    pub endpoints: [Endpoint; 2],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Link {
    /// The stable name for an endpoint pair: `"{a}_{portA}-{b}_{portB}"`.
    pub fn derive_name(a: &Endpoint, b: &Endpoint) -> String {
        format!("{}_{}-{}_{}", a.name, a.port, b.name, b.port)
    }

    /// The link's own name, or the derived one when it has none.
    pub fn effective_name(&self) -> String {
        if self.name.is_empty() {
            let [a, b] = &self.endpoints;
            Self::derive_name(a, b)
        } else {
            self.name.clone()
        }
    }

    /// The endpoint pair in a canonical order, so `a–b` and `b–a` compare equal.
    pub fn endpoint_key(&self) -> (&Endpoint, &Endpoint) {
        let [a, b] = &self.endpoints;
        if (&a.name, &a.port) <= (&b.name, &b.port) {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// `true` if either endpoint is attached to `name`.
    pub fn touches(&self, name: &str) -> bool {
        self.endpoints.iter().any(|e| e.name == name)
    }
}

// ── Port normalization ───────────────────────────────────────────────

/// Canonical string form of a numeric port: integral values print without
/// a fraction (`3`, not `3.0`).
pub fn number_to_port(n: f64) -> String {
    match integral(n) {
        Some(i) => i.to_string(),
        None if n.is_nan() => "NaN".into(),
        None if n.is_infinite() => if n > 0.0 { "Infinity" } else { "-Infinity" }.into(),
        None => n.to_string(),
    }
}

fn json_number_to_port(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        number_to_port(n.as_f64().unwrap_or(f64::NAN))
    }
}

fn deserialize_port<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged, expecting = "a port name or number")]
    enum PortRepr {
        Name(String),
        Number(Number),
    }

    Ok(match PortRepr::deserialize(deserializer)? {
        PortRepr::Name(s) => s,
        PortRepr::Number(n) => json_number_to_port(&n),
    })
}
