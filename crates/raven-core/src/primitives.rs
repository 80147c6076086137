// ── Modeling primitives ──
//
// Pure builder functions with no side effects. Scripts reach the same
// behavior through the prelude; Rust callers use these directly. None of
// them validate beyond their own arguments: the validator runs later.

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::model::link::number_to_port;
use crate::model::{Endpoint, Image, Link, Mount, Node, Switch, Topology};

/// Default image and os for `switch`.
pub const SWITCH_IMAGE: &str = "cumulus-latest";
pub const SWITCH_OS: &str = "linux";

/// A port identifier as authored: a name like `"eth0"` or a number like `1`.
#[derive(Debug, Clone, PartialEq)]
pub enum Port {
    Name(String),
    Number(f64),
}

impl Port {
    /// Canonical string form used in endpoints and link names.
    pub fn normalize(&self) -> String {
        match self {
            Self::Name(s) => s.clone(),
            Self::Number(n) => number_to_port(*n),
        }
    }
}

impl From<&str> for Port {
    fn from(s: &str) -> Self {
        Self::Name(s.to_owned())
    }
}

impl From<String> for Port {
    fn from(s: String) -> Self {
        Self::Name(s)
    }
}

impl From<f64> for Port {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<u32> for Port {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i32> for Port {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

/// `[0, n)`.
pub fn range(n: i64) -> Result<Vec<i64>, CoreError> {
    if n < 0 {
        return Err(CoreError::invalid_argument(format!(
            "range length must be non-negative, got {n}"
        )));
    }
    Ok((0..n).collect())
}

/// Remainder with the sign of the divisor, so `modulo(-1, 4) == 3`.
pub fn modulo(n: i64, m: i64) -> Result<i64, CoreError> {
    if m == 0 {
        return Err(CoreError::invalid_argument("modulus must be non-zero"));
    }
    Ok(((n % m) + m) % m)
}

pub fn node(
    name: impl Into<String>,
    level: Option<i64>,
    mounts: Vec<Mount>,
    image: Option<&str>,
    os: Option<&str>,
) -> Node {
    Node {
        name: name.into(),
        image: image.map(str::to_owned),
        os: os.map(str::to_owned),
        platform: None,
        kernel: None,
        level,
        cpu: None,
        memory: None,
        mounts: Some(mounts),
        extra: Map::new(),
    }
}

pub fn switch(name: impl Into<String>, level: Option<i64>, mounts: Vec<Mount>) -> Switch {
    Switch {
        name: name.into(),
        image: Some(SWITCH_IMAGE.into()),
        os: Some(SWITCH_OS.into()),
        platform: None,
        kernel: None,
        level,
        mounts: Some(mounts),
        extra: Map::new(),
    }
}

/// Connect `a.port_a` to `b.port_b`. Ports are normalized to strings here,
/// so numeric and string authoring produce identical links.
pub fn link(
    a: &str,
    port_a: impl Into<Port>,
    b: &str,
    port_b: impl Into<Port>,
    props: Option<Map<String, Value>>,
) -> Link {
    let ea = Endpoint::new(a, port_a.into().normalize());
    let eb = Endpoint::new(b, port_b.into().normalize());
    Link {
        name: Link::derive_name(&ea, &eb),
        endpoints: [ea, eb],
        props: Some(props.unwrap_or_default()),
        capacity: None,
        extra: Map::new(),
    }
}

pub fn image(name: impl Into<String>, arch: Option<&str>, version: Option<&str>) -> Image {
    Image {
        name: name.into(),
        arch: arch.map(str::to_owned),
        version: version.map(str::to_owned),
        extra: Map::new(),
    }
}

/// A topology-shaped document without a name.
pub fn topo(
    nodes: Vec<Node>,
    images: Option<Vec<Image>>,
    links: Vec<Link>,
    switches: Vec<Switch>,
) -> Topology {
    Topology {
        name: String::new(),
        nodes,
        switches,
        links,
        images,
        options: None,
        extra: Map::new(),
    }
}

/// `n` identical NIC descriptors `{speed, nic}`.
pub fn nic(n: i64, speed: Value, nic: Value) -> Result<Vec<Value>, CoreError> {
    let count = usize::try_from(n).map_err(|_| {
        CoreError::invalid_argument(format!("nic count must be non-negative, got {n}"))
    })?;
    let mut entry = Map::new();
    entry.insert("speed".into(), speed);
    entry.insert("nic".into(), nic);
    Ok(vec![Value::Object(entry); count])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn range_counts() {
        assert_eq!(range(0).unwrap(), Vec::<i64>::new());
        assert_eq!(range(4).unwrap(), vec![0, 1, 2, 3]);
        for n in 0..50 {
            let r = range(n).unwrap();
            assert_eq!(r.len(), usize::try_from(n).unwrap());
            assert!(r.iter().enumerate().all(|(i, v)| usize::try_from(*v).unwrap() == i));
        }
        assert!(matches!(range(-1), Err(CoreError::InvalidArgument { .. })));
    }

    #[test]
    fn modulo_is_non_negative() {
        assert_eq!(modulo(-1, 4).unwrap(), 3);
        assert_eq!(modulo(9, 4).unwrap(), 1);
        assert!(modulo(1, 0).is_err());
    }

    #[test]
    fn link_ports_normalize() {
        let numeric = link("thing", 1, "sw", 1, None);
        let textual = link("thing", "1", "sw", "1", None);
        assert_eq!(numeric, textual);
        assert_eq!(numeric.name, "thing_1-sw_1");
        assert_eq!(numeric.props, Some(Map::new()));
    }

    #[test]
    fn link_keeps_endpoint_order() {
        let l = link("n0", "eth0", "nimbus", "swp0", None);
        assert_eq!(l.endpoints[0], Endpoint::new("n0", "eth0"));
        assert_eq!(l.endpoints[1], Endpoint::new("nimbus", "swp0"));
        assert_eq!(l.name, "n0_eth0-nimbus_swp0");
    }

    #[test]
    fn switch_defaults() {
        let s = switch("stem", Some(2), vec![]);
        assert_eq!(
            serde_json::to_value(&s).unwrap(),
            json!({ "name": "stem", "image": "cumulus-latest", "os": "linux", "level": 2, "mounts": [] })
        );
    }

    #[test]
    fn nic_copies() {
        let nics = nic(2, json!(1000), json!("e1000")).unwrap();
        assert_eq!(nics.len(), 2);
        assert_eq!(nics[1], json!({ "speed": 1000, "nic": "e1000" }));
        assert!(nic(-1, json!(1), json!(0)).is_err());
    }
}
