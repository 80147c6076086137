// ── Topology validation ──
//
// Turns a raw evaluation result into a canonical `Topology` and enforces
// the model invariants. Fails closed: the first violation rejects the whole
// document, nothing is dropped or repaired beyond deriving missing link
// names.

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::error::{CoreError, ValidationError, ValidationRule};
use crate::model::{Link, Topology};

/// Decode, canonicalize and validate a raw topology document.
pub fn from_value(value: Value) -> Result<Topology, CoreError> {
    let mut topology: Topology = serde_path_to_error::deserialize(value).map_err(|e| {
        let path = e.path().to_string();
        ValidationError::new(ValidationRule::Schema, path, e.into_inner().to_string())
    })?;
    canonicalize(&mut topology);
    validate(&topology)?;
    debug!(
        topology = %topology.name,
        nodes = topology.nodes.len(),
        switches = topology.switches.len(),
        links = topology.links.len(),
        "topology validated"
    );
    Ok(topology)
}

/// Fill in derived link names for links authored without one.
pub fn canonicalize(topology: &mut Topology) {
    for link in &mut topology.links {
        if link.name.is_empty() {
            link.name = link.effective_name();
        }
    }
}

/// Check every model invariant.
pub fn validate(topology: &Topology) -> Result<(), ValidationError> {
    if topology.name.trim().is_empty() {
        return Err(ValidationError::new(
            ValidationRule::EmptyName,
            "<topology>",
            "the topology needs a non-empty `name`",
        ));
    }

    let names = check_participants(topology)?;
    check_images(topology)?;
    check_links(&topology.links, &names)
}

// ── Nodes and switches ───────────────────────────────────────────────

fn check_participants(topology: &Topology) -> Result<HashSet<&str>, ValidationError> {
    let mut names: HashMap<&str, &'static str> = HashMap::new();

    for (index, p) in topology.participants().enumerate() {
        let role: &'static str = p.role().into();
        if p.name().trim().is_empty() {
            return Err(ValidationError::new(
                ValidationRule::EmptyName,
                format!("{role} #{index}"),
                format!("every {role} needs a non-empty `name`"),
            ));
        }
        if let Some(first) = names.insert(p.name(), role) {
            return Err(ValidationError::new(
                ValidationRule::DuplicateName,
                p.name(),
                format!("name is used by a {first} and a {role}"),
            ));
        }
        if let Some(level) = p.level().filter(|l| *l < 0) {
            return Err(ValidationError::new(
                ValidationRule::InvalidLevel,
                p.name(),
                format!("level must be a non-negative integer, got {level}"),
            ));
        }
        for (i, mount) in p.mounts().iter().enumerate() {
            let missing = match (mount.source.trim().is_empty(), mount.point.trim().is_empty()) {
                (true, true) => Some("source and point"),
                (true, false) => Some("source"),
                (false, true) => Some("point"),
                (false, false) => None,
            };
            if let Some(missing) = missing {
                return Err(ValidationError::new(
                    ValidationRule::InvalidMount,
                    p.name(),
                    format!("mount #{i} has an empty {missing}"),
                ));
            }
        }
    }

    for node in &topology.nodes {
        if let Some(cores) = node.cpu.as_ref().and_then(|c| c.cores).filter(|c| *c <= 0) {
            return Err(ValidationError::new(
                ValidationRule::InvalidCpu,
                &node.name,
                format!("cpu cores must be positive, got {cores}"),
            ));
        }
        if let Some(memory) = node.memory.as_ref().filter(|m| !m.capacity.is_valid()) {
            return Err(ValidationError::new(
                ValidationRule::InvalidSize,
                &node.name,
                format!("memory capacity must be non-negative, got {}", memory.capacity),
            ));
        }
    }

    Ok(names.into_keys().collect())
}

fn check_images(topology: &Topology) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for (index, image) in topology.images.iter().flatten().enumerate() {
        if image.name.trim().is_empty() {
            return Err(ValidationError::new(
                ValidationRule::EmptyName,
                format!("image #{index}"),
                "every image needs a non-empty `name`",
            ));
        }
        if !seen.insert(image.name.as_str()) {
            return Err(ValidationError::new(
                ValidationRule::DuplicateImage,
                &image.name,
                "image is declared more than once",
            ));
        }
    }
    Ok(())
}

// ── Links ────────────────────────────────────────────────────────────

fn check_links(links: &[Link], names: &HashSet<&str>) -> Result<(), ValidationError> {
    let mut by_name: HashSet<&str> = HashSet::new();
    let mut by_endpoints = HashMap::new();

    for link in links {
        for endpoint in &link.endpoints {
            if !names.contains(endpoint.name.as_str()) {
                return Err(ValidationError::new(
                    ValidationRule::DanglingEndpoint,
                    &endpoint.name,
                    format!(
                        "link `{}` references `{}`, which is not a node or switch",
                        link.name, endpoint.name
                    ),
                ));
            }
        }
        if !by_name.insert(link.name.as_str()) {
            return Err(ValidationError::new(
                ValidationRule::DuplicateLink,
                &link.name,
                "two links share this name",
            ));
        }
        if let Some(other) = by_endpoints.insert(link.endpoint_key(), link.name.as_str()) {
            return Err(ValidationError::new(
                ValidationRule::DuplicateLink,
                &link.name,
                format!("connects the same ports as link `{other}`"),
            ));
        }
    }
    Ok(())
}
