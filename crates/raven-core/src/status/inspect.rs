// Click-driven inspection: an entity's document joined with its status.

use serde_json::Value;

use super::board::StatusBoard;
use super::map::{Category, UNKNOWN};
use crate::model::{Role, Topology};

/// The node, switch or link called `name` as JSON, with a `status` field
/// taken from `board`. The topology itself is never touched.
pub fn inspect(topology: &Topology, board: &StatusBoard, name: &str) -> Option<Value> {
    let (category, mut doc) = if let Some(entity) = topology.entity(name) {
        let category = match entity.role() {
            Role::Node => Category::Nodes,
            Role::Switch => Category::Switches,
        };
        (category, entity.to_json())
    } else {
        let link = topology.link(name)?;
        (Category::Links, serde_json::to_value(link).ok()?)
    };

    let status = board
        .lookup(category, name)
        .map_or_else(|| Value::String(UNKNOWN.into()), |v| v.to_json());
    if let Value::Object(map) = &mut doc {
        map.insert("status".into(), status);
    }
    Some(doc)
}
