//! Forest reconstruction from a flat "effective at t" row set.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};

use super::{LocationKind, LocationNode, LocationRevision, LocationView};
use crate::id::LocationNodeId;
use crate::time::Timestamp;

/// A node with its effective revision and its ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub node: LocationNode,
    pub revision: LocationRevision,
    pub children: Vec<TreeNode>,
}

/// Build the forest of nodes visible at one instant.
///
/// Children are grouped by `parent_id`; a node whose parent is not part of
/// `rows` becomes a root. Roots and siblings are ordered by code.
#[must_use]
pub fn build_forest(rows: Vec<LocationView>) -> Vec<TreeNode> {
    let present: HashSet<LocationNodeId> = rows.iter().map(|row| row.node.id).collect();
    let mut roots = Vec::new();
    let mut children: HashMap<LocationNodeId, Vec<LocationView>> = HashMap::new();
    for row in rows {
        match row.node.parent_id {
            Some(parent) if present.contains(&parent) => {
                children.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    let mut forest: Vec<TreeNode> = roots
        .into_iter()
        .map(|row| assemble(row, &mut children))
        .collect();
    sort_by_code(&mut forest);
    forest
}

fn assemble(row: LocationView, children: &mut HashMap<LocationNodeId, Vec<LocationView>>) -> TreeNode {
    let own = children.remove(&row.node.id).unwrap_or_default();
    let mut nested: Vec<TreeNode> = own.into_iter().map(|child| assemble(child, children)).collect();
    sort_by_code(&mut nested);
    TreeNode {
        node: row.node,
        revision: row.revision,
        children: nested,
    }
}

fn sort_by_code(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| a.revision.code.cmp(&b.revision.code));
}

fn children_key(kind: LocationKind) -> Option<&'static str> {
    match kind {
        LocationKind::Campus => Some("buildings"),
        LocationKind::Building => Some("floors"),
        LocationKind::Floor => Some("zones"),
        LocationKind::Zone => Some("areas"),
        LocationKind::Area => None,
    }
}

/// Flat wire shape of one tree node: identity, effective revision fields and
/// the children under the key of the next kind down.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Wire<'a> {
    id: LocationNodeId,
    #[serde(rename = "type")]
    kind: LocationKind,
    parent_id: Option<LocationNodeId>,
    code: &'a str,
    name: &'a str,
    is_active: bool,
    effective_from: Timestamp,
    effective_to: Option<Timestamp>,
    gps_lat: Option<f64>,
    gps_lng: Option<f64>,
    floor_number: Option<i32>,
    wheelchair_access: bool,
    stretcher_access: bool,
    emergency_exit: bool,
    fire_zone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    buildings: Option<&'a [TreeNode]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    floors: Option<&'a [TreeNode]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    zones: Option<&'a [TreeNode]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    areas: Option<&'a [TreeNode]>,
}

impl Serialize for TreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let key = children_key(self.node.kind);
        let slot = |name: &str| (key == Some(name)).then_some(self.children.as_slice());
        let revision = &self.revision;
        let attributes = &revision.attributes;
        Wire {
            id: self.node.id,
            kind: self.node.kind,
            parent_id: self.node.parent_id,
            code: &revision.code,
            name: &revision.name,
            is_active: revision.is_active,
            effective_from: revision.period.effective_from,
            effective_to: revision.period.effective_to,
            gps_lat: attributes.gps.map(|gps| gps.lat),
            gps_lng: attributes.gps.map(|gps| gps.lng),
            floor_number: attributes.floor_number,
            wheelchair_access: attributes.wheelchair_access,
            stretcher_access: attributes.stretcher_access,
            emergency_exit: attributes.emergency_exit,
            fire_zone: attributes.fire_zone.as_deref(),
            buildings: slot("buildings"),
            floors: slot("floors"),
            zones: slot("zones"),
            areas: slot("areas"),
        }
        .serialize(serializer)
    }
}
