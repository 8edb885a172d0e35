//! Location hierarchy: campus, building, floor, zone and area nodes with
//! effective-dated revisions.
//!
//! A [`LocationNode`] carries the identity that never changes (kind, parent,
//! branch). Everything else lives on [`LocationRevision`]s whose periods never
//! overlap for the same node.

mod ancestry;
mod kind;
mod revision;
mod tree;

use serde::{Deserialize, Serialize};

pub use ancestry::{MAX_ANCESTRY_HOPS, ancestry};
pub use kind::LocationKind;
pub use revision::{
    AttributePatch, GeoPoint, LocationAttributes, LocationRevision, LocationRevisionBuilder,
    normalize_fire_zone,
};
pub use tree::{TreeNode, build_forest};

use crate::error::ValidationError;
use crate::id::{BranchId, LocationNodeId};
use crate::time::Timestamp;

/// Immutable identity of a place in the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationNode {
    pub id: LocationNodeId,
    pub branch_id: BranchId,
    pub kind: LocationKind,
    pub parent_id: Option<LocationNodeId>,
    pub created_at: Timestamp,
}

impl LocationNode {
    /// Create a node below `parent`, checking the kind relationship.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when the parent is missing, unexpected or
    /// of the wrong kind.
    pub fn new(
        branch_id: BranchId,
        kind: LocationKind,
        parent: Option<&LocationNode>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        kind.check_parent(parent.map(|p| p.kind))?;
        Ok(Self {
            id: LocationNodeId::new(),
            branch_id,
            kind,
            parent_id: parent.map(|p| p.id),
            created_at,
        })
    }
}

/// A node together with the revision effective at some instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    #[serde(flatten)]
    pub node: LocationNode,
    #[serde(rename = "current")]
    pub revision: LocationRevision,
}

/// A node, its current revision and its full history ordered by start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDetail {
    #[serde(flatten)]
    pub node: LocationNode,
    pub current: Option<LocationRevision>,
    pub history: Vec<LocationRevision>,
}
