//! Location service: the effective-dated location hierarchy.

use std::collections::{HashMap, HashSet};

use medinfra_domain::audit::{AuditAction, AuditRecord};
use medinfra_domain::code;
use medinfra_domain::error::{InfraError, NotFoundError, ValidationError};
use medinfra_domain::id::{BranchId, LocationNodeId};
use medinfra_domain::location::{
    AttributePatch, LocationAttributes, LocationDetail, LocationKind, LocationNode,
    LocationRevision, LocationView, TreeNode, ancestry, build_forest,
};
use medinfra_domain::scope::Scope;
use medinfra_domain::time::{EffectivePeriod, Timestamp, now};

use crate::ports::{AuditSink, LocationRepository, Supersede};
use crate::services::emit;

/// Default cap on rows loaded for one reconstruction.
pub const DEFAULT_MAX_TREE_NODES: usize = 10_000;

/// Input for [`LocationService::create`].
#[derive(Debug, Clone)]
pub struct NewLocation {
    pub kind: LocationKind,
    pub parent_id: Option<LocationNodeId>,
    /// Segment; the full code is composed with the parent's code.
    pub code: String,
    pub name: String,
    pub effective_from: Option<Timestamp>,
    pub effective_to: Option<Timestamp>,
    pub is_active: Option<bool>,
    pub attributes: LocationAttributes,
}

/// Input for [`LocationService::revise`]. Missing fields carry over.
#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub effective_from: Option<Timestamp>,
    pub effective_to: Option<Timestamp>,
    pub attributes: AttributePatch,
}

/// Load a node of the scope's branch; foreign nodes look missing.
pub(crate) async fn branch_node<S: LocationRepository>(
    store: &S,
    scope: &Scope,
    id: LocationNodeId,
) -> Result<LocationNode, InfraError> {
    let node = store
        .get_location_node(id)
        .await?
        .ok_or_else(|| NotFoundError::new("LocationNode", id))?;
    scope.ensure_owns(node.branch_id, "LocationNode", id)?;
    Ok(node)
}

/// A node usable for placing units or departments at `at`: in the branch,
/// with an effective revision, and active.
pub(crate) async fn active_location<S: LocationRepository>(
    store: &S,
    scope: &Scope,
    id: LocationNodeId,
    at: Timestamp,
) -> Result<LocationView, InfraError> {
    let node = branch_node(store, scope, id).await?;
    let revision = store
        .location_revision_at(id, at)
        .await?
        .ok_or(ValidationError::NoEffectiveRevision(id))?;
    if !revision.is_active {
        return Err(ValidationError::LocationInactive(id).into());
    }
    Ok(LocationView { node, revision })
}

/// Ancestor set of `id` (inclusive) within the branch.
pub(crate) async fn ancestors_of<S: LocationRepository>(
    store: &S,
    branch_id: BranchId,
    id: LocationNodeId,
) -> Result<HashSet<LocationNodeId>, InfraError> {
    let parents: HashMap<_, _> = store.location_parents(branch_id).await?.into_iter().collect();
    Ok(ancestry(id, &parents))
}

/// Application service for the temporal location hierarchy.
pub struct LocationService<S, A> {
    store: S,
    audit: A,
    max_tree_nodes: usize,
}

impl<S, A> LocationService<S, A>
where
    S: LocationRepository + Send + Sync,
    A: AuditSink + Send + Sync,
{
    /// Create a new service backed by the given store and audit sink.
    pub fn new(store: S, audit: A) -> Self {
        Self {
            store,
            audit,
            max_tree_nodes: DEFAULT_MAX_TREE_NODES,
        }
    }

    /// Override the reconstruction row cap.
    #[must_use]
    pub fn with_max_tree_nodes(mut self, max_tree_nodes: usize) -> Self {
        self.max_tree_nodes = max_tree_nodes;
        self
    }

    async fn code_for(
        &self,
        parent: Option<&LocationNode>,
        segment: &str,
        at: Timestamp,
    ) -> Result<String, InfraError> {
        let segment = code::segment(segment)?;
        let Some(parent) = parent else {
            return Ok(segment);
        };
        let parent_revision = self
            .store
            .location_revision_at(parent.id, at)
            .await?
            .ok_or(ValidationError::NoEffectiveRevision(parent.id))?;
        Ok(code::compose(Some(&parent_revision.code), &segment))
    }

    /// Create a node with its first revision.
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] when the parent is missing or in another branch
    /// - [`InfraError::Validation`] for a kind/parent mismatch, misplaced
    ///   attributes, an invalid period or code, or a parent without a
    ///   revision at `effective_from`
    /// - [`InfraError::Conflict`] when the composed code is held by another
    ///   node during an overlapping period
    #[tracing::instrument(skip(self, input), fields(kind = %input.kind, code = %input.code))]
    pub async fn create(&self, scope: &Scope, input: NewLocation) -> Result<LocationView, InfraError> {
        let created_at = now();
        let parent = match input.parent_id {
            Some(id) => Some(branch_node(&self.store, scope, id).await?),
            None => None,
        };
        let node = LocationNode::new(scope.branch_id, input.kind, parent.as_ref(), created_at)?;
        let period = EffectivePeriod::new(
            input.effective_from.unwrap_or(created_at),
            input.effective_to,
        )?;
        input.attributes.validate_for(input.kind)?;
        let code = self
            .code_for(parent.as_ref(), &input.code, period.effective_from)
            .await?;

        let revision = LocationRevision::builder()
            .node_id(node.id)
            .code(code)
            .name(input.name)
            .is_active(input.is_active.unwrap_or(true))
            .period(period)
            .attributes(input.attributes)
            .created_by(scope.actor_id)
            .created_at(created_at)
            .build()?;

        let view = self.store.create_location(node, revision).await?;
        tracing::info!(node_id = %view.node.id, code = %view.revision.code, kind = %view.node.kind, "location created");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::LocationCreate,
                "LocationNode",
                view.node.id,
                serde_json::json!({
                    "kind": view.node.kind,
                    "code": view.revision.code,
                    "effectiveFrom": view.revision.period.effective_from,
                    "effectiveTo": view.revision.period.effective_to,
                }),
            ),
        )
        .await;
        Ok(view)
    }

    /// Append a revision effective from `patch.effective_from` (default now).
    ///
    /// # Errors
    ///
    /// - [`InfraError::NotFound`] for a missing or foreign node
    /// - [`InfraError::Validation`] when no revision is effective at the new
    ///   start, the new start is not after the current revision's start, or
    ///   the patch is invalid
    /// - [`InfraError::Conflict`] on a temporal code collision or an overlap
    ///   with the node's own later history
    #[tracing::instrument(skip(self, patch))]
    pub async fn revise(
        &self,
        scope: &Scope,
        id: LocationNodeId,
        patch: LocationPatch,
    ) -> Result<LocationRevision, InfraError> {
        let created_at = now();
        let node = branch_node(&self.store, scope, id).await?;
        let from = patch.effective_from.unwrap_or(created_at);
        let current = self
            .store
            .location_revision_at(id, from)
            .await?
            .ok_or(ValidationError::NoEffectiveRevision(id))?;
        if from <= current.period.effective_from {
            return Err(ValidationError::RevisionNotAfterCurrent.into());
        }
        let period = EffectivePeriod::new(from, patch.effective_to)?;

        let code = match &patch.code {
            Some(segment) => {
                let parent = match node.parent_id {
                    Some(parent_id) => self.store.get_location_node(parent_id).await?,
                    None => None,
                };
                self.code_for(parent.as_ref(), segment, from).await?
            }
            None => current.code.clone(),
        };
        let attributes = current.attributes.apply(&patch.attributes);
        attributes.validate_for(node.kind)?;

        let revision = LocationRevision::builder()
            .node_id(id)
            .code(code)
            .name(patch.name.unwrap_or_else(|| current.name.clone()))
            .is_active(patch.is_active.unwrap_or(current.is_active))
            .period(period)
            .attributes(attributes)
            .created_by(scope.actor_id)
            .created_at(created_at)
            .build()?;
        let supersede = current.period.extends_past(from).then_some(Supersede {
            revision_id: current.id,
            effective_to: from,
        });

        let revision = self.store.revise_location(&node, supersede, revision).await?;
        tracing::info!(node_id = %id, code = %revision.code, from = %from, "location revised");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::LocationUpdate,
                "LocationNode",
                id,
                serde_json::json!({
                    "revisionId": revision.id,
                    "previousRevisionId": current.id,
                    "code": revision.code,
                    "effectiveFrom": revision.period.effective_from,
                }),
            ),
        )
        .await;
        Ok(revision)
    }

    async fn load_at(
        &self,
        scope: &Scope,
        at: Timestamp,
        kind: Option<LocationKind>,
    ) -> Result<Vec<LocationView>, InfraError> {
        let rows = self
            .store
            .locations_at(scope.branch_id, at, kind, self.max_tree_nodes.saturating_add(1))
            .await?;
        if rows.len() > self.max_tree_nodes {
            return Err(ValidationError::TreeTooLarge {
                limit: self.max_tree_nodes,
            }
            .into());
        }
        Ok(rows)
    }

    /// Reconstruct the branch's hierarchy as it was (or will be) at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TreeTooLarge`] past the row cap, or a
    /// storage error.
    #[tracing::instrument(skip(self))]
    pub async fn tree(&self, scope: &Scope, at: Option<Timestamp>) -> Result<Vec<TreeNode>, InfraError> {
        let rows = self.load_at(scope, at.unwrap_or_else(now), None).await?;
        Ok(build_forest(rows))
    }

    /// Flat list of nodes effective at `at`, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::TreeTooLarge`] past the row cap, or a
    /// storage error.
    pub async fn list(
        &self,
        scope: &Scope,
        at: Option<Timestamp>,
        kind: Option<LocationKind>,
    ) -> Result<Vec<LocationView>, InfraError> {
        self.load_at(scope, at.unwrap_or_else(now), kind).await
    }

    /// One node with its current revision and full history.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign node.
    pub async fn get(&self, scope: &Scope, id: LocationNodeId) -> Result<LocationDetail, InfraError> {
        let node = branch_node(&self.store, scope, id).await?;
        let history = self.store.location_history(id).await?;
        let at = now();
        let current = history.iter().find(|r| r.period.contains(at)).cloned();
        Ok(LocationDetail {
            node,
            current,
            history,
        })
    }

    /// Ancestor ids of `id` including itself.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] for a missing or foreign node.
    pub async fn ancestry(
        &self,
        scope: &Scope,
        id: LocationNodeId,
    ) -> Result<HashSet<LocationNodeId>, InfraError> {
        branch_node(&self.store, scope, id).await?;
        ancestors_of(&self.store, scope.branch_id, id).await
    }

    /// Check a node can host a unit: active in the branch now and FLOOR or deeper.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] or [`InfraError::Validation`].
    pub async fn assert_valid_placement(
        &self,
        scope: &Scope,
        id: LocationNodeId,
    ) -> Result<LocationView, InfraError> {
        let view = active_location(&self.store, scope, id, now()).await?;
        if view.node.kind.depth() < LocationKind::Floor.depth() {
            return Err(ValidationError::LocationTooShallow(view.node.kind).into());
        }
        Ok(view)
    }
}
