//! Policy service: per-branch housekeeping and pre-check settings.

use medinfra_domain::audit::{AuditAction, AuditRecord};
use medinfra_domain::error::InfraError;
use medinfra_domain::policy::BranchPolicy;
use medinfra_domain::scope::Scope;

use crate::ports::{AuditSink, PolicyRepository};
use crate::services::emit;

/// Application service for branch policy.
pub struct PolicyService<S, A> {
    store: S,
    audit: A,
}

impl<S, A> PolicyService<S, A>
where
    S: PolicyRepository + Send + Sync,
    A: AuditSink + Send + Sync,
{
    /// Create a new service backed by the given store and audit sink.
    pub fn new(store: S, audit: A) -> Self {
        Self { store, audit }
    }

    /// The branch's policy, or the default when none is stored.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub async fn get(&self, scope: &Scope) -> Result<BranchPolicy, InfraError> {
        Ok(self
            .store
            .get_policy(scope.branch_id)
            .await?
            .unwrap_or_default())
    }

    /// Replace the branch's policy.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    #[tracing::instrument(skip(self))]
    pub async fn put(&self, scope: &Scope, policy: BranchPolicy) -> Result<BranchPolicy, InfraError> {
        let previous = self.get(scope).await?;
        let policy = self.store.put_policy(scope.branch_id, policy).await?;
        tracing::info!(branch_id = %scope.branch_id, "branch policy updated");
        emit(
            &self.audit,
            AuditRecord::new(
                scope,
                AuditAction::PolicyUpdate,
                "BranchPolicy",
                scope.branch_id,
                serde_json::json!({ "previous": previous, "current": policy }),
            ),
        )
        .await;
        Ok(policy)
    }
}
