//! Application services: use-case implementations.
//!
//! Each service struct accepts port trait implementations via generic parameters
//! (constructor injection), keeping this layer decoupled from concrete adapters.

pub mod location_service;
pub mod policy_service;
pub mod registry_service;
pub mod resource_service;
pub mod scheduling_service;

#[cfg(test)]
pub(crate) mod test_support;

use medinfra_domain::audit::AuditRecord;

use crate::ports::AuditSink;

/// Hand a record to the audit sink; a failing sink never fails the mutation.
pub(crate) async fn emit<A: AuditSink>(audit: &A, record: AuditRecord) {
    let action = record.action;
    let entity_id = record.entity_id.clone();
    if let Err(err) = audit.record(record).await {
        tracing::warn!(%action, %entity_id, error = %err, "failed to publish audit record");
    }
}
