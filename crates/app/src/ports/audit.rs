//! Audit port: fire-and-forget sink for audit records.

use std::future::Future;

use medinfra_domain::audit::AuditRecord;
use medinfra_domain::error::InfraError;

/// Receives one [`AuditRecord`] per successful mutation.
pub trait AuditSink {
    /// Hand a record to the sink. Failures are logged by the caller, never
    /// propagated to the mutation that produced the record.
    fn record(&self, record: AuditRecord) -> impl Future<Output = Result<(), InfraError>> + Send;
}

impl<T: AuditSink + Send + Sync> AuditSink for std::sync::Arc<T> {
    fn record(&self, record: AuditRecord) -> impl Future<Output = Result<(), InfraError>> + Send {
        (**self).record(record)
    }
}
