//! In-process audit bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use medinfra_domain::audit::AuditRecord;
use medinfra_domain::error::InfraError;

use crate::ports::AuditSink;

/// In-process audit sink using a tokio [`broadcast`] channel.
///
/// Recording succeeds even when there are no active subscribers
/// (the record is simply dropped).
pub struct InProcessAuditBus {
    sender: broadcast::Sender<AuditRecord>,
}

impl InProcessAuditBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to records published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuditRecord> {
        self.sender.subscribe()
    }
}

impl AuditSink for InProcessAuditBus {
    fn record(&self, record: AuditRecord) -> impl Future<Output = Result<(), InfraError>> + Send {
        // send fails only when nobody listens
        let _ = self.sender.send(record);
        async { Ok(()) }
    }
}
