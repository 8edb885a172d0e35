//! Caller scope: the already-resolved branch and actor of a request.

use serde::{Deserialize, Serialize};

use crate::error::NotFoundError;
use crate::id::{ActorId, BranchId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub branch_id: BranchId,
    pub actor_id: ActorId,
}

impl Scope {
    #[must_use]
    pub fn new(branch_id: BranchId, actor_id: ActorId) -> Self {
        Self {
            branch_id,
            actor_id,
        }
    }

    /// Treat records of other branches exactly like missing ones.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when `owner` is not this scope's branch.
    pub fn ensure_owns(
        &self,
        owner: BranchId,
        entity: &'static str,
        id: impl std::fmt::Display,
    ) -> Result<(), NotFoundError> {
        if owner == self.branch_id {
            Ok(())
        } else {
            Err(NotFoundError::new(entity, id))
        }
    }
}
