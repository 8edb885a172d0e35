//! Caller scope extraction from request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use medinfra_domain::id::{ActorId, BranchId};
use medinfra_domain::scope::Scope;

use crate::error::ApiError;

/// Header carrying the already-authorised branch.
pub const BRANCH_HEADER: &str = "x-branch-id";
/// Header carrying the already-authenticated actor.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The [`Scope`] of the request, read from [`BRANCH_HEADER`] and [`ACTOR_HEADER`].
#[derive(Debug, Clone, Copy)]
pub struct CallerScope(pub Scope);

fn header<T: std::str::FromStr>(parts: &Parts, name: &str) -> Result<T, ApiError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?;
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("malformed {name} header")))
}

impl<St: Send + Sync> FromRequestParts<St> for CallerScope {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let branch_id: BranchId = header(parts, BRANCH_HEADER)?;
        let actor_id: ActorId = header(parts, ACTOR_HEADER)?;
        Ok(Self(Scope::new(branch_id, actor_id)))
    }
}
