//! JSON REST handlers for the caller's branch policy.

use axum::Json;
use axum::extract::State;

use medinfra_app::ports::{AuditSink, Store};
use medinfra_domain::policy::BranchPolicy;

use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// `GET /api/policy`
///
/// Branches that never stored a policy get the defaults.
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
) -> Result<Json<BranchPolicy>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let policy = state.policy.get(&scope).await?;
    Ok(Json(policy))
}

/// `PUT /api/policy`
pub async fn put<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(policy): Json<BranchPolicy>,
) -> Result<Json<BranchPolicy>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let policy = state.policy.put(&scope, policy).await?;
    Ok(Json(policy))
}
