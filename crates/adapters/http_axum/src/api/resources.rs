//! JSON REST handlers for unit resources and their state machine.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use medinfra_app::ports::{AuditSink, ResourceFilter, Store};
use medinfra_app::services::registry_service::NewResource;
use medinfra_domain::id::ResourceId;
use medinfra_domain::resource::{ResourceState, ResourceType, UnitResource};

use super::{Created, DeactivateRequest, DeactivateResponse, parse_id, parse_opt, parse_opt_id};
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// Query of `GET /api/resources`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourcesQuery {
    pub unit_id: Option<String>,
    pub room_id: Option<String>,
    pub resource_type: Option<String>,
    pub state: Option<String>,
    pub include_inactive: bool,
}

/// Request body for creating a resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    pub unit_id: String,
    pub room_id: Option<String>,
    pub code: String,
    pub name: String,
    pub resource_type: String,
    pub state: Option<String>,
    pub reason: Option<String>,
    pub is_active: Option<bool>,
    pub is_schedulable: Option<bool>,
}

/// Request body of a state transition.
#[derive(Debug, Deserialize)]
pub struct SetStateRequest {
    pub state: String,
    pub reason: Option<String>,
}

/// `GET /api/resources`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Query(query): Query<ResourcesQuery>,
) -> Result<Json<Vec<UnitResource>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let filter = ResourceFilter {
        unit_id: parse_opt_id(query.unit_id.as_deref())?,
        room_id: parse_opt_id(query.room_id.as_deref())?,
        resource_type: parse_opt::<ResourceType>(query.resource_type.as_deref())?,
        state: parse_opt::<ResourceState>(query.state.as_deref())?,
        include_inactive: query.include_inactive,
    };
    let resources = state.registry.list_resources(&scope, &filter).await?;
    Ok(Json(resources))
}

/// `POST /api/resources`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateResourceRequest>,
) -> Result<Created<UnitResource>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let input = NewResource {
        unit_id: parse_id(&req.unit_id)?,
        room_id: parse_opt_id(req.room_id.as_deref())?,
        code: req.code,
        name: req.name,
        resource_type: req.resource_type.parse()?,
        state: parse_opt(req.state.as_deref())?,
        reason: req.reason,
        is_active: req.is_active,
        is_schedulable: req.is_schedulable,
    };
    let resource = state.registry.create_resource(&scope, input).await?;
    Ok(Created(resource))
}

/// `GET /api/resources/{id}`
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<UnitResource>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: ResourceId = parse_id(&id)?;
    let resource = state.registry.get_resource(&scope, id).await?;
    Ok(Json(resource))
}

/// `POST /api/resources/{id}/state`
pub async fn set_state<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(req): Json<SetStateRequest>,
) -> Result<Json<UnitResource>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: ResourceId = parse_id(&id)?;
    let next: ResourceState = req.state.parse()?;
    let resource = state
        .resources
        .set_state(&scope, id, next, req.reason.as_deref())
        .await?;
    Ok(Json(resource))
}

/// `POST /api/resources/{id}/deactivate`
pub async fn deactivate<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(request): Json<DeactivateRequest>,
) -> Result<DeactivateResponse<UnitResource>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: ResourceId = parse_id(&id)?;
    let outcome = state.resources.deactivate(&scope, id, request.into()).await?;
    Ok(outcome.into())
}

/// `POST /api/resources/{id}/reactivate`
pub async fn reactivate<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<UnitResource>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: ResourceId = parse_id(&id)?;
    let resource = state.resources.reactivate(&scope, id).await?;
    Ok(Json(resource))
}
