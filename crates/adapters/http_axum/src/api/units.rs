//! JSON REST handlers for units and their rooms.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use medinfra_app::ports::{AuditSink, Store, UnitFilter};
use medinfra_app::services::registry_service::{NewRoom, NewUnit, UnitPatch};
use medinfra_domain::id::UnitId;
use medinfra_domain::unit::{Room, Unit};

use super::{Created, DeactivateRequest, DeactivateResponse, parse_id, parse_opt_id};
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// Query of `GET /api/units`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UnitsQuery {
    pub department_id: Option<String>,
    pub unit_type_id: Option<String>,
    pub location_node_id: Option<String>,
    pub include_inactive: bool,
}

/// Request body for creating a unit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitRequest {
    pub department_id: String,
    pub unit_type_id: String,
    pub location_node_id: String,
    pub code: String,
    pub name: String,
}

/// Request body for updating a unit. Code and department are immutable.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateUnitRequest {
    pub name: Option<String>,
    pub location_node_id: Option<String>,
    pub is_active: Option<bool>,
}

/// Request body for creating a room.
#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub code: String,
    pub name: String,
}

/// `GET /api/units`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Query(query): Query<UnitsQuery>,
) -> Result<Json<Vec<Unit>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let filter = UnitFilter {
        department_id: parse_opt_id(query.department_id.as_deref())?,
        unit_type_id: parse_opt_id(query.unit_type_id.as_deref())?,
        location_node_id: parse_opt_id(query.location_node_id.as_deref())?,
        include_inactive: query.include_inactive,
    };
    let units = state.registry.list_units(&scope, &filter).await?;
    Ok(Json(units))
}

/// `POST /api/units`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateUnitRequest>,
) -> Result<Created<Unit>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let input = NewUnit {
        department_id: parse_id(&req.department_id)?,
        unit_type_id: parse_id(&req.unit_type_id)?,
        location_node_id: parse_id(&req.location_node_id)?,
        code: req.code,
        name: req.name,
    };
    let unit = state.registry.create_unit(&scope, input).await?;
    Ok(Created(unit))
}

/// `GET /api/units/{id}`
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<Unit>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: UnitId = parse_id(&id)?;
    let unit = state.registry.get_unit(&scope, id).await?;
    Ok(Json(unit))
}

/// `PATCH /api/units/{id}`
pub async fn update<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(req): Json<UpdateUnitRequest>,
) -> Result<Json<Unit>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: UnitId = parse_id(&id)?;
    let patch = UnitPatch {
        name: req.name,
        location_node_id: parse_opt_id(req.location_node_id.as_deref())?,
        is_active: req.is_active,
    };
    let unit = state.registry.update_unit(&scope, id, patch).await?;
    Ok(Json(unit))
}

/// `POST /api/units/{id}/deactivate`
///
/// Responds with the updated unit, or `204 No Content` when `hard` removed it.
pub async fn deactivate<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(request): Json<DeactivateRequest>,
) -> Result<DeactivateResponse<Unit>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: UnitId = parse_id(&id)?;
    let outcome = state
        .registry
        .deactivate_unit(&scope, id, request.into())
        .await?;
    Ok(outcome.into())
}

/// `GET /api/units/{id}/rooms`
pub async fn list_rooms<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<Vec<Room>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: UnitId = parse_id(&id)?;
    let rooms = state.registry.list_rooms(&scope, id).await?;
    Ok(Json(rooms))
}

/// `POST /api/units/{id}/rooms`
pub async fn create_room<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(req): Json<CreateRoomRequest>,
) -> Result<Created<Room>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: UnitId = parse_id(&id)?;
    let input = NewRoom {
        code: req.code,
        name: req.name,
    };
    let room = state.registry.create_room(&scope, id, input).await?;
    Ok(Created(room))
}
