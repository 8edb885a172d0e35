//! JSON REST handlers for the location hierarchy.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use medinfra_app::ports::{AuditSink, Store};
use medinfra_app::services::location_service::{LocationPatch, NewLocation};
use medinfra_domain::id::{BranchId, LocationNodeId};
use medinfra_domain::location::{
    AttributePatch, GeoPoint, LocationAttributes, LocationDetail, LocationKind, LocationRevision,
    LocationView, TreeNode, normalize_fire_zone,
};

use super::{Created, parse_id, parse_opt, parse_opt_id, parse_opt_time};
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// Query of `GET /api/locations/tree`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeQuery {
    /// Must match the caller's branch when given.
    pub branch_id: Option<String>,
    pub at: Option<String>,
}

/// Query of `GET /api/locations`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub at: Option<String>,
    pub kind: Option<String>,
}

/// Request body for creating a location.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLocationRequest {
    pub kind: String,
    pub parent_id: Option<String>,
    pub code: String,
    pub name: String,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub is_active: Option<bool>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub floor_number: Option<i32>,
    #[serde(default)]
    pub wheelchair_access: bool,
    #[serde(default)]
    pub stretcher_access: bool,
    #[serde(default)]
    pub emergency_exit: bool,
    pub fire_zone: Option<String>,
}

/// Request body for revising a location. Missing fields carry over.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviseLocationRequest {
    pub code: Option<String>,
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub effective_from: Option<String>,
    pub effective_to: Option<String>,
    pub gps_lat: Option<f64>,
    pub gps_lng: Option<f64>,
    pub floor_number: Option<i32>,
    pub wheelchair_access: Option<bool>,
    pub stretcher_access: Option<bool>,
    pub emergency_exit: Option<bool>,
    pub fire_zone: Option<String>,
}

/// `GET /api/locations/tree`
pub async fn tree<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Query(query): Query<TreeQuery>,
) -> Result<Json<Vec<TreeNode>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    if let Some(branch_id) = parse_opt_id::<BranchId>(query.branch_id.as_deref())? {
        scope.ensure_owns(branch_id, "Branch", branch_id)?;
    }
    let at = parse_opt_time(query.at.as_deref())?;
    let forest = state.locations.tree(&scope, at).await?;
    Ok(Json(forest))
}

/// `GET /api/locations`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<LocationView>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let at = parse_opt_time(query.at.as_deref())?;
    let kind = parse_opt::<LocationKind>(query.kind.as_deref())?;
    let views = state.locations.list(&scope, at, kind).await?;
    Ok(Json(views))
}

/// `POST /api/locations`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateLocationRequest>,
) -> Result<Created<LocationView>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let input = NewLocation {
        kind: req.kind.parse()?,
        parent_id: parse_opt_id(req.parent_id.as_deref())?,
        code: req.code,
        name: req.name,
        effective_from: parse_opt_time(req.effective_from.as_deref())?,
        effective_to: parse_opt_time(req.effective_to.as_deref())?,
        is_active: req.is_active,
        attributes: LocationAttributes {
            gps: GeoPoint::from_parts(req.gps_lat, req.gps_lng)?,
            floor_number: req.floor_number,
            wheelchair_access: req.wheelchair_access,
            stretcher_access: req.stretcher_access,
            emergency_exit: req.emergency_exit,
            fire_zone: req.fire_zone.as_deref().and_then(normalize_fire_zone),
        },
    };
    let created = state.locations.create(&scope, input).await?;
    Ok(Created(created))
}

/// `GET /api/locations/{id}`
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<LocationDetail>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: LocationNodeId = parse_id(&id)?;
    let detail = state.locations.get(&scope, id).await?;
    Ok(Json(detail))
}

/// `PATCH /api/locations/{id}`
pub async fn revise<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(req): Json<ReviseLocationRequest>,
) -> Result<Json<LocationRevision>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: LocationNodeId = parse_id(&id)?;
    let patch = LocationPatch {
        code: req.code,
        name: req.name,
        is_active: req.is_active,
        effective_from: parse_opt_time(req.effective_from.as_deref())?,
        effective_to: parse_opt_time(req.effective_to.as_deref())?,
        attributes: AttributePatch {
            gps: GeoPoint::from_parts(req.gps_lat, req.gps_lng)?,
            floor_number: req.floor_number,
            wheelchair_access: req.wheelchair_access,
            stretcher_access: req.stretcher_access,
            emergency_exit: req.emergency_exit,
            fire_zone: req.fire_zone,
        },
    };
    let revision = state.locations.revise(&scope, id, patch).await?;
    Ok(Json(revision))
}
