//! JSON REST handlers for departments.

use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;

use medinfra_app::ports::{AuditSink, Store};
use medinfra_app::services::registry_service::NewDepartment;
use medinfra_domain::department::Department;
use medinfra_domain::id::DepartmentId;

use super::{Created, parse_id};
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// One location link in a create request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationLink {
    pub location_node_id: String,
    #[serde(default)]
    pub is_primary: bool,
}

/// Request body for creating a department.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDepartmentRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub locations: Vec<LocationLink>,
}

/// `GET /api/departments`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
) -> Result<Json<Vec<Department>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let departments = state.registry.list_departments(&scope).await?;
    Ok(Json(departments))
}

/// `POST /api/departments`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateDepartmentRequest>,
) -> Result<Created<Department>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let locations = req
        .locations
        .iter()
        .map(|link| parse_id(&link.location_node_id).map(|id| (id, link.is_primary)))
        .collect::<Result<Vec<_>, _>>()?;
    let input = NewDepartment {
        code: req.code,
        name: req.name,
        locations,
    };
    let department = state.registry.create_department(&scope, input).await?;
    Ok(Created(department))
}

/// `GET /api/departments/{id}`
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<Department>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: DepartmentId = parse_id(&id)?;
    let department = state.registry.get_department(&scope, id).await?;
    Ok(Json(department))
}
