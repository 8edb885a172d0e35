//! JSON REST handlers for the unit type catalog.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use medinfra_app::ports::{AuditSink, Store};
use medinfra_app::services::registry_service::NewUnitType;
use medinfra_domain::unit_type::UnitTypeCatalog;

use super::Created;
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// Request body for adding a unit type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnitTypeRequest {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub uses_rooms: bool,
    #[serde(default)]
    pub schedulable: bool,
    #[serde(default)]
    pub bed_based: bool,
}

/// `GET /api/unit-types`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(_scope): CallerScope,
) -> Result<Json<Vec<UnitTypeCatalog>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let unit_types = state.registry.list_unit_types().await?;
    Ok(Json(unit_types))
}

/// `POST /api/unit-types`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateUnitTypeRequest>,
) -> Result<Created<UnitTypeCatalog>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let input = NewUnitType {
        code: req.code,
        name: req.name,
        uses_rooms: req.uses_rooms,
        schedulable: req.schedulable,
        bed_based: req.bed_based,
    };
    let unit_type = state.registry.create_unit_type(&scope, input).await?;
    Ok(Created(unit_type))
}
