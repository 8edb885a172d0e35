//! JSON REST API handlers.
//!
//! Every handler reads the caller's [`CallerScope`](crate::scope::CallerScope)
//! from the request headers; bodies and queries use camelCase.

#[allow(clippy::missing_errors_doc)]
pub mod bookings;
#[allow(clippy::missing_errors_doc)]
pub mod departments;
#[allow(clippy::missing_errors_doc)]
pub mod locations;
#[allow(clippy::missing_errors_doc)]
pub mod policy;
#[allow(clippy::missing_errors_doc)]
pub mod resources;
#[allow(clippy::missing_errors_doc)]
pub mod unit_types;
#[allow(clippy::missing_errors_doc)]
pub mod units;

use std::str::FromStr;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use medinfra_app::ports::{AuditSink, Store};
use medinfra_app::services::registry_service::{Deactivation, DeactivationOutcome};
use medinfra_domain::error::ValidationError;
use medinfra_domain::time::Timestamp;

use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<S, A>() -> Router<AppState<S, A>>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    Router::new()
        // Locations
        .route(
            "/locations",
            get(locations::list::<S, A>).post(locations::create::<S, A>),
        )
        .route("/locations/tree", get(locations::tree::<S, A>))
        .route(
            "/locations/{id}",
            get(locations::get::<S, A>).patch(locations::revise::<S, A>),
        )
        // Departments
        .route(
            "/departments",
            get(departments::list::<S, A>).post(departments::create::<S, A>),
        )
        .route("/departments/{id}", get(departments::get::<S, A>))
        // Unit types
        .route(
            "/unit-types",
            get(unit_types::list::<S, A>).post(unit_types::create::<S, A>),
        )
        // Units
        .route("/units", get(units::list::<S, A>).post(units::create::<S, A>))
        .route(
            "/units/{id}",
            get(units::get::<S, A>).patch(units::update::<S, A>),
        )
        .route("/units/{id}/deactivate", post(units::deactivate::<S, A>))
        .route(
            "/units/{id}/rooms",
            get(units::list_rooms::<S, A>).post(units::create_room::<S, A>),
        )
        // Resources
        .route(
            "/resources",
            get(resources::list::<S, A>).post(resources::create::<S, A>),
        )
        .route("/resources/{id}", get(resources::get::<S, A>))
        .route("/resources/{id}/state", post(resources::set_state::<S, A>))
        .route(
            "/resources/{id}/deactivate",
            post(resources::deactivate::<S, A>),
        )
        .route(
            "/resources/{id}/reactivate",
            post(resources::reactivate::<S, A>),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list::<S, A>).post(bookings::create::<S, A>),
        )
        .route("/bookings/{id}", get(bookings::get::<S, A>))
        .route("/bookings/{id}/cancel", post(bookings::cancel::<S, A>))
        // Policy
        .route("/policy", get(policy::get::<S, A>).put(policy::put::<S, A>))
}

/// `201 Created` with the new record as JSON.
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// Body of the unit and resource deactivation endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeactivateRequest {
    pub hard: bool,
    pub reason: Option<String>,
}

impl From<DeactivateRequest> for Deactivation {
    fn from(req: DeactivateRequest) -> Self {
        Self {
            hard: req.hard,
            reason: req.reason,
        }
    }
}

/// Possible responses from a deactivation endpoint.
pub enum DeactivateResponse<T> {
    /// Soft deactivation: the updated record.
    Ok(Json<T>),
    /// Hard deactivation removed the record.
    NoContent,
}

impl<T> From<DeactivationOutcome<T>> for DeactivateResponse<T> {
    fn from(outcome: DeactivationOutcome<T>) -> Self {
        match outcome {
            DeactivationOutcome::Deactivated(record) => Self::Ok(Json(record)),
            DeactivationOutcome::Deleted => Self::NoContent,
        }
    }
}

impl<T: Serialize> IntoResponse for DeactivateResponse<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// Parse an id from a path segment, query or body field.
pub(crate) fn parse_id<T: FromStr>(raw: &str) -> Result<T, ValidationError> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationError::InvalidId(raw.to_string()))
}

pub(crate) fn parse_opt_id<T: FromStr>(raw: Option<&str>) -> Result<Option<T>, ValidationError> {
    raw.map(parse_id).transpose()
}

/// Parse an RFC 3339 instant, keeping microsecond precision.
pub(crate) fn parse_time(raw: &str) -> Result<Timestamp, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|at| at.with_timezone(&Utc).trunc_subsecs(6))
        .map_err(|_| ValidationError::InvalidTimestamp(raw.to_string()))
}

pub(crate) fn parse_opt_time(raw: Option<&str>) -> Result<Option<Timestamp>, ValidationError> {
    raw.map(parse_time).transpose()
}

/// Parse an enum wire name such as `OT_TABLE` or `BUILDING`.
pub(crate) fn parse_opt<T>(raw: Option<&str>) -> Result<Option<T>, ValidationError>
where
    T: FromStr<Err = ValidationError>,
{
    raw.map(str::parse).transpose()
}
