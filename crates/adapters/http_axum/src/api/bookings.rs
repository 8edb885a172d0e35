//! JSON REST handlers for procedure bookings.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};

use medinfra_app::ports::{AuditSink, BookingFilter, Store};
use medinfra_app::services::scheduling_service::{NewBooking, ScheduledBooking};
use medinfra_domain::booking::ProcedureBooking;
use medinfra_domain::id::BookingId;
use medinfra_domain::policy::{PrecheckFlags, PrecheckItem};

use super::{Created, parse_id, parse_opt_id, parse_opt_time, parse_time};
use crate::error::ApiError;
use crate::scope::CallerScope;
use crate::state::AppState;

/// Query of `GET /api/bookings`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingsQuery {
    pub unit_id: Option<String>,
    pub resource_id: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Request body for scheduling a booking.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub unit_id: String,
    pub resource_id: String,
    pub start_at: String,
    pub end_at: String,
    #[serde(default)]
    pub consent_ok: bool,
    #[serde(default)]
    pub anesthesia_ok: bool,
    #[serde(default)]
    pub checklist_ok: bool,
    pub patient_id: Option<String>,
    pub department_id: Option<String>,
}

/// Request body for cancelling a booking.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: String,
}

/// A stored booking plus the pre-checks that only warned.
#[derive(Debug, Serialize)]
pub struct BookingCreated {
    #[serde(flatten)]
    pub booking: ProcedureBooking,
    pub warnings: Vec<PrecheckItem>,
}

impl From<ScheduledBooking> for BookingCreated {
    fn from(scheduled: ScheduledBooking) -> Self {
        Self {
            booking: scheduled.booking,
            warnings: scheduled.warnings,
        }
    }
}

/// `GET /api/bookings`
pub async fn list<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<ProcedureBooking>>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let filter = BookingFilter {
        unit_id: parse_opt_id(query.unit_id.as_deref())?,
        resource_id: parse_opt_id(query.resource_id.as_deref())?,
        from: parse_opt_time(query.from.as_deref())?,
        to: parse_opt_time(query.to.as_deref())?,
    };
    let bookings = state.scheduling.list(&scope, &filter).await?;
    Ok(Json(bookings))
}

/// `POST /api/bookings`
pub async fn create<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Created<BookingCreated>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let input = NewBooking {
        unit_id: parse_id(&req.unit_id)?,
        resource_id: parse_id(&req.resource_id)?,
        start_at: parse_time(&req.start_at)?,
        end_at: parse_time(&req.end_at)?,
        flags: PrecheckFlags {
            consent_ok: req.consent_ok,
            anesthesia_ok: req.anesthesia_ok,
            checklist_ok: req.checklist_ok,
        },
        patient_id: req.patient_id,
        department_id: req.department_id,
    };
    let scheduled = state.scheduling.create(&scope, input).await?;
    Ok(Created(scheduled.into()))
}

/// `GET /api/bookings/{id}`
pub async fn get<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
) -> Result<Json<ProcedureBooking>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: BookingId = parse_id(&id)?;
    let booking = state.scheduling.get(&scope, id).await?;
    Ok(Json(booking))
}

/// `POST /api/bookings/{id}/cancel`
pub async fn cancel<S, A>(
    State(state): State<AppState<S, A>>,
    CallerScope(scope): CallerScope,
    Path(id): Path<String>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<ProcedureBooking>, ApiError>
where
    S: Store,
    A: AuditSink + Send + Sync + 'static,
{
    let id: BookingId = parse_id(&id)?;
    let booking = state.scheduling.cancel(&scope, id, &req.reason).await?;
    Ok(Json(booking))
}
