//! `SQLite` implementation of [`BookingRepository`].
//!
//! Creating a booking first writes to the resource row, which takes the
//! database write lock; the bookability and overlap checks that follow
//! cannot interleave with another booking of the same resource.

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::{BookingFilter, BookingRepository};
use medinfra_domain::booking::{BookingStatus, BookingWindow, ProcedureBooking, check_bookable};
use medinfra_domain::error::{ConflictError, InfraError, NotFoundError};
use medinfra_domain::id::{BookingId, BranchId};
use medinfra_domain::policy::PrecheckFlags;

use crate::codec::{id, micros, opt_id, opt_timestamp, parsed, timestamp};
use crate::error::StorageError;
use crate::resource_repo::{self, SELECT_RESOURCE};
use crate::store::SqliteStore;

struct Wrapper(ProcedureBooking);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(ProcedureBooking {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            unit_id: id(row, "unit_id")?,
            resource_id: id(row, "resource_id")?,
            patient_id: row.try_get("patient_id")?,
            department_id: row.try_get("department_id")?,
            window: BookingWindow {
                start_at: timestamp(row, "start_at")?,
                end_at: timestamp(row, "end_at")?,
            },
            status: parsed(row, "status")?,
            flags: PrecheckFlags {
                consent_ok: row.try_get("consent_ok")?,
                anesthesia_ok: row.try_get("anesthesia_ok")?,
                checklist_ok: row.try_get("checklist_ok")?,
            },
            created_by: id(row, "created_by")?,
            created_at: timestamp(row, "created_at")?,
            cancelled_at: opt_timestamp(row, "cancelled_at")?,
            cancelled_by: opt_id(row, "cancelled_by")?,
            cancel_reason: row.try_get("cancel_reason")?,
        }))
    }
}

const SELECT_BOOKING: &str = "SELECT * FROM procedure_bookings WHERE id = ?";

impl BookingRepository for SqliteStore {
    #[tracing::instrument(skip(self, booking), fields(booking_id = %booking.id, resource_id = %booking.resource_id))]
    async fn create_booking_if_free(&self, booking: ProcedureBooking) -> Result<ProcedureBooking, InfraError> {
        const LOCK_RESOURCE: &str = "UPDATE unit_resources SET updated_at = updated_at WHERE id = ?";
        const OVERLAPPING: &str = r"
            SELECT id FROM procedure_bookings
            WHERE resource_id = ? AND status = ? AND start_at < ? AND end_at > ?
            ORDER BY start_at ASC
            LIMIT 1
        ";
        const INSERT: &str = r"
            INSERT INTO procedure_bookings (
                id, branch_id, unit_id, resource_id, patient_id, department_id, start_at,
                end_at, status, consent_ok, anesthesia_ok, checklist_ok, created_by, created_at,
                cancelled_at, cancelled_by, cancel_reason
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ";

        let resource_id = booking.resource_id.to_string();
        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        let locked = sqlx::query(LOCK_RESOURCE)
            .bind(&resource_id)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if locked.rows_affected() == 0 {
            return Err(NotFoundError::new("UnitResource", booking.resource_id).into());
        }

        let resource: resource_repo::Wrapper = sqlx::query_as(SELECT_RESOURCE)
            .bind(&resource_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        check_bookable(&resource.0, booking.branch_id, booking.unit_id)?;

        let overlapping: Option<(String,)> = sqlx::query_as(OVERLAPPING)
            .bind(&resource_id)
            .bind(BookingStatus::Scheduled.as_str())
            .bind(micros(booking.window.end_at))
            .bind(micros(booking.window.start_at))
            .fetch_optional(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if let Some((existing,)) = overlapping {
            let existing: BookingId = existing
                .parse()
                .map_err(|err| StorageError::from(sqlx::Error::Decode(Box::new(err))))?;
            return Err(ConflictError::BookingOverlap(existing).into());
        }

        sqlx::query(INSERT)
            .bind(booking.id.to_string())
            .bind(booking.branch_id.to_string())
            .bind(booking.unit_id.to_string())
            .bind(&resource_id)
            .bind(&booking.patient_id)
            .bind(&booking.department_id)
            .bind(micros(booking.window.start_at))
            .bind(micros(booking.window.end_at))
            .bind(booking.status.as_str())
            .bind(booking.flags.consent_ok)
            .bind(booking.flags.anesthesia_ok)
            .bind(booking.flags.checklist_ok)
            .bind(booking.created_by.to_string())
            .bind(micros(booking.created_at))
            .bind(booking.cancelled_at.map(micros))
            .bind(booking.cancelled_by.map(|id| id.to_string()))
            .bind(&booking.cancel_reason)
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;

        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<ProcedureBooking>, InfraError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_BOOKING)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn list_bookings(
        &self,
        branch_id: BranchId,
        filter: &BookingFilter,
    ) -> Result<Vec<ProcedureBooking>, InfraError> {
        const SQL: &str = r"
            SELECT * FROM procedure_bookings
            WHERE branch_id = ?
              AND (? IS NULL OR unit_id = ?)
              AND (? IS NULL OR resource_id = ?)
              AND (? IS NULL OR start_at >= ?)
              AND (? IS NULL OR end_at <= ?)
            ORDER BY start_at ASC
        ";

        let unit = filter.unit_id.map(|id| id.to_string());
        let resource = filter.resource_id.map(|id| id.to_string());
        let from = filter.from.map(micros);
        let to = filter.to.map(micros);
        let rows: Vec<Wrapper> = sqlx::query_as(SQL)
            .bind(branch_id.to_string())
            .bind(&unit)
            .bind(&unit)
            .bind(&resource)
            .bind(&resource)
            .bind(from)
            .bind(from)
            .bind(to)
            .bind(to)
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn cancel_booking(&self, booking: ProcedureBooking) -> Result<ProcedureBooking, InfraError> {
        const SQL: &str = r"
            UPDATE procedure_bookings
            SET status = ?, cancelled_at = ?, cancelled_by = ?, cancel_reason = ?
            WHERE id = ? AND status = ?
        ";

        let result = sqlx::query(SQL)
            .bind(booking.status.as_str())
            .bind(booking.cancelled_at.map(micros))
            .bind(booking.cancelled_by.map(|id| id.to_string()))
            .bind(&booking.cancel_reason)
            .bind(booking.id.to_string())
            .bind(BookingStatus::Scheduled.as_str())
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 1 {
            return Ok(booking);
        }

        match self.get_booking(booking.id).await? {
            Some(stored) => Err(ConflictError::NotScheduled(stored.status).into()),
            None => Err(NotFoundError::new("ProcedureBooking", booking.id).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use medinfra_app::ports::ResourceRepository;
    use medinfra_domain::error::ValidationError;
    use medinfra_domain::id::{ActorId, ResourceId};
    use medinfra_domain::policy::BranchPolicy;
    use medinfra_domain::resource::{ResourceState, UnitResource};
    use medinfra_domain::time::{Timestamp, now};

    use super::*;
    use crate::store::testing::{file_store, memory_store, seed_resource, seed_unit};

    fn at(hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn booking(resource: &UnitResource, start: Timestamp, end: Timestamp) -> ProcedureBooking {
        ProcedureBooking {
            id: BookingId::new(),
            branch_id: resource.branch_id,
            unit_id: resource.unit_id,
            resource_id: resource.id,
            patient_id: Some("P-100".to_string()),
            department_id: None,
            window: BookingWindow::new(start, end).unwrap(),
            status: BookingStatus::Scheduled,
            flags: PrecheckFlags {
                consent_ok: true,
                anesthesia_ok: true,
                checklist_ok: true,
            },
            created_by: ActorId::new(),
            created_at: now(),
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        }
    }

    #[tokio::test]
    async fn should_reject_overlap_and_accept_touching_window() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let first = store
            .create_booking_if_free(booking(&table, at(9), at(11)))
            .await
            .unwrap();

        let overlap = store.create_booking_if_free(booking(&table, at(10), at(12))).await;
        let touching = store.create_booking_if_free(booking(&table, at(11), at(12))).await;

        match overlap {
            Err(InfraError::Conflict(ConflictError::BookingOverlap(id))) => assert_eq!(id, first.id),
            other => panic!("expected overlap, got {other:?}"),
        }
        assert!(touching.is_ok());
        assert_eq!(store.get_booking(first.id).await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn should_ignore_cancelled_bookings_when_checking_overlap() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let first = store
            .create_booking_if_free(booking(&table, at(9), at(11)))
            .await
            .unwrap();
        let cancelled = first.cancel("patient unfit", ActorId::new(), now()).unwrap();
        store.cancel_booking(cancelled).await.unwrap();

        let retry = store.create_booking_if_free(booking(&table, at(9), at(11))).await;

        assert!(retry.is_ok());
    }

    #[tokio::test]
    async fn should_recheck_resource_state_inside_transaction() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let blocked = table
            .transition(ResourceState::Blocked, Some("broken lamp"), &BranchPolicy::default(), now())
            .unwrap();
        store
            .save_resource_state(blocked, ResourceState::Available)
            .await
            .unwrap();

        let result = store.create_booking_if_free(booking(&table, at(9), at(10))).await;
        let mut ghost = booking(&table, at(9), at(10));
        ghost.resource_id = ResourceId::new();
        let missing = store.create_booking_if_free(ghost).await;

        assert!(matches!(
            result,
            Err(InfraError::Conflict(ConflictError::ResourceNotAvailable(ResourceState::Blocked)))
        ));
        assert!(matches!(missing, Err(InfraError::NotFound(_))));
    }

    #[tokio::test]
    async fn should_reject_unschedulable_resource() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let unschedulable = UnitResource {
            id: ResourceId::new(),
            code: "T2".to_string(),
            is_schedulable: false,
            ..table
        };
        let unschedulable = store.create_resource(unschedulable).await.unwrap();

        let result = store
            .create_booking_if_free(booking(&unschedulable, at(9), at(10)))
            .await;

        assert!(matches!(
            result,
            Err(InfraError::Validation(ValidationError::NotSchedulable))
        ));
    }

    #[tokio::test]
    async fn should_cancel_only_scheduled_bookings() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let created = store
            .create_booking_if_free(booking(&table, at(9), at(10)))
            .await
            .unwrap();
        let cancelled = created.cancel("no show", ActorId::new(), now()).unwrap();

        store.cancel_booking(cancelled.clone()).await.unwrap();
        let again = store.cancel_booking(cancelled.clone()).await;

        assert!(matches!(
            again,
            Err(InfraError::Conflict(ConflictError::NotScheduled(BookingStatus::Cancelled)))
        ));
        assert_eq!(store.get_booking(created.id).await.unwrap(), Some(cancelled));
    }

    #[tokio::test]
    async fn should_list_bookings_in_window_ordered_by_start() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        for (start, end) in [(14, 15), (9, 10), (11, 12)] {
            store
                .create_booking_if_free(booking(&table, at(start), at(end)))
                .await
                .unwrap();
        }

        let morning = BookingFilter {
            resource_id: Some(table.id),
            to: Some(at(12)),
            ..BookingFilter::default()
        };
        let listed = store.list_bookings(unit.branch_id, &morning).await.unwrap();
        let later = BookingFilter {
            from: Some(at(11) + Duration::minutes(1)),
            ..BookingFilter::default()
        };

        let starts: Vec<_> = listed.iter().map(|b| b.window.start_at).collect();
        assert_eq!(starts, [at(9), at(11)]);
        assert_eq!(store.list_bookings(unit.branch_id, &later).await.unwrap().len(), 1);
        assert!(store
            .list_bookings(BranchId::new(), &BookingFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn should_admit_one_of_many_concurrent_bookings_for_same_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = file_store(&dir).await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;

        let mut attempts = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let store = store.clone();
            let candidate = booking(&table, at(9), at(11));
            attempts.spawn(async move { store.create_booking_if_free(candidate).await });
        }
        let mut admitted = 0;
        let mut overlapping = 0;
        while let Some(outcome) = attempts.join_next().await {
            match outcome.unwrap() {
                Ok(_) => admitted += 1,
                Err(InfraError::Conflict(ConflictError::BookingOverlap(_))) => overlapping += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(admitted, 1);
        assert_eq!(overlapping, 7);
        let stored = store
            .list_bookings(table.branch_id, &BookingFilter::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }
}
