//! `SQLite` implementation of [`UnitRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::{UnitFilter, UnitRepository};
use medinfra_domain::error::{ConflictError, InfraError, NotFoundError};
use medinfra_domain::id::{ActorId, BranchId, UnitId};
use medinfra_domain::resource::ResourceState;
use medinfra_domain::time::Timestamp;
use medinfra_domain::unit::Unit;

use crate::codec::{id, micros, opt_timestamp, timestamp};
use crate::error::{StorageError, on_write};
use crate::store::SqliteStore;

struct Wrapper(Unit);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Unit {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            department_id: id(row, "department_id")?,
            unit_type_id: id(row, "unit_type_id")?,
            location_node_id: id(row, "location_node_id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            uses_rooms: row.try_get("uses_rooms")?,
            schedulable: row.try_get("schedulable")?,
            bed_based: row.try_get("bed_based")?,
            is_active: row.try_get("is_active")?,
            deactivation_reason: row.try_get("deactivation_reason")?,
            deactivated_at: opt_timestamp(row, "deactivated_at")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        }))
    }
}

const SELECT_UNIT: &str = "SELECT * FROM units WHERE id = ?";

const TOUCH_UNIT: &str = "UPDATE units SET updated_at = updated_at WHERE id = ?";

/// Units have two UNIQUE constraints; the message names the one that failed.
fn unit_conflict(err: sqlx::Error, unit: &Unit) -> InfraError {
    let on_name = err
        .as_database_error()
        .is_some_and(|db| db.message().contains("name_key"));
    if on_name {
        on_write(err, "unit", "name", &unit.name)
    } else {
        on_write(err, "unit", "code", &unit.code)
    }
}

fn has_dependants(dependants: &'static str) -> InfraError {
    ConflictError::HasDependants {
        entity: "unit",
        dependants,
    }
    .into()
}

impl UnitRepository for SqliteStore {
    async fn create_unit(&self, unit: Unit) -> Result<Unit, InfraError> {
        const SQL: &str = r"
            INSERT INTO units (
                id, branch_id, department_id, unit_type_id, location_node_id, code, name,
                name_key, uses_rooms, schedulable, bed_based, is_active, deactivation_reason,
                deactivated_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ";

        sqlx::query(SQL)
            .bind(unit.id.to_string())
            .bind(unit.branch_id.to_string())
            .bind(unit.department_id.to_string())
            .bind(unit.unit_type_id.to_string())
            .bind(unit.location_node_id.to_string())
            .bind(&unit.code)
            .bind(&unit.name)
            .bind(Unit::name_key(&unit.name))
            .bind(unit.uses_rooms)
            .bind(unit.schedulable)
            .bind(unit.bed_based)
            .bind(unit.is_active)
            .bind(&unit.deactivation_reason)
            .bind(unit.deactivated_at.map(micros))
            .bind(micros(unit.created_at))
            .bind(micros(unit.updated_at))
            .execute(self.pool())
            .await
            .map_err(|err| unit_conflict(err, &unit))?;

        Ok(unit)
    }

    async fn update_unit(&self, unit: Unit) -> Result<Unit, InfraError> {
        const SQL: &str = r"
            UPDATE units
            SET department_id = ?, location_node_id = ?, code = ?, name = ?, name_key = ?,
                is_active = ?, deactivation_reason = ?, deactivated_at = ?, updated_at = ?
            WHERE id = ?
        ";

        let result = sqlx::query(SQL)
            .bind(unit.department_id.to_string())
            .bind(unit.location_node_id.to_string())
            .bind(&unit.code)
            .bind(&unit.name)
            .bind(Unit::name_key(&unit.name))
            .bind(unit.is_active)
            .bind(&unit.deactivation_reason)
            .bind(unit.deactivated_at.map(micros))
            .bind(micros(unit.updated_at))
            .bind(unit.id.to_string())
            .execute(self.pool())
            .await
            .map_err(|err| unit_conflict(err, &unit))?;

        if result.rows_affected() == 0 {
            return Err(NotFoundError::new("Unit", unit.id).into());
        }
        Ok(unit)
    }

    async fn get_unit(&self, id: UnitId) -> Result<Option<Unit>, InfraError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_UNIT)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn list_units(&self, branch_id: BranchId, filter: &UnitFilter) -> Result<Vec<Unit>, InfraError> {
        const SQL: &str = r"
            SELECT * FROM units
            WHERE branch_id = ?
              AND (? IS NULL OR department_id = ?)
              AND (? IS NULL OR unit_type_id = ?)
              AND (? IS NULL OR location_node_id = ?)
              AND (? OR is_active = 1)
            ORDER BY code ASC
        ";

        let department = filter.department_id.map(|id| id.to_string());
        let unit_type = filter.unit_type_id.map(|id| id.to_string());
        let location = filter.location_node_id.map(|id| id.to_string());
        let rows: Vec<Wrapper> = sqlx::query_as(SQL)
            .bind(branch_id.to_string())
            .bind(&department)
            .bind(&department)
            .bind(&unit_type)
            .bind(&unit_type)
            .bind(&location)
            .bind(&location)
            .bind(filter.include_inactive)
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    #[tracing::instrument(skip(self, reason))]
    async fn deactivate_unit_cascade(
        &self,
        id: UnitId,
        reason: &str,
        actor: ActorId,
        at: Timestamp,
    ) -> Result<Unit, InfraError> {
        const UPCOMING_BOOKINGS: &str = r"
            SELECT COUNT(*) FROM procedure_bookings
            WHERE unit_id = ? AND status = 'SCHEDULED' AND end_at > ?
        ";
        const BUSY_RESOURCES: &str = r"
            SELECT COUNT(*) FROM unit_resources
            WHERE unit_id = ? AND is_active = 1 AND state IN (?, ?)
        ";
        const DEACTIVATE_UNIT: &str = r"
            UPDATE units
            SET is_active = 0, deactivation_reason = ?, deactivated_at = ?, updated_at = ?
            WHERE id = ?
        ";
        const DEACTIVATE_ROOMS: &str = "UPDATE unit_rooms SET is_active = 0 WHERE unit_id = ?";
        const DEACTIVATE_RESOURCES: &str = r"
            UPDATE unit_resources
            SET is_active = 0, state = ?, reserved_reason = NULL, blocked_reason = NULL,
                deactivated_at = ?, deactivated_by = ?, deactivation_reason = ?, updated_at = ?
            WHERE unit_id = ? AND is_active = 1
        ";

        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        let touched = sqlx::query(TOUCH_UNIT)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if touched.rows_affected() == 0 {
            return Err(NotFoundError::new("Unit", id).into());
        }

        let (upcoming,): (i64,) = sqlx::query_as(UPCOMING_BOOKINGS)
            .bind(id.to_string())
            .bind(micros(at))
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if upcoming > 0 {
            return Err(has_dependants("upcoming scheduled bookings"));
        }
        let (busy,): (i64,) = sqlx::query_as(BUSY_RESOURCES)
            .bind(id.to_string())
            .bind(ResourceState::Reserved.as_str())
            .bind(ResourceState::Occupied.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if busy > 0 {
            return Err(has_dependants("reserved or occupied resources"));
        }

        sqlx::query(DEACTIVATE_UNIT)
            .bind(reason)
            .bind(micros(at))
            .bind(micros(at))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        let rooms = sqlx::query(DEACTIVATE_ROOMS)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        let resources = sqlx::query(DEACTIVATE_RESOURCES)
            .bind(ResourceState::Inactive.as_str())
            .bind(micros(at))
            .bind(actor.to_string())
            .bind(reason)
            .bind(micros(at))
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        let unit: Wrapper = sqlx::query_as(SELECT_UNIT)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;

        tracing::debug!(
            rooms = rooms.rows_affected(),
            resources = resources.rows_affected(),
            "unit cascade applied"
        );
        Ok(unit.0)
    }

    async fn delete_unit_if_empty(&self, id: UnitId) -> Result<(), InfraError> {
        const OWNED: &str = r"
            SELECT (SELECT COUNT(*) FROM unit_rooms WHERE unit_id = ?)
                 + (SELECT COUNT(*) FROM unit_resources WHERE unit_id = ?)
        ";
        const DELETE: &str = "DELETE FROM units WHERE id = ?";

        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        let touched = sqlx::query(TOUCH_UNIT)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if touched.rows_affected() == 0 {
            return Err(NotFoundError::new("Unit", id).into());
        }
        let (owned,): (i64,) = sqlx::query_as(OWNED)
            .bind(id.to_string())
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if owned > 0 {
            return Err(has_dependants("rooms or resources"));
        }
        sqlx::query(DELETE)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use medinfra_app::ports::{BookingRepository, ResourceRepository, RoomRepository};
    use medinfra_domain::booking::{BookingStatus, BookingWindow, ProcedureBooking};
    use medinfra_domain::id::BookingId;
    use medinfra_domain::policy::PrecheckFlags;
    use medinfra_domain::time::now;
    use medinfra_domain::unit::Room;

    use super::*;
    use crate::store::testing::{memory_store, seed_resource, seed_unit};

    fn sibling(unit: &Unit, code: &str, name: &str) -> Unit {
        Unit {
            id: UnitId::new(),
            code: code.to_string(),
            name: name.to_string(),
            ..unit.clone()
        }
    }

    #[tokio::test]
    async fn should_reject_duplicate_code_and_case_insensitive_name() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "ICU1", false).await;

        let same_code = store.create_unit(sibling(&unit, "ICU1", "Other")).await;
        let same_name = store.create_unit(sibling(&unit, "ICU2", "icu1")).await;
        let distinct = store.create_unit(sibling(&unit, "ICU3", "Step-down")).await;

        assert!(matches!(
            same_code,
            Err(InfraError::Conflict(ConflictError::Duplicate { field: "code", .. }))
        ));
        assert!(matches!(
            same_name,
            Err(InfraError::Conflict(ConflictError::Duplicate { field: "name", .. }))
        ));
        assert!(distinct.is_ok());
    }

    #[tokio::test]
    async fn should_update_unit_and_filter_inactive_from_listing() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "ICU1", false).await;
        let renamed = Unit {
            name: "Medical ICU".to_string(),
            is_active: false,
            ..unit.clone()
        };

        store.update_unit(renamed.clone()).await.unwrap();

        assert_eq!(store.get_unit(unit.id).await.unwrap(), Some(renamed));
        assert!(store.list_units(unit.branch_id, &UnitFilter::default()).await.unwrap().is_empty());
        let all = UnitFilter {
            include_inactive: true,
            department_id: Some(unit.department_id),
            ..UnitFilter::default()
        };
        assert_eq!(store.list_units(unit.branch_id, &all).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_cascade_deactivation_to_rooms_and_resources() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let room = store
            .create_room(Room::new(&unit, "R1", "Theatre 1", now()).unwrap())
            .await
            .unwrap();
        let table = seed_resource(&store, &unit, Some(room.id), "T1").await;
        let actor = ActorId::new();

        let unit = store
            .deactivate_unit_cascade(unit.id, "renovation", actor, now())
            .await
            .unwrap();

        assert!(!unit.is_active);
        assert_eq!(unit.deactivation_reason.as_deref(), Some("renovation"));
        assert!(!store.get_room(room.id).await.unwrap().unwrap().is_active);
        let table = store.get_resource(table.id).await.unwrap().unwrap();
        assert_eq!(table.state, ResourceState::Inactive);
        assert_eq!(table.deactivated_by, Some(actor));
        assert_eq!(table.deactivation_reason.as_deref(), Some("renovation"));
    }

    #[tokio::test]
    async fn should_refuse_cascade_while_bookings_are_upcoming() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let room = store
            .create_room(Room::new(&unit, "R1", "Theatre 1", now()).unwrap())
            .await
            .unwrap();
        let table = seed_resource(&store, &unit, Some(room.id), "T1").await;
        let start = now() + Duration::hours(1);
        let booking = ProcedureBooking {
            id: BookingId::new(),
            branch_id: unit.branch_id,
            unit_id: unit.id,
            resource_id: table.id,
            patient_id: None,
            department_id: None,
            window: BookingWindow::new(start, start + Duration::hours(2)).unwrap(),
            status: BookingStatus::Scheduled,
            flags: PrecheckFlags::default(),
            created_by: ActorId::new(),
            created_at: now(),
            cancelled_at: None,
            cancelled_by: None,
            cancel_reason: None,
        };
        store.create_booking_if_free(booking).await.unwrap();

        let result = store
            .deactivate_unit_cascade(unit.id, "renovation", ActorId::new(), now())
            .await;

        assert!(matches!(
            result,
            Err(InfraError::Conflict(ConflictError::HasDependants { .. }))
        ));
        assert!(store.get_unit(unit.id).await.unwrap().unwrap().is_active);
        assert!(store.get_room(room.id).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn should_delete_only_empty_units() {
        let store = memory_store().await;
        let empty = seed_unit(&store, "ICU1", false).await;
        let owner = seed_unit(&store, "OT1", true).await;
        store
            .create_room(Room::new(&owner, "R1", "Theatre 1", now()).unwrap())
            .await
            .unwrap();

        store.delete_unit_if_empty(empty.id).await.unwrap();
        let refused = store.delete_unit_if_empty(owner.id).await;
        let missing = store.delete_unit_if_empty(empty.id).await;

        assert!(store.get_unit(empty.id).await.unwrap().is_none());
        assert!(matches!(
            refused,
            Err(InfraError::Conflict(ConflictError::HasDependants { .. }))
        ));
        assert!(matches!(missing, Err(InfraError::NotFound(_))));
    }
}
