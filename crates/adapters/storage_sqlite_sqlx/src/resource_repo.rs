//! `SQLite` implementation of [`ResourceRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::{ResourceFilter, ResourceRepository};
use medinfra_domain::error::{ConflictError, InfraError, NotFoundError};
use medinfra_domain::id::{BranchId, ResourceId};
use medinfra_domain::resource::{ResourceState, ResourceType, UnitResource};

use crate::codec::{id, micros, opt_id, opt_timestamp, parsed, timestamp};
use crate::error::{StorageError, on_write};
use crate::store::SqliteStore;

pub(crate) struct Wrapper(pub(crate) UnitResource);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(UnitResource {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            unit_id: id(row, "unit_id")?,
            room_id: opt_id(row, "room_id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            resource_type: parsed(row, "resource_type")?,
            state: parsed(row, "state")?,
            reserved_reason: row.try_get("reserved_reason")?,
            blocked_reason: row.try_get("blocked_reason")?,
            is_active: row.try_get("is_active")?,
            is_schedulable: row.try_get("is_schedulable")?,
            deactivated_at: opt_timestamp(row, "deactivated_at")?,
            deactivated_by: opt_id(row, "deactivated_by")?,
            deactivation_reason: row.try_get("deactivation_reason")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        }))
    }
}

pub(crate) const SELECT_RESOURCE: &str = "SELECT * FROM unit_resources WHERE id = ?";

impl ResourceRepository for SqliteStore {
    async fn create_resource(&self, resource: UnitResource) -> Result<UnitResource, InfraError> {
        const SQL: &str = r"
            INSERT INTO unit_resources (
                id, branch_id, unit_id, room_id, code, name, resource_type, state,
                reserved_reason, blocked_reason, is_active, is_schedulable, deactivated_at,
                deactivated_by, deactivation_reason, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ";

        sqlx::query(SQL)
            .bind(resource.id.to_string())
            .bind(resource.branch_id.to_string())
            .bind(resource.unit_id.to_string())
            .bind(resource.room_id.map(|id| id.to_string()))
            .bind(&resource.code)
            .bind(&resource.name)
            .bind(resource.resource_type.as_str())
            .bind(resource.state.as_str())
            .bind(&resource.reserved_reason)
            .bind(&resource.blocked_reason)
            .bind(resource.is_active)
            .bind(resource.is_schedulable)
            .bind(resource.deactivated_at.map(micros))
            .bind(resource.deactivated_by.map(|id| id.to_string()))
            .bind(&resource.deactivation_reason)
            .bind(micros(resource.created_at))
            .bind(micros(resource.updated_at))
            .execute(self.pool())
            .await
            .map_err(|err| on_write(err, "resource", "code", &resource.code))?;

        Ok(resource)
    }

    async fn get_resource(&self, id: ResourceId) -> Result<Option<UnitResource>, InfraError> {
        let row: Option<Wrapper> = sqlx::query_as(SELECT_RESOURCE)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn list_resources(
        &self,
        branch_id: BranchId,
        filter: &ResourceFilter,
    ) -> Result<Vec<UnitResource>, InfraError> {
        const SQL: &str = r"
            SELECT * FROM unit_resources
            WHERE branch_id = ?
              AND (? IS NULL OR unit_id = ?)
              AND (? IS NULL OR room_id = ?)
              AND (? IS NULL OR resource_type = ?)
              AND (? IS NULL OR state = ?)
              AND (? OR is_active = 1)
            ORDER BY code ASC
        ";

        let unit = filter.unit_id.map(|id| id.to_string());
        let room = filter.room_id.map(|id| id.to_string());
        let resource_type = filter.resource_type.map(ResourceType::as_str);
        let state = filter.state.map(ResourceState::as_str);
        let rows: Vec<Wrapper> = sqlx::query_as(SQL)
            .bind(branch_id.to_string())
            .bind(&unit)
            .bind(&unit)
            .bind(&room)
            .bind(&room)
            .bind(resource_type)
            .bind(resource_type)
            .bind(state)
            .bind(state)
            .bind(filter.include_inactive)
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn save_resource_state(
        &self,
        resource: UnitResource,
        expected: ResourceState,
    ) -> Result<UnitResource, InfraError> {
        const SQL: &str = r"
            UPDATE unit_resources
            SET state = ?, reserved_reason = ?, blocked_reason = ?, is_active = ?,
                deactivated_at = ?, deactivated_by = ?, deactivation_reason = ?, updated_at = ?
            WHERE id = ? AND state = ?
        ";
        const EXISTS: &str = "SELECT COUNT(*) FROM unit_resources WHERE id = ?";

        let result = sqlx::query(SQL)
            .bind(resource.state.as_str())
            .bind(&resource.reserved_reason)
            .bind(&resource.blocked_reason)
            .bind(resource.is_active)
            .bind(resource.deactivated_at.map(micros))
            .bind(resource.deactivated_by.map(|id| id.to_string()))
            .bind(&resource.deactivation_reason)
            .bind(micros(resource.updated_at))
            .bind(resource.id.to_string())
            .bind(expected.as_str())
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;
        if result.rows_affected() == 1 {
            return Ok(resource);
        }

        let (exists,): (i64,) = sqlx::query_as(EXISTS)
            .bind(resource.id.to_string())
            .fetch_one(self.pool())
            .await
            .map_err(StorageError::from)?;
        if exists == 0 {
            return Err(NotFoundError::new("UnitResource", resource.id).into());
        }
        tracing::warn!(resource_id = %resource.id, %expected, "resource state changed concurrently");
        Err(ConflictError::StaleState(expected).into())
    }

    async fn delete_resource_if_unbooked(&self, id: ResourceId) -> Result<(), InfraError> {
        const TOUCH: &str = "UPDATE unit_resources SET updated_at = updated_at WHERE id = ?";
        const BOOKINGS: &str = "SELECT COUNT(*) FROM procedure_bookings WHERE resource_id = ?";
        const DELETE: &str = "DELETE FROM unit_resources WHERE id = ?";

        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        let touched = sqlx::query(TOUCH)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if touched.rows_affected() == 0 {
            return Err(NotFoundError::new("UnitResource", id).into());
        }
        let (bookings,): (i64,) = sqlx::query_as(BOOKINGS)
            .bind(id.to_string())
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if bookings > 0 {
            return Err(ConflictError::HasDependants {
                entity: "resource",
                dependants: "bookings",
            }
            .into());
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
    use medinfra_domain::policy::BranchPolicy;
    use medinfra_domain::time::now;

    use super::*;
    use crate::store::testing::{memory_store, seed_resource, seed_unit};

    #[tokio::test]
    async fn should_round_trip_every_resource_column() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "ICU1", false).await;
        let bed = UnitResource::builder()
            .branch_id(unit.branch_id)
            .unit_id(unit.id)
            .code("B1")
            .name("Bed 1")
            .resource_type(ResourceType::IcuBed)
            .state(ResourceState::Blocked)
            .reason("oxygen line repair")
            .build()
            .unwrap();

        store.create_resource(bed.clone()).await.unwrap();

        assert_eq!(store.get_resource(bed.id).await.unwrap(), Some(bed));
    }

    #[tokio::test]
    async fn should_filter_resources_by_type_state_and_activity() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        seed_resource(&store, &unit, None, "T2").await;
        let t1 = seed_resource(&store, &unit, None, "T1").await;
        let blocked = t1
            .transition(ResourceState::Blocked, Some("lamp"), &BranchPolicy::default(), now())
            .unwrap();
        store
            .save_resource_state(blocked, ResourceState::Available)
            .await
            .unwrap();

        let all = store
            .list_resources(unit.branch_id, &ResourceFilter::default())
            .await
            .unwrap();
        let available = ResourceFilter {
            state: Some(ResourceState::Available),
            resource_type: Some(ResourceType::OtTable),
            ..ResourceFilter::default()
        };
        let available = store.list_resources(unit.branch_id, &available).await.unwrap();

        let codes: Vec<_> = all.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["T1", "T2"]);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].code, "T2");
    }

    #[tokio::test]
    async fn should_detect_stale_state_on_save() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;
        let policy = BranchPolicy::default();
        let reserved = table
            .transition(ResourceState::Reserved, Some("case 1"), &policy, now())
            .unwrap();
        let maintenance = table
            .transition(ResourceState::Maintenance, None, &policy, now())
            .unwrap();

        store
            .save_resource_state(reserved, ResourceState::Available)
            .await
            .unwrap();
        let stale = store
            .save_resource_state(maintenance, ResourceState::Available)
            .await;

        assert!(matches!(
            stale,
            Err(InfraError::Conflict(ConflictError::StaleState(ResourceState::Available)))
        ));
        let stored = store.get_resource(table.id).await.unwrap().unwrap();
        assert_eq!(stored.state, ResourceState::Reserved);
        assert_eq!(stored.reserved_reason.as_deref(), Some("case 1"));
    }

    #[tokio::test]
    async fn should_delete_unbooked_resource() {
        let store = memory_store().await;
        let unit = seed_unit(&store, "OT1", true).await;
        let table = seed_resource(&store, &unit, None, "T1").await;

        store.delete_resource_if_unbooked(table.id).await.unwrap();

        assert!(store.get_resource(table.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_resource_if_unbooked(table.id).await,
            Err(InfraError::NotFound(_))
        ));
    }
}
