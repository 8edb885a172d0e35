//! `SQLite` implementation of [`DepartmentRepository`].

use std::collections::HashMap;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::DepartmentRepository;
use medinfra_domain::department::{Department, DepartmentLocation};
use medinfra_domain::error::InfraError;
use medinfra_domain::id::{BranchId, DepartmentId};

use crate::codec::{id, micros, timestamp};
use crate::error::{StorageError, on_write};
use crate::store::SqliteStore;

/// Department row; locations are loaded separately.
struct DepartmentRow(Department);

impl<'r> FromRow<'r, SqliteRow> for DepartmentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Department {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            is_active: row.try_get("is_active")?,
            locations: Vec::new(),
            created_at: timestamp(row, "created_at")?,
        }))
    }
}

struct LocationRow(DepartmentId, DepartmentLocation);

impl<'r> FromRow<'r, SqliteRow> for LocationRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(
            id(row, "department_id")?,
            DepartmentLocation {
                location_node_id: id(row, "location_node_id")?,
                is_primary: row.try_get("is_primary")?,
            },
        ))
    }
}

const INSERT_DEPARTMENT: &str = r"
    INSERT INTO departments (id, branch_id, code, name, is_active, created_at)
    VALUES (?, ?, ?, ?, ?, ?)
";

const INSERT_LOCATION: &str = r"
    INSERT INTO department_locations (department_id, location_node_id, is_primary, position)
    VALUES (?, ?, ?, ?)
";

const SELECT_DEPARTMENT: &str = "SELECT * FROM departments WHERE id = ?";

const SELECT_DEPARTMENTS: &str = "SELECT * FROM departments WHERE branch_id = ? ORDER BY code ASC";

const SELECT_LOCATIONS: &str = r"
    SELECT department_id, location_node_id, is_primary FROM department_locations
    WHERE department_id = ?
    ORDER BY position ASC
";

const SELECT_BRANCH_LOCATIONS: &str = r"
    SELECT dl.department_id, dl.location_node_id, dl.is_primary
    FROM department_locations dl
    JOIN departments d ON d.id = dl.department_id
    WHERE d.branch_id = ?
    ORDER BY dl.department_id, dl.position ASC
";

impl DepartmentRepository for SqliteStore {
    async fn create_department(&self, department: Department) -> Result<Department, InfraError> {
        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        sqlx::query(INSERT_DEPARTMENT)
            .bind(department.id.to_string())
            .bind(department.branch_id.to_string())
            .bind(&department.code)
            .bind(&department.name)
            .bind(department.is_active)
            .bind(micros(department.created_at))
            .execute(&mut *tx)
            .await
            .map_err(|err| on_write(err, "department", "code", &department.code))?;

        for (position, location) in (0_i64..).zip(&department.locations) {
            sqlx::query(INSERT_LOCATION)
                .bind(department.id.to_string())
                .bind(location.location_node_id.to_string())
                .bind(location.is_primary)
                .bind(position)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        tx.commit().await.map_err(StorageError::from)?;

        tracing::debug!(department_id = %department.id, code = %department.code, "department stored");
        Ok(department)
    }

    async fn get_department(&self, id: DepartmentId) -> Result<Option<Department>, InfraError> {
        let row: Option<DepartmentRow> = sqlx::query_as(SELECT_DEPARTMENT)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        let Some(DepartmentRow(mut department)) = row else {
            return Ok(None);
        };

        let locations: Vec<LocationRow> = sqlx::query_as(SELECT_LOCATIONS)
            .bind(id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        department.locations = locations.into_iter().map(|row| row.1).collect();
        Ok(Some(department))
    }

    async fn list_departments(&self, branch_id: BranchId) -> Result<Vec<Department>, InfraError> {
        let rows: Vec<DepartmentRow> = sqlx::query_as(SELECT_DEPARTMENTS)
            .bind(branch_id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        let locations: Vec<LocationRow> = sqlx::query_as(SELECT_BRANCH_LOCATIONS)
            .bind(branch_id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;

        let mut by_department: HashMap<DepartmentId, Vec<DepartmentLocation>> = HashMap::new();
        for LocationRow(department_id, location) in locations {
            by_department.entry(department_id).or_default().push(location);
        }
        Ok(rows
            .into_iter()
            .map(|DepartmentRow(mut department)| {
                department.locations = by_department.remove(&department.id).unwrap_or_default();
                department
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use medinfra_app::ports::LocationRepository;
    use medinfra_domain::error::ConflictError;
    use medinfra_domain::id::LocationNodeId;
    use medinfra_domain::location::{LocationKind, LocationNode, LocationRevision};
    use medinfra_domain::time::now;

    use super::*;
    use crate::store::testing::memory_store;

    async fn campus(store: &SqliteStore, branch_id: BranchId, code: &str) -> LocationNodeId {
        let node = LocationNode::new(branch_id, LocationKind::Campus, None, now()).unwrap();
        let revision = LocationRevision::builder()
            .node_id(node.id)
            .code(code)
            .name(code)
            .build()
            .unwrap();
        store.create_location(node, revision).await.unwrap().node.id
    }

    #[tokio::test]
    async fn should_store_department_with_ordered_locations() {
        let store = memory_store().await;
        let branch = BranchId::new();
        let first = campus(&store, branch, "C01").await;
        let second = campus(&store, branch, "C02").await;
        let department = Department::builder()
            .branch_id(branch)
            .code("surg")
            .name("Surgery")
            .location(second, false)
            .location(first, true)
            .build()
            .unwrap();

        store.create_department(department.clone()).await.unwrap();
        let loaded = store.get_department(department.id).await.unwrap().unwrap();

        assert_eq!(loaded, department);
        assert_eq!(loaded.locations[0].location_node_id, second);
        assert!(loaded.locations[1].is_primary);
    }

    #[tokio::test]
    async fn should_reject_duplicate_code_within_branch_only() {
        let store = memory_store().await;
        let branch = BranchId::new();
        let other = BranchId::new();
        let here = campus(&store, branch, "C01").await;
        let there = campus(&store, other, "C01").await;
        let build = |branch_id, location| {
            Department::builder()
                .branch_id(branch_id)
                .code("SURG")
                .name("Surgery")
                .location(location, true)
                .build()
                .unwrap()
        };

        store.create_department(build(branch, here)).await.unwrap();
        let duplicate = store.create_department(build(branch, here)).await;
        let elsewhere = store.create_department(build(other, there)).await;

        assert!(matches!(
            duplicate,
            Err(InfraError::Conflict(ConflictError::Duplicate { field: "code", .. }))
        ));
        assert!(elsewhere.is_ok());
        assert_eq!(store.list_departments(branch).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_list_departments_with_their_locations() {
        let store = memory_store().await;
        let branch = BranchId::new();
        let location = campus(&store, branch, "C01").await;
        for code in ["MED", "CARD"] {
            let department = Department::builder()
                .branch_id(branch)
                .code(code)
                .name(code)
                .location(location, true)
                .build()
                .unwrap();
            store.create_department(department).await.unwrap();
        }

        let departments = store.list_departments(branch).await.unwrap();

        let codes: Vec<_> = departments.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, ["CARD", "MED"]);
        assert!(departments.iter().all(|d| d.locations.len() == 1));
        assert!(store.list_departments(BranchId::new()).await.unwrap().is_empty());
    }
}
