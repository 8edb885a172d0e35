//! `SQLite` implementation of [`UnitTypeRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::UnitTypeRepository;
use medinfra_domain::error::InfraError;
use medinfra_domain::id::UnitTypeId;
use medinfra_domain::unit_type::UnitTypeCatalog;

use crate::codec::id;
use crate::error::{StorageError, on_write};
use crate::store::SqliteStore;

struct Wrapper(UnitTypeCatalog);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(UnitTypeCatalog {
            id: id(row, "id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            uses_rooms: row.try_get("uses_rooms")?,
            schedulable: row.try_get("schedulable")?,
            bed_based: row.try_get("bed_based")?,
            is_active: row.try_get("is_active")?,
        }))
    }
}

impl UnitTypeRepository for SqliteStore {
    async fn create_unit_type(&self, unit_type: UnitTypeCatalog) -> Result<UnitTypeCatalog, InfraError> {
        const SQL: &str = r"
            INSERT INTO unit_types (id, code, name, uses_rooms, schedulable, bed_based, is_active)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        ";

        sqlx::query(SQL)
            .bind(unit_type.id.to_string())
            .bind(&unit_type.code)
            .bind(&unit_type.name)
            .bind(unit_type.uses_rooms)
            .bind(unit_type.schedulable)
            .bind(unit_type.bed_based)
            .bind(unit_type.is_active)
            .execute(self.pool())
            .await
            .map_err(|err| on_write(err, "unit type", "code", &unit_type.code))?;

        Ok(unit_type)
    }

    async fn get_unit_type(&self, id: UnitTypeId) -> Result<Option<UnitTypeCatalog>, InfraError> {
        const SQL: &str = "SELECT * FROM unit_types WHERE id = ?";

        let row: Option<Wrapper> = sqlx::query_as(SQL)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn list_unit_types(&self) -> Result<Vec<UnitTypeCatalog>, InfraError> {
        const SQL: &str = "SELECT * FROM unit_types ORDER BY code ASC";

        let rows: Vec<Wrapper> = sqlx::query_as(SQL)
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
