//! `SQLite` implementation of [`RoomRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::RoomRepository;
use medinfra_domain::error::InfraError;
use medinfra_domain::id::{RoomId, UnitId};
use medinfra_domain::unit::Room;

use crate::codec::{id, micros, timestamp};
use crate::error::{StorageError, on_write};
use crate::store::SqliteStore;

struct Wrapper(Room);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Room {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            unit_id: id(row, "unit_id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            is_active: row.try_get("is_active")?,
            created_at: timestamp(row, "created_at")?,
        }))
    }
}

impl RoomRepository for SqliteStore {
    async fn create_room(&self, room: Room) -> Result<Room, InfraError> {
        const SQL: &str = r"
            INSERT INTO unit_rooms (id, branch_id, unit_id, code, name, is_active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
        ";

        sqlx::query(SQL)
            .bind(room.id.to_string())
            .bind(room.branch_id.to_string())
            .bind(room.unit_id.to_string())
            .bind(&room.code)
            .bind(&room.name)
            .bind(room.is_active)
            .bind(micros(room.created_at))
            .execute(self.pool())
            .await
            .map_err(|err| on_write(err, "room", "code", &room.code))?;

        Ok(room)
    }

    async fn get_room(&self, id: RoomId) -> Result<Option<Room>, InfraError> {
        const SQL: &str = "SELECT * FROM unit_rooms WHERE id = ?";

        let row: Option<Wrapper> = sqlx::query_as(SQL)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn list_rooms(&self, unit_id: UnitId) -> Result<Vec<Room>, InfraError> {
        const SQL: &str = "SELECT * FROM unit_rooms WHERE unit_id = ? ORDER BY code ASC";

        let rows: Vec<Wrapper> = sqlx::query_as(SQL)
            .bind(unit_id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}
