//! `SQLite` implementation of [`LocationRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, Sqlite, Transaction};

use medinfra_app::ports::{LocationRepository, Supersede};
use medinfra_domain::error::{ConflictError, InfraError};
use medinfra_domain::id::{BranchId, LocationNodeId};
use medinfra_domain::location::{
    GeoPoint, LocationAttributes, LocationKind, LocationNode, LocationRevision, LocationView,
};
use medinfra_domain::time::{EffectivePeriod, Timestamp};

use crate::codec::{id, limit, micros, opt_id, opt_timestamp, parsed, timestamp};
use crate::error::StorageError;
use crate::store::SqliteStore;

/// Wrapper for converting database rows into domain types without polluting
/// domain structs with database concerns.
struct Revision(LocationRevision);

impl<'r> FromRow<'r, SqliteRow> for Revision {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let gps_lat: Option<f64> = row.try_get("gps_lat")?;
        let gps_lng: Option<f64> = row.try_get("gps_lng")?;
        let gps = gps_lat
            .zip(gps_lng)
            .map(|(lat, lng)| GeoPoint { lat, lng });

        Ok(Self(LocationRevision {
            id: id(row, "id")?,
            node_id: id(row, "node_id")?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
            is_active: row.try_get("is_active")?,
            period: EffectivePeriod {
                effective_from: timestamp(row, "effective_from")?,
                effective_to: opt_timestamp(row, "effective_to")?,
            },
            attributes: LocationAttributes {
                gps,
                floor_number: row.try_get("floor_number")?,
                wheelchair_access: row.try_get("wheelchair_access")?,
                stretcher_access: row.try_get("stretcher_access")?,
                emergency_exit: row.try_get("emergency_exit")?,
                fire_zone: row.try_get("fire_zone")?,
            },
            created_by: id(row, "created_by")?,
            created_at: timestamp(row, "created_at")?,
        }))
    }
}

struct Node(LocationNode);

impl<'r> FromRow<'r, SqliteRow> for Node {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(LocationNode {
            id: id(row, "id")?,
            branch_id: id(row, "branch_id")?,
            kind: parsed(row, "kind")?,
            parent_id: opt_id(row, "parent_id")?,
            created_at: timestamp(row, "created_at")?,
        }))
    }
}

/// A node joined with one revision; node columns are prefixed `n_`.
struct View(LocationView);

impl<'r> FromRow<'r, SqliteRow> for View {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let node = LocationNode {
            id: id(row, "n_id")?,
            branch_id: id(row, "n_branch_id")?,
            kind: parsed(row, "n_kind")?,
            parent_id: opt_id(row, "n_parent_id")?,
            created_at: timestamp(row, "n_created_at")?,
        };
        let Revision(revision) = Revision::from_row(row)?;
        Ok(Self(LocationView { node, revision }))
    }
}

const INSERT_NODE: &str = r"
    INSERT INTO location_nodes (id, branch_id, kind, parent_id, created_at)
    VALUES (?, ?, ?, ?, ?)
";

const INSERT_REVISION: &str = r"
    INSERT INTO location_revisions (
        id, node_id, branch_id, code, name, is_active, effective_from, effective_to,
        gps_lat, gps_lng, floor_number, wheelchair_access, stretcher_access,
        emergency_exit, fire_zone, created_by, created_at
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

const TOUCH_NODE: &str = "UPDATE location_nodes SET created_at = created_at WHERE id = ?";

const CLOSE_REVISION: &str = r"
    UPDATE location_revisions SET effective_to = ?
    WHERE id = ? AND node_id = ? AND (effective_to IS NULL OR effective_to > ?)
";

/// Another node of the branch holding `code` during an overlapping period.
const SELECT_CODE_HOLDER: &str = r"
    SELECT node_id FROM location_revisions
    WHERE branch_id = ? AND code = ? AND node_id != ?
      AND (? IS NULL OR effective_from < ?)
      AND (effective_to IS NULL OR effective_to > ?)
    LIMIT 1
";

const SELECT_OWN_OVERLAP: &str = r"
    SELECT COUNT(*) FROM location_revisions
    WHERE node_id = ?
      AND (? IS NULL OR effective_from < ?)
      AND (effective_to IS NULL OR effective_to > ?)
";

const SELECT_NODE: &str = "SELECT * FROM location_nodes WHERE id = ?";

const SELECT_REVISION_AT: &str = r"
    SELECT * FROM location_revisions
    WHERE node_id = ? AND effective_from <= ? AND (effective_to IS NULL OR effective_to > ?)
    ORDER BY effective_from DESC
    LIMIT 1
";

const SELECT_HISTORY: &str =
    "SELECT * FROM location_revisions WHERE node_id = ? ORDER BY effective_from ASC";

const SELECT_VIEWS_AT: &str = r"
    SELECT n.id AS n_id, n.branch_id AS n_branch_id, n.kind AS n_kind,
           n.parent_id AS n_parent_id, n.created_at AS n_created_at, r.*
    FROM location_nodes n
    JOIN location_revisions r ON r.node_id = n.id
    WHERE n.branch_id = ?
      AND r.effective_from <= ? AND (r.effective_to IS NULL OR r.effective_to > ?)
      AND (? IS NULL OR n.kind = ?)
    ORDER BY r.code ASC
    LIMIT ?
";

const SELECT_PARENTS: &str = "SELECT id, parent_id FROM location_nodes WHERE branch_id = ?";

async fn ensure_code_free(
    tx: &mut Transaction<'_, Sqlite>,
    branch_id: BranchId,
    node_id: LocationNodeId,
    revision: &LocationRevision,
) -> Result<(), InfraError> {
    let to = revision.period.effective_to.map(micros);
    let holder: Option<(String,)> = sqlx::query_as(SELECT_CODE_HOLDER)
        .bind(branch_id.to_string())
        .bind(&revision.code)
        .bind(node_id.to_string())
        .bind(to)
        .bind(to)
        .bind(micros(revision.period.effective_from))
        .fetch_optional(&mut **tx)
        .await
        .map_err(StorageError::from)?;
    match holder {
        Some((holder,)) => {
            let holder = holder
                .parse()
                .map_err(|err| StorageError::from(sqlx::Error::Decode(Box::new(err))))?;
            Err(ConflictError::DuplicateCode {
                code: revision.code.clone(),
                holder,
            }
            .into())
        }
        None => Ok(()),
    }
}

async fn insert_revision(
    tx: &mut Transaction<'_, Sqlite>,
    branch_id: BranchId,
    revision: &LocationRevision,
) -> Result<(), InfraError> {
    let attributes = &revision.attributes;
    sqlx::query(INSERT_REVISION)
        .bind(revision.id.to_string())
        .bind(revision.node_id.to_string())
        .bind(branch_id.to_string())
        .bind(&revision.code)
        .bind(&revision.name)
        .bind(revision.is_active)
        .bind(micros(revision.period.effective_from))
        .bind(revision.period.effective_to.map(micros))
        .bind(attributes.gps.map(|gps| gps.lat))
        .bind(attributes.gps.map(|gps| gps.lng))
        .bind(attributes.floor_number)
        .bind(attributes.wheelchair_access)
        .bind(attributes.stretcher_access)
        .bind(attributes.emergency_exit)
        .bind(&attributes.fire_zone)
        .bind(revision.created_by.to_string())
        .bind(micros(revision.created_at))
        .execute(&mut **tx)
        .await
        .map_err(StorageError::from)?;
    Ok(())
}

impl LocationRepository for SqliteStore {
    async fn create_location(
        &self,
        node: LocationNode,
        revision: LocationRevision,
    ) -> Result<LocationView, InfraError> {
        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        sqlx::query(INSERT_NODE)
            .bind(node.id.to_string())
            .bind(node.branch_id.to_string())
            .bind(node.kind.as_str())
            .bind(node.parent_id.map(|id| id.to_string()))
            .bind(micros(node.created_at))
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        ensure_code_free(&mut tx, node.branch_id, node.id, &revision).await?;
        insert_revision(&mut tx, node.branch_id, &revision).await?;
        tx.commit().await.map_err(StorageError::from)?;

        Ok(LocationView { node, revision })
    }

    async fn revise_location(
        &self,
        node: &LocationNode,
        supersede: Option<Supersede>,
        revision: LocationRevision,
    ) -> Result<LocationRevision, InfraError> {
        let mut tx = self.pool().begin().await.map_err(StorageError::from)?;
        sqlx::query(TOUCH_NODE)
            .bind(node.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if let Some(supersede) = supersede {
            let closed_to = micros(supersede.effective_to);
            sqlx::query(CLOSE_REVISION)
                .bind(closed_to)
                .bind(supersede.revision_id.to_string())
                .bind(node.id.to_string())
                .bind(closed_to)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::from)?;
        }
        ensure_code_free(&mut tx, node.branch_id, node.id, &revision).await?;

        let to = revision.period.effective_to.map(micros);
        let (overlapping,): (i64,) = sqlx::query_as(SELECT_OWN_OVERLAP)
            .bind(node.id.to_string())
            .bind(to)
            .bind(to)
            .bind(micros(revision.period.effective_from))
            .fetch_one(&mut *tx)
            .await
            .map_err(StorageError::from)?;
        if overlapping > 0 {
            return Err(ConflictError::RevisionOverlap(node.id).into());
        }

        insert_revision(&mut tx, node.branch_id, &revision).await?;
        tx.commit().await.map_err(StorageError::from)?;
        Ok(revision)
    }

    async fn get_location_node(&self, id: LocationNodeId) -> Result<Option<LocationNode>, InfraError> {
        let row: Option<Node> = sqlx::query_as(SELECT_NODE)
            .bind(id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|n| n.0))
    }

    async fn location_revision_at(
        &self,
        id: LocationNodeId,
        at: Timestamp,
    ) -> Result<Option<LocationRevision>, InfraError> {
        let row: Option<Revision> = sqlx::query_as(SELECT_REVISION_AT)
            .bind(id.to_string())
            .bind(micros(at))
            .bind(micros(at))
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|r| r.0))
    }

    async fn location_history(&self, id: LocationNodeId) -> Result<Vec<LocationRevision>, InfraError> {
        let rows: Vec<Revision> = sqlx::query_as(SELECT_HISTORY)
            .bind(id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|r| r.0).collect())
    }

    async fn locations_at(
        &self,
        branch_id: BranchId,
        at: Timestamp,
        kind: Option<LocationKind>,
        max_rows: usize,
    ) -> Result<Vec<LocationView>, InfraError> {
        let kind = kind.map(LocationKind::as_str);
        let rows: Vec<View> = sqlx::query_as(SELECT_VIEWS_AT)
            .bind(branch_id.to_string())
            .bind(micros(at))
            .bind(micros(at))
            .bind(kind)
            .bind(kind)
            .bind(limit(max_rows))
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|v| v.0).collect())
    }

    async fn location_parents(
        &self,
        branch_id: BranchId,
    ) -> Result<Vec<(LocationNodeId, Option<LocationNodeId>)>, InfraError> {
        let rows: Vec<(String, Option<String>)> = sqlx::query_as(SELECT_PARENTS)
            .bind(branch_id.to_string())
            .fetch_all(self.pool())
            .await
            .map_err(StorageError::from)?;
        rows.into_iter()
            .map(|(id, parent)| -> Result<_, uuid::Error> {
                let id = id.parse::<LocationNodeId>()?;
                let parent = parent.map(|p| p.parse::<LocationNodeId>()).transpose()?;
                Ok((id, parent))
            })
            .collect::<Result<_, uuid::Error>>()
            .map_err(|err| StorageError::from(sqlx::Error::Decode(Box::new(err))).into())
    }
}
