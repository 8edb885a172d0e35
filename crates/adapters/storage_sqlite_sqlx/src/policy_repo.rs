//! `SQLite` implementation of [`PolicyRepository`].

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use medinfra_app::ports::PolicyRepository;
use medinfra_domain::error::InfraError;
use medinfra_domain::id::BranchId;
use medinfra_domain::policy::{BranchPolicy, PrecheckPolicy};
use medinfra_domain::time::now;

use crate::codec::{micros, parsed};
use crate::error::StorageError;
use crate::store::SqliteStore;

struct Wrapper(BranchPolicy);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(BranchPolicy {
            housekeeping_gate_enabled: row.try_get("housekeeping_gate_enabled")?,
            precheck: PrecheckPolicy {
                consent: parsed(row, "precheck_consent")?,
                anesthesia: parsed(row, "precheck_anesthesia")?,
                checklist: parsed(row, "precheck_checklist")?,
            },
        }))
    }
}

impl PolicyRepository for SqliteStore {
    async fn get_policy(&self, branch_id: BranchId) -> Result<Option<BranchPolicy>, InfraError> {
        const SQL: &str = "SELECT * FROM branch_policies WHERE branch_id = ?";

        let row: Option<Wrapper> = sqlx::query_as(SQL)
            .bind(branch_id.to_string())
            .fetch_optional(self.pool())
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn put_policy(&self, branch_id: BranchId, policy: BranchPolicy) -> Result<BranchPolicy, InfraError> {
        const SQL: &str = r"
            INSERT INTO branch_policies (
                branch_id, housekeeping_gate_enabled, precheck_consent, precheck_anesthesia,
                precheck_checklist, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(branch_id) DO UPDATE SET
                housekeeping_gate_enabled = excluded.housekeeping_gate_enabled,
                precheck_consent = excluded.precheck_consent,
                precheck_anesthesia = excluded.precheck_anesthesia,
                precheck_checklist = excluded.precheck_checklist,
                updated_at = excluded.updated_at
        ";

        sqlx::query(SQL)
            .bind(branch_id.to_string())
            .bind(policy.housekeeping_gate_enabled)
            .bind(policy.precheck.consent.as_str())
            .bind(policy.precheck.anesthesia.as_str())
            .bind(policy.precheck.checklist.as_str())
            .bind(micros(now()))
            .execute(self.pool())
            .await
            .map_err(StorageError::from)?;

        Ok(policy)
    }
}
