//! Storage-specific error type wrapping sqlx errors.

use medinfra_domain::error::{ConflictError, InfraError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<StorageError> for InfraError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Whether `err` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

/// Map a failed insert/update: unique violations become
/// [`ConflictError::Duplicate`], anything else a storage error.
pub(crate) fn on_write(
    err: sqlx::Error,
    entity: &'static str,
    field: &'static str,
    value: &str,
) -> InfraError {
    if is_unique_violation(&err) {
        return ConflictError::Duplicate {
            entity,
            field,
            value: value.to_string(),
        }
        .into();
    }
    StorageError::from(err).into()
}
