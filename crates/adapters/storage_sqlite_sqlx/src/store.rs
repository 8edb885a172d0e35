//! The `SQLite` store: one pool handle implementing every repository port.

use sqlx::SqlitePool;

/// `SQLite`-backed implementation of every storage port.
///
/// Operations guarding a multi-row invariant run inside one transaction;
/// `SQLite` serialises writers, so a transaction that writes first holds
/// the database write lock until it commits.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
