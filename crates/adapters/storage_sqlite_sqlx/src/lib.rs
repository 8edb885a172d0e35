//! # medinfra-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `medinfra-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//! - Hold the multi-row invariants (temporal code uniqueness, booking
//!   overlap, cascades) inside single transactions
//!
//! ## Dependency rule
//! Depends on `medinfra-app` (for port traits) and `medinfra-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;
pub mod error;
pub mod pool;
pub mod store;

mod booking_repo;
mod department_repo;
mod location_repo;
mod policy_repo;
mod resource_repo;
mod room_repo;
mod unit_repo;
mod unit_type_repo;

pub use pool::{Config, Database};
pub use store::SqliteStore;
