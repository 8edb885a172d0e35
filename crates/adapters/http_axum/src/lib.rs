//! # medinfra-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a **JSON API** under `/api` for locations, departments, unit
//!   types, units, rooms, resources, bookings and branch policy
//! - Read the caller's branch and actor from the `x-branch-id` and
//!   `x-actor-id` headers; authentication happens upstream
//! - Map HTTP requests into application service calls (driving adapter)
//! - Map [`InfraError`](medinfra_domain::error::InfraError) kinds onto
//!   status codes (400, 404, 409, 500)
//!
//! ## Dependency rule
//! Depends on `medinfra-app` (for port traits and services) and `medinfra-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod scope;
pub mod state;
