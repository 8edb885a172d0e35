//! # medinfra-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `LocationRepository`: nodes, revisions and "as of" reads
//!   - `DepartmentRepository`, `UnitTypeRepository`, `UnitRepository`,
//!     `RoomRepository`, `ResourceRepository`: the registry
//!   - `BookingRepository`: conflict-checked booking writes
//!   - `PolicyRepository`: per-branch policy
//!   - `AuditSink`: one record per successful mutation
//! - Define **driving/inbound ports** as use-case structs:
//!   - `LocationService`: create, revise, reconstruct, list, get
//!   - `RegistryService`: departments, unit types, units, rooms, resources
//!   - `ResourceService`: state transitions, deactivation, reactivation
//!   - `SchedulingService`: book, cancel, list, get
//!   - `PolicyService`: read and replace branch policy
//! - Provide **in-process infrastructure** (audit bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `medinfra-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod audit_bus;
pub mod ports;
pub mod services;
