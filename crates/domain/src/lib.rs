//! # medinfra-domain
//!
//! Pure domain model for hospital infrastructure.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps and
//!   effective-dated periods, canonical codes
//! - Define the **location hierarchy** (campus → building → floor → zone →
//!   area) with non-overlapping revisions and forest reconstruction
//! - Define **departments**, the **unit type catalog**, **units** and **rooms**
//! - Define **resources** and their state machine
//! - Define **bookings**, window overlap and the pre-check policy
//! - Define **branch policy** and **audit records**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod code;
pub mod error;
pub mod id;
pub mod scope;
pub mod time;

pub mod audit;
pub mod booking;
pub mod department;
pub mod location;
pub mod policy;
pub mod resource;
pub mod unit;
pub mod unit_type;
