//! # fermhub-domain
//!
//! Pure domain model for the fermhub fermentation-control system.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Chambers** (insulated enclosures and their persisted settings)
//! - Define **Device configuration** (which device plays which role)
//! - Define **Batches** (recipe-derived fermentation schedules)
//! - Define **Control settings** (strategy selection and hardware timing)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod batch;
pub mod chamber;
pub mod control;
pub mod device;
