//! # fermhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `ChamberRepository` port defined in `fermhub-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `fermhub-app` (for port traits) and `fermhub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod chamber_repo;
pub mod error;
pub mod pool;

pub use chamber_repo::SqliteChamberRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
