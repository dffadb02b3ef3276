//! # storage-adapters
//!
//! Persistence implementations of the `domains` repository ports.
//! SQLite is the only backend, behind the `db-sqlite` feature.

#[cfg(feature = "db-sqlite")]
pub mod sqlite;
pub mod throttle;

#[cfg(feature = "db-sqlite")]
pub use sqlite::{SqliteStore, StorageError};
pub use throttle::InMemoryLoginThrottle;
