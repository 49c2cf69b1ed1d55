//! Persistent record store.

pub mod sqlite;

pub use sqlite::{SqliteStore, StoreStats};
