//! Storage layer for link types
//!
//! This crate implements the store contract the repository runs against:
//! - Store / Transaction / Tables: the narrow store interface
//! - MemoryStore: in-memory rows with optimistic concurrency control
//! - SqliteStore: relational storage on SQLite
//! - FaultPlan: one-shot failure injection for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fault;
pub mod memory;
pub mod sqlite;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fault::{FaultPlan, FaultPoint};
pub use memory::{MemoryStore, MemoryTransaction};
pub use sqlite::{SqliteOptions, SqliteStore, SqliteTransaction, DEFAULT_BUSY_TIMEOUT};
pub use traits::{Store, Tables, Transaction};
