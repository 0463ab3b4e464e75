//! Transaction manager and link type repository
//!
//! This crate composes the store contract into the operations callers use:
//! - run_in_transaction / TransactionManager: all-or-nothing units of work
//! - LinkTypeRepository: create, load, list, delete and save over a handle
//! - Instrumentation: injected observer around repository operations
//! - LinkStoreConfig: `linkstore.toml` settings

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod instrumentation;
pub mod repository;
pub mod transaction;

pub use config::{ConfigError, LinkStoreConfig, ListingConfig, SqliteConfig, CONFIG_FILE_NAME};
pub use instrumentation::{
    Instrumentation, NoopInstrumentation, Operation, OperationCounters, Outcome,
    TracingInstrumentation,
};
pub use repository::LinkTypeRepository;
pub use transaction::{run_in_transaction, TransactionManager};
