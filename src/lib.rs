//! linkstore - transactional persistence for work item link types
//!
//! A link type defines how two work item types may be related: the labels of
//! both traversal directions, the topology, and the category it belongs to.
//! This crate persists link types with referential integrity against their
//! category and optimistic versioning on every update.
//!
//! # Quick Start
//!
//! ```ignore
//! use linkstore::{run_in_transaction, LinkTypeRepository, LinkTypeUpdate, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let created = run_in_transaction(&store, |tx| {
//!     LinkTypeRepository::new(tx).create(input)
//! })?;
//!
//! let saved = run_in_transaction(&store, |tx| {
//!     LinkTypeRepository::new(tx)
//!         .save(&LinkTypeUpdate::new(created.id, created.version).forward_name("depends on"))
//! })?;
//! assert_eq!(saved.version, created.version + 1);
//! ```
//!
//! # Architecture
//!
//! - `linkstore-core`: entities, identifiers, errors and the update view
//! - `linkstore-storage`: the store contract with memory and SQLite stores
//! - `linkstore-engine`: transaction manager, repository, instrumentation, config

pub use linkstore_core::{
    ConversionError, Error, ErrorKind, LinkCategory, LinkCategoryId, LinkType, LinkTypeChanges,
    LinkTypeId, LinkTypeList, LinkTypeUpdate, NewLinkType, Page, Result, Timestamp, Topology,
    Version, INITIAL_VERSION,
};
pub use linkstore_engine::{
    run_in_transaction, ConfigError, Instrumentation, LinkStoreConfig, LinkTypeRepository,
    ListingConfig, NoopInstrumentation, Operation, OperationCounters, Outcome,
    TracingInstrumentation, TransactionManager, CONFIG_FILE_NAME,
};
pub use linkstore_storage::{
    FaultPoint, MemoryStore, SqliteOptions, SqliteStore, Store, StoreError, Tables, Transaction,
};
