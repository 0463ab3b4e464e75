//! Transactional execution of units of work
//!
//! ## Contract
//!
//! `run_in_transaction(store, |tx| { ... })`:
//! - Begins a transaction; if that fails the unit of work is never invoked
//! - Invokes the unit of work exactly once with the transactional handle
//! - Rolls back and returns the unit of work's own error if it fails
//! - Commits if it succeeds; a failed commit is returned as an error
//!
//! There is no retry and no logging here. Callers that receive a version
//! conflict reload and try again themselves.

use linkstore_storage::{Store, StoreError, Transaction};
use std::sync::Arc;

/// Execute a unit of work atomically against `store`
///
/// # Example
/// ```text
/// let link_type = run_in_transaction(&store, |tx| {
///     LinkTypeRepository::new(tx).create(input)
/// })?;
/// ```
pub fn run_in_transaction<'s, S, F, T, E>(store: &'s S, unit_of_work: F) -> Result<T, E>
where
    S: Store,
    F: FnOnce(&mut S::Tx<'s>) -> Result<T, E>,
    E: From<StoreError>,
{
    let mut tx = store.begin()?;
    match unit_of_work(&mut tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            // The unit of work's failure takes precedence over a failed rollback.
            let _ = tx.rollback();
            Err(e)
        }
    }
}

/// Shared handle to a store with the closure transaction API
///
/// Cloning is cheap; every clone runs against the same store.
#[derive(Debug)]
pub struct TransactionManager<S> {
    store: Arc<S>,
}

impl<S> Clone for TransactionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store> TransactionManager<S> {
    /// Wrap a store
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Wrap an already shared store
    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Execute a unit of work in a transaction
    ///
    /// Same contract as [`run_in_transaction`].
    pub fn transaction<'s, F, T, E>(&'s self, unit_of_work: F) -> Result<T, E>
    where
        F: FnOnce(&mut S::Tx<'s>) -> Result<T, E>,
        E: From<StoreError>,
    {
        run_in_transaction(self.store.as_ref(), unit_of_work)
    }
}
