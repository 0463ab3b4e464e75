//! Instrumentation around repository operations
//!
//! The repository never logs from its control flow. Every public operation
//! is bracketed by calls into an injected [`Instrumentation`] collaborator,
//! which decides what, if anything, to record.
//!
//! # Usage
//!
//! ```text
//! let counters = Arc::new(OperationCounters::new());
//! let mut repo = LinkTypeRepository::new(tx).with_instrumentation(counters.clone());
//! repo.load(id)?;
//! assert_eq!(counters.succeeded(), 1);
//! ```

use linkstore_core::{ErrorKind, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Repository operation being observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create a link type
    Create,
    /// Load by id (string or typed)
    Load,
    /// Load by name within a category
    LoadByName,
    /// List all link types or one page
    List,
    /// Delete by id
    Delete,
    /// Conditional update
    Save,
}

impl Operation {
    /// Name used in log fields
    pub const fn name(&self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Load => "load",
            Operation::LoadByName => "load_by_name",
            Operation::List => "list",
            Operation::Delete => "delete",
            Operation::Save => "save",
        }
    }
}

/// How an observed operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Operation returned Ok
    Success,
    /// Operation failed with the given kind
    Failure(ErrorKind),
}

impl Outcome {
    /// Classify a repository result
    pub fn of<R>(result: &Result<R>) -> Self {
        match result {
            Ok(_) => Outcome::Success,
            Err(e) => Outcome::Failure(e.kind()),
        }
    }
}

/// Collaborator invoked around every repository operation
pub trait Instrumentation: Send + Sync {
    /// Called before the operation touches storage
    fn operation_started(&self, _operation: Operation) {}

    /// Called with the classified outcome once the operation returns
    fn operation_finished(&self, operation: Operation, outcome: Outcome, elapsed: Duration);
}

/// Records nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInstrumentation;

impl Instrumentation for NoopInstrumentation {
    fn operation_finished(&self, _operation: Operation, _outcome: Outcome, _elapsed: Duration) {}
}

/// Emits `tracing` events under target `linkstore::repo`
///
/// Internal failures are logged at `warn`; everything else, including
/// expected rejections such as not-found or version conflicts, at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingInstrumentation;

impl Instrumentation for TracingInstrumentation {
    fn operation_finished(&self, operation: Operation, outcome: Outcome, elapsed: Duration) {
        let elapsed_us = elapsed.as_micros() as u64;
        match outcome {
            Outcome::Success => debug!(
                target: "linkstore::repo",
                operation = operation.name(),
                elapsed_us,
                "Operation succeeded"
            ),
            Outcome::Failure(ErrorKind::Internal) => warn!(
                target: "linkstore::repo",
                operation = operation.name(),
                elapsed_us,
                "Operation failed with internal error"
            ),
            Outcome::Failure(kind) => debug!(
                target: "linkstore::repo",
                operation = operation.name(),
                kind = ?kind,
                elapsed_us,
                "Operation rejected"
            ),
        }
    }
}

/// Per-outcome operation counters
///
/// Counters use Relaxed ordering: they are observational only and
/// synchronize nothing else.
#[derive(Debug, Default)]
pub struct OperationCounters {
    started: AtomicU64,
    succeeded: AtomicU64,
    bad_parameter: AtomicU64,
    not_found: AtomicU64,
    version_conflict: AtomicU64,
    internal: AtomicU64,
    conversion: AtomicU64,
}

impl OperationCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations started
    pub fn started(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Operations that returned Ok
    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    /// Operations that failed with `kind`
    pub fn failed(&self, kind: ErrorKind) -> u64 {
        self.failure_counter(kind).load(Ordering::Relaxed)
    }

    /// Operations that failed with any kind
    pub fn total_failed(&self) -> u64 {
        [
            ErrorKind::BadParameter,
            ErrorKind::NotFound,
            ErrorKind::VersionConflict,
            ErrorKind::Internal,
            ErrorKind::Conversion,
        ]
        .into_iter()
        .map(|kind| self.failed(kind))
        .sum()
    }

    fn failure_counter(&self, kind: ErrorKind) -> &AtomicU64 {
        match kind {
            ErrorKind::BadParameter => &self.bad_parameter,
            ErrorKind::NotFound => &self.not_found,
            ErrorKind::VersionConflict => &self.version_conflict,
            ErrorKind::Internal => &self.internal,
            ErrorKind::Conversion => &self.conversion,
        }
    }
}

impl Instrumentation for OperationCounters {
    fn operation_started(&self, _operation: Operation) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    fn operation_finished(&self, _operation: Operation, outcome: Outcome, _elapsed: Duration) {
        let counter = match outcome {
            Outcome::Success => &self.succeeded,
            Outcome::Failure(kind) => self.failure_counter(kind),
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
