//! One-shot fault injection for store tests
//!
//! A [`FaultPlan`] arms failure points; the next store operation passing an
//! armed point fails with [`StoreError::Injected`] and disarms it.

use crate::error::{StoreError, StoreResult};
use std::sync::atomic::{AtomicBool, Ordering};

/// Points at which a failure can be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    /// Opening a transaction
    Begin,
    /// Any table read
    Read,
    /// Any table write
    Write,
    /// Committing a transaction
    Commit,
}

impl FaultPoint {
    /// Human-readable name used in error messages
    pub const fn name(&self) -> &'static str {
        match self {
            FaultPoint::Begin => "begin",
            FaultPoint::Read => "read",
            FaultPoint::Write => "write",
            FaultPoint::Commit => "commit",
        }
    }

    const fn index(&self) -> usize {
        match self {
            FaultPoint::Begin => 0,
            FaultPoint::Read => 1,
            FaultPoint::Write => 2,
            FaultPoint::Commit => 3,
        }
    }
}

/// Set of armed failure points
#[derive(Debug, Default)]
pub struct FaultPlan {
    armed: [AtomicBool; 4],
}

impl FaultPlan {
    /// Create a plan with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a point; the next operation passing it fails
    pub fn arm(&self, point: FaultPoint) {
        self.armed[point.index()].store(true, Ordering::SeqCst);
    }

    /// Disarm every point
    pub fn clear(&self) {
        for flag in &self.armed {
            flag.store(false, Ordering::SeqCst);
        }
    }

    /// Check whether `point` is still armed
    pub fn is_armed(&self, point: FaultPoint) -> bool {
        self.armed[point.index()].load(Ordering::SeqCst)
    }

    /// Fail if `point` is armed, disarming it
    pub fn check(&self, point: FaultPoint) -> StoreResult<()> {
        if self.armed[point.index()].swap(false, Ordering::SeqCst) {
            return Err(StoreError::Injected(point.name()));
        }
        Ok(())
    }
}
