//! Cooperative cancellation for long-running comparisons.
//!
//! The engine never creates or owns a checker; callers build one and pass it
//! into every call. The matcher polls it at a bounded interval and turns a
//! positive answer into [`ComparisonError::Cancelled`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::ComparisonError;

/// A "should I stop" predicate polled by the engine.
pub trait CancellationChecker: Send + Sync {
    /// `true` once the computation should stop.
    fn is_cancelled(&self) -> bool;

    /// Convert a positive [`is_cancelled`](Self::is_cancelled) into an error.
    fn check(&self) -> Result<(), ComparisonError> {
        if self.is_cancelled() {
            Err(ComparisonError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// A checker that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancellationChecker for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A shared flag that any thread can raise.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every computation polling this flag.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl CancellationChecker for CancellationFlag {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Becomes cancelled once a wall-clock budget has elapsed.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn at(at: Instant) -> Self {
        Self { at }
    }
}

impl CancellationChecker for Deadline {
    fn is_cancelled(&self) -> bool {
        Instant::now() >= self.at
    }
}

impl<F> CancellationChecker for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}
