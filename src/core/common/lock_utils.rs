//! Lock error conversions and the compute-once cell used by lazily fitted
//! algorithms.

use crate::core::common::OxiclusterError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Convert a poisoned mutex error with context
pub fn lock_poisoned_with_context<T>(
    context: &str,
) -> impl Fn(PoisonError<MutexGuard<'_, T>>) -> OxiclusterError + '_ {
    move |_| OxiclusterError::Lock(format!("Lock poisoned: {}", context))
}

/// A value computed at most once, on first request.
///
/// Concurrent callers of [`ComputeOnce::get_or_try_init`] block on the
/// internal mutex while the first caller runs the computation; afterwards all
/// of them receive the same `Arc`. A failed computation leaves the cell empty
/// so a later call may retry.
#[derive(Debug)]
pub struct ComputeOnce<T> {
    value: Mutex<Option<Arc<T>>>,
    computations: AtomicUsize,
}

impl<T> ComputeOnce<T> {
    pub fn new() -> Self {
        Self { value: Mutex::new(None), computations: AtomicUsize::new(0) }
    }

    /// Returns the cached value, computing it with `init` if absent.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `init`, or `OxiclusterError::Lock` if
    /// a previous computation panicked while holding the lock.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Arc<T>, OxiclusterError>
    where
        F: FnOnce() -> Result<T, OxiclusterError>,
    {
        let mut guard = self.value.lock().map_err(lock_poisoned_with_context("compute-once cell"))?;
        if let Some(value) = guard.as_ref() {
            return Ok(Arc::clone(value));
        }
        self.computations.fetch_add(1, Ordering::SeqCst);
        let value = Arc::new(init()?);
        *guard = Some(Arc::clone(&value));
        Ok(value)
    }

    /// Returns the value if it has been computed already.
    pub fn get(&self) -> Option<Arc<T>> {
        self.value.lock().ok().and_then(|guard| guard.as_ref().map(Arc::clone))
    }

    /// Number of times the computation has been started.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}

impl<T> Default for ComputeOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
