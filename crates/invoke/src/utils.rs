//! Utility macros and functions for the invoke crate.
//!
//! This module provides helper macros and functions that are used internally
//! by the adaptation layer.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It's useful for validation checks where you want to return early with an error
/// if some condition is not satisfied.
///
/// # Arguments
///
/// * `$predicate` - A boolean expression that should evaluate to true
/// * `$error` - The error value to return if the predicate is false
///
/// # Example
///
/// ```ignore
/// ensure!(!state.finalized, SinkError::finalized("set_status"));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Locks the mutex, recovering the guard if a previous holder panicked.
///
/// Handler panics are caught by the invoker, so a lock can be poisoned by a
/// handler that died mid-write.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
