//! Side channel for best-effort operations whose failure must not fail the
//! parent operation.

use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// Short machine name of the side operation, e.g. `clear_password_flag`.
    pub operation: &'static str,

    pub message: String,
}

/// Cloneable collector, clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct Warnings {
    inner: Arc<Mutex<Vec<Warning>>>,
}

impl Warnings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and records the failure.
    pub fn push(&self, operation: &'static str, message: impl Into<String>) {
        let message = message.into();
        warn!(operation, error = %message, "Best-effort operation failed");
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Warning { operation, message });
    }

    /// Records the error of `result`, if any.
    pub fn capture<T, E: std::fmt::Display>(&self, operation: &'static str, result: Result<T, E>) {
        if let Err(e) = result {
            self.push(operation, e.to_string());
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Warning> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Empties the list, returning what was there.
    pub fn drain(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}
