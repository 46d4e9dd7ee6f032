//! Single-assignment container for values that arrive asynchronously.

use std::fmt;
use std::sync::OnceLock;

use neural_core::{Error, Result};

/// A value that becomes available exactly once.
///
/// One producer assigns, any number of consumers poll. Reads never block and
/// never fail; before assignment they simply return `None`. Assignment and
/// reads are synchronized, so a value set on an inference task is visible to
/// a later rewrite pass on another thread.
pub struct DeferredValue<T> {
    cell: OnceLock<T>,
}

impl<T> DeferredValue<T> {
    /// Create an unset value.
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
        }
    }

    /// Assign the value. Returns `false` if it was already set.
    pub fn try_set(&self, value: T) -> bool {
        self.cell.set(value).is_ok()
    }

    /// Assign the value, failing with [`Error::DoubleAssignment`] if it was
    /// already set.
    pub fn set(&self, value: T) -> Result<()> {
        self.cell.set(value).map_err(|_| Error::DoubleAssignment)
    }

    /// The value, if it has been assigned.
    pub fn try_get(&self) -> Option<&T> {
        self.cell.get()
    }

    /// Whether the value has been assigned.
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T> Default for DeferredValue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for DeferredValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_set() { "set" } else { "unset" };
        f.debug_tuple("DeferredValue").field(&state).finish()
    }
}
