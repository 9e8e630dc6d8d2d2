//! # Errors
//!
//! The only fallible operation in the core is registering a task. Queue
//! overflow is deliberately silent to the caller and an empty queue is an
//! `Option::None`, so neither has a variant here.

use core::fmt;

/// Errors returned by scheduler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedError {
    /// The task registry already holds its maximum number of entries.
    CapacityExceeded,
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::CapacityExceeded => f.write_str("max tasks reached"),
        }
    }
}
