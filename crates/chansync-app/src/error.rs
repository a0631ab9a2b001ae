//! Session handle errors.

use thiserror::Error;

/// Errors from [`crate::SessionHandle`] calls that wait for the runtime.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// Runtime task has stopped
    #[error("session runtime has stopped")]
    Closed,
}
