//! Authentication error types.

use thiserror::Error;

use crate::db::PersistenceError;

/// Errors that can occur during admin login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password did not match.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The session flag could not be stored.
    #[error("session storage error: {0}")]
    Persistence(#[from] PersistenceError),
}
