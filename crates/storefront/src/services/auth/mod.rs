//! Admin session gate.
//!
//! One static credential pair unlocks the admin surface for the rest of the
//! browsing session. There are no accounts, tokens, lockout or expiry beyond
//! the session's own; this gate is a convenience, not a security boundary.

mod error;

pub use error::AuthError;

use secrecy::ExposeSecret;
use tracing::{info, instrument, warn};

use crate::config::AdminCredentials;
use crate::db::{KeyValueStore, get_json, keys, set_json};

/// Session-scoped admin flag checked against a static credential pair.
pub struct SessionGate<'a, K> {
    session: K,
    credentials: &'a AdminCredentials,
}

impl<'a, K: KeyValueStore> SessionGate<'a, K> {
    /// Create a gate over the session store `session`.
    #[must_use]
    pub const fn new(session: K, credentials: &'a AdminCredentials) -> Self {
        Self {
            session,
            credentials,
        }
    }

    /// Check the credentials and, on success, mark the session as admin.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on a mismatch and
    /// `AuthError::Persistence` if the flag cannot be stored.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let matches = username == self.credentials.username
            && password == self.credentials.password.expose_secret();
        if !matches {
            warn!("admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        set_json(&self.session, keys::ADMIN_AUTHENTICATED, &true).await?;
        info!("admin logged in");
        Ok(())
    }

    /// Clear the admin flag.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Persistence` if the flag cannot be removed.
    pub async fn logout(&self) -> Result<(), AuthError> {
        self.session.remove(keys::ADMIN_AUTHENTICATED).await?;
        info!("admin logged out");
        Ok(())
    }

    /// Whether the session carries the admin flag.
    ///
    /// An unreadable flag counts as logged out.
    pub async fn is_authenticated(&self) -> bool {
        match get_json::<bool, _>(&self.session, keys::ADMIN_AUTHENTICATED).await {
            Ok(flag) => flag.unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "unreadable admin flag");
                false
            }
        }
    }
}
