//! Session middleware configuration.
//!
//! Sessions live in process memory via tower-sessions. Each browser's cart,
//! admin flag and last order are stored in its session through [`SessionKv`].

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::StorefrontConfig;
use crate::db::{KeyValueStore, PersistenceError};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "souk_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    // Determine if we're in production (HTTPS)
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

/// A browser session viewed as a key-value store of JSON strings.
#[derive(Clone, Debug)]
pub struct SessionKv {
    session: Session,
}

impl SessionKv {
    /// Wrap a request's session.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }
}

fn session_error(e: &tower_sessions::session::Error) -> PersistenceError {
    PersistenceError::Session(e.to_string())
}

impl KeyValueStore for SessionKv {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        self.session
            .get::<String>(key)
            .await
            .map_err(|e| session_error(&e))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.session
            .insert(key, value)
            .await
            .map_err(|e| session_error(&e))
    }

    async fn remove(&self, key: &str) -> Result<(), PersistenceError> {
        self.session
            .remove_value(key)
            .await
            .map(|_| ())
            .map_err(|e| session_error(&e))
    }
}
