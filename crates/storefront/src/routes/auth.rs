//! Admin login route handlers.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::SessionKv;
use crate::services::auth::SessionGate;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Current admin state of the session.
#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
}

/// Check the credential pair and flag the session.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<AuthStatus>> {
    SessionGate::new(SessionKv::new(session), state.admin())
        .login(&form.username, &form.password)
        .await?;
    Ok(Json(AuthStatus {
        authenticated: true,
    }))
}

/// Clear the admin flag.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<AuthStatus>> {
    SessionGate::new(SessionKv::new(session), state.admin())
        .logout()
        .await?;
    Ok(Json(AuthStatus {
        authenticated: false,
    }))
}

/// Whether the session holds the admin flag.
#[instrument(skip_all)]
pub async fn status(State(state): State<AppState>, session: Session) -> Json<AuthStatus> {
    let authenticated = SessionGate::new(SessionKv::new(session), state.admin())
        .is_authenticated()
        .await;
    Json(AuthStatus { authenticated })
}
