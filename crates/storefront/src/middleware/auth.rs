//! Admin authentication extractor.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::services::auth::SessionGate;
use crate::state::AppState;

use super::session::SessionKv;

/// Extractor that requires the admin session flag.
///
/// Rejects with `401 Unauthorized` when the flag is not set.
///
/// # Example
///
/// ```rust,ignore
/// async fn admin_only(_: RequireAdmin) -> impl IntoResponse {
///     "welcome back"
/// }
/// ```
pub struct RequireAdmin;

/// Rejection for [`RequireAdmin`].
pub struct AdminRejection;

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Admin login required" })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AdminRejection)?;

        let gate = SessionGate::new(SessionKv::new(session), state.admin());
        if gate.is_authenticated().await {
            Ok(Self)
        } else {
            Err(AdminRejection)
        }
    }
}
