//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::web::auth::AUTH_COOKIE_NAME;
use crate::web::state::AppState;

/// Middleware that resolves the session token and extracts the user.
///
/// The token is read from `Authorization: Bearer <token>`, falling back to the
/// auth cookie. If valid, the `User` is inserted into request extensions for
/// handlers to use. If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    // 1. Find the token
    let token = session_token(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

    // 2. Resolve it against the current session
    let user = state.auth.authenticate(&token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        StatusCode::UNAUTHORIZED
    })?;

    // 3. Insert the user into request extensions
    req.extensions_mut().insert(user);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}

pub(crate) fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    let prefix = format!("{AUTH_COOKIE_NAME}=");
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix(prefix.as_str()))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}
