//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for the mock login, logout and session lookup.

use crate::error::http_error;
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use lead_tracker_core::{AuthSession, Role, SessionState, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;

/// Lifetime of the auth cookie, in seconds (24 hours).
pub const AUTH_COOKIE_MAX_AGE: i64 = 60 * 60 * 24;
pub const AUTH_COOKIE_NAME: &str = "auth_token";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    /// One of `teacher`, `admin`, `other`.
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let role = match user.role {
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::Other => "other",
        };
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: role.to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub is_authenticated: bool,
    pub loading: bool,
    pub user: Option<UserResponse>,
}

impl From<SessionState> for SessionResponse {
    fn from(state: SessionState) -> Self {
        let loading = state.is_loading();
        match state {
            SessionState::Authenticated { user, .. } => Self {
                is_authenticated: true,
                loading,
                user: Some(user.into()),
            },
            _ => Self {
                is_authenticated: false,
                loading,
                user: None,
            },
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/login - Log in with any well-formed email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Malformed email or password"),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // 1. Throttle repeated attempts for the same address
    let limiter_key = req.email.trim().to_lowercase();
    if !state.login_limiter.check(&limiter_key) {
        warn!("Login rate limit exceeded");
        return Err((
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts, try again later".to_string(),
        ));
    }

    // 2. Validate, verify and persist the session
    let AuthSession { user, token } = state
        .auth
        .login(&req.email, &req.password)
        .await
        .map_err(|e| http_error("Failed to log in", e))?;
    state.login_limiter.reset(&limiter_key);

    // 3. Hand the token back both as a cookie and in the body
    let cookie = format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={}",
        AUTH_COOKIE_NAME, token, AUTH_COOKIE_MAX_AGE
    );
    let response = LoginResponse {
        token,
        user: user.into(),
    };

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)], Json(response)))
}

/// POST /auth/logout - End the session. Safe to repeat.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .auth
        .logout()
        .map_err(|e| http_error("Failed to logout", e))?;

    let cookie = format!(
        "{}=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0",
        AUTH_COOKIE_NAME
    );
    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}

/// GET /auth/session - Current session state
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse)
    )
)]
pub async fn session_handler(State(state): State<Arc<AppState>>) -> Json<SessionResponse> {
    Json(state.auth.current().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::test_support::{body_json, test_state};
    use axum::response::IntoResponse;

    fn login(email: &str, password: &str) -> Json<LoginRequest> {
        Json(LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn login_returns_token_and_cookie() {
        let state = test_state();
        let response = login_handler(State(state.clone()), login("t@school.edu", "secret1"))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        let body: LoginResponse = body_json(response).await;
        assert!(cookie.starts_with(&format!("auth_token={}", body.token)));
        assert_eq!(body.user.role, "teacher");
        assert_eq!(body.user.name, "t");

        let Json(session) = session_handler(State(state)).await;
        assert!(session.is_authenticated);
        assert!(!session.loading);
    }

    #[tokio::test]
    async fn malformed_login_is_bad_request() {
        let state = test_state();
        let response = login_handler(State(state.clone()), login("bad-email", "123"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let Json(session) = session_handler(State(state)).await;
        assert!(!session.is_authenticated);
        assert!(session.user.is_none());
    }

    #[tokio::test]
    async fn repeated_attempts_are_throttled() {
        let state = test_state();
        for _ in 0..state.config.login_rate_limit {
            let response = login_handler(State(state.clone()), login("t@school.edu", "123"))
                .await
                .into_response();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        let response = login_handler(State(state), login("t@school.edu", "secret1"))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn logout_twice_succeeds() {
        let state = test_state();
        login_handler(State(state.clone()), login("t@school.edu", "secret1"))
            .await
            .into_response();
        for _ in 0..2 {
            let response = logout_handler(State(state.clone())).await.into_response();
            assert_eq!(response.status(), StatusCode::OK);
        }
        assert!(!state.auth.current().is_authenticated());
    }
}
