//! Shared fixtures for handler tests.

use crate::config::Config;
use crate::web::state::AppState;
use axum::response::Response;
use lead_tracker_core::ports::{InMemoryStore, NoDelay};
use lead_tracker_core::User;
use mockable::DefaultClock;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A hydrated application state over in-memory storage with no login delay.
pub fn test_state() -> Arc<AppState> {
    let config = Config::from_lookup(|_| None).expect("default config");
    let state = AppState::new(
        Arc::new(config),
        Arc::new(InMemoryStore::new()),
        Arc::new(DefaultClock),
        Arc::new(NoDelay),
    );
    state.auth.hydrate().expect("hydrate");
    Arc::new(state)
}

pub async fn login_as(state: &AppState, email: &str) -> User {
    state
        .auth
        .login(email, "secret1")
        .await
        .expect("login")
        .user
}

pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
