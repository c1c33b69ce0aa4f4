//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::rate_limit::RateLimiter;
use lead_tracker_core::ports::{Delay, KeyValueStore, MockVerifier};
use lead_tracker_core::{AuthService, LeadRepository, LeadStore, SessionStore};
use mockable::Clock;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub leads: Arc<LeadRepository>,
    pub auth: Arc<AuthService>,
    pub config: Arc<Config>,
    pub login_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wires the core services over one key/value store.
    pub fn new(
        config: Arc<Config>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        delay: Arc<dyn Delay>,
    ) -> Self {
        let leads = LeadRepository::with_policy(
            LeadStore::new(kv.clone()),
            clock,
            config.corruption_policy,
        );
        let verifier = MockVerifier::new(delay, config.login_delay, config.min_password_len);
        let auth = AuthService::new(
            SessionStore::new(kv),
            Arc::new(verifier),
            config.min_password_len,
        );
        let login_limiter = RateLimiter::new(config.login_rate_limit, config.login_rate_window);

        Self {
            leads: Arc::new(leads),
            auth: Arc::new(auth),
            config,
            login_limiter: Arc::new(login_limiter),
        }
    }
}
