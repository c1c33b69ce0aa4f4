//! crates/lead_tracker_core/src/session.rs
//!
//! Persists the authenticated identity, separately from the leads.

use crate::domain::User;
use crate::ports::{KeyValueStore, PortError, PortResult};
use std::sync::Arc;

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const USER_DATA_KEY: &str = "user_data";

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Reads the persisted token and user.
    ///
    /// `Ok(None)` when no token is stored. A token without a readable user
    /// record is `PortError::Corrupted`.
    pub fn load(&self) -> PortResult<Option<(String, User)>> {
        let Some(token) = self.kv.get(AUTH_TOKEN_KEY)? else {
            return Ok(None);
        };
        let raw = self.kv.get(USER_DATA_KEY)?.ok_or_else(|| PortError::Corrupted {
            key: USER_DATA_KEY.to_string(),
            reason: "token present without user data".to_string(),
        })?;
        let user = serde_json::from_str(&raw).map_err(|e| PortError::Corrupted {
            key: USER_DATA_KEY.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some((token, user)))
    }

    pub fn save(&self, token: &str, user: &User) -> PortResult<()> {
        let raw = serde_json::to_string(user)
            .map_err(|e| PortError::Unexpected(format!("failed to serialize user: {e}")))?;
        self.kv.set(AUTH_TOKEN_KEY, token)?;
        self.kv.set(USER_DATA_KEY, &raw)
    }

    pub fn clear(&self) -> PortResult<()> {
        self.kv.remove(AUTH_TOKEN_KEY)?;
        self.kv.remove(USER_DATA_KEY)
    }
}
