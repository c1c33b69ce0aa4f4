//! crates/lead_tracker_core/src/auth.rs
//!
//! Mock authentication: validates credentials by shape, runs them past a
//! `CredentialVerifier`, and owns the session lifecycle
//! (`Hydrating` -> `Anonymous` <-> `Authenticated`).

use crate::domain::{AuthSession, Role, SessionState, User};
use crate::ports::{CredentialVerifier, PortError, PortResult};
use crate::session::SessionStore;
use crate::validation::{sanitize_input, validate_email, validate_password};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

pub struct AuthService {
    sessions: SessionStore,
    verifier: Arc<dyn CredentialVerifier>,
    min_password_len: usize,
    state: RwLock<SessionState>,
}

impl AuthService {
    /// Creates the service in the `Hydrating` state. Call `hydrate` once at startup.
    pub fn new(
        sessions: SessionStore,
        verifier: Arc<dyn CredentialVerifier>,
        min_password_len: usize,
    ) -> Self {
        Self {
            sessions,
            verifier,
            min_password_len,
            state: RwLock::new(SessionState::Hydrating),
        }
    }

    /// Restores the persisted session. Only the first call reads storage;
    /// afterwards the current state is returned unchanged.
    pub fn hydrate(&self) -> PortResult<SessionState> {
        let mut state = self.write_state()?;
        if !state.is_loading() {
            return Ok(state.clone());
        }

        let (next, outcome) = match self.sessions.load() {
            Ok(Some((token, user))) => {
                info!(user_id = %user.id, "Restored persisted session");
                (SessionState::Authenticated { user, token }, Ok(()))
            }
            Ok(None) => (SessionState::Anonymous, Ok(())),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable persisted session");
                if let Err(clear_err) = self.sessions.clear() {
                    warn!(error = %clear_err, "Failed to clear persisted session");
                }
                match e {
                    PortError::Corrupted { .. } => (SessionState::Anonymous, Ok(())),
                    other => (SessionState::Anonymous, Err(other)),
                }
            }
        };
        *state = next;
        outcome.map(|()| state.clone())
    }

    /// Validates the credential format, waits for the verifier and, on
    /// success, persists and returns a fabricated session.
    ///
    /// Nothing is written when validation or verification fails.
    pub async fn login(&self, email: &str, password: &str) -> PortResult<AuthSession> {
        let email = email.trim();
        if !validate_email(email) || !validate_password(password, self.min_password_len) {
            return Err(PortError::Validation(
                "Invalid credentials format".to_string(),
            ));
        }

        if !self.verifier.verify(email, password).await? {
            warn!("Login rejected by credential check");
            return Err(PortError::InvalidCredentials);
        }

        let user = mock_user(email);
        let token = format!("tok_{}", Uuid::new_v4().simple());
        self.sessions.save(&token, &user)?;

        *self.write_state()? = SessionState::Authenticated {
            user: user.clone(),
            token: token.clone(),
        };
        info!(user_id = %user.id, "User logged in");
        Ok(AuthSession { user, token })
    }

    /// Clears the persisted session. Repeating it is harmless.
    pub fn logout(&self) -> PortResult<()> {
        self.sessions.clear()?;
        let mut state = self.write_state()?;
        if state.is_authenticated() {
            info!("User logged out");
        }
        *state = SessionState::Anonymous;
        Ok(())
    }

    pub fn current(&self) -> SessionState {
        match self.state.read() {
            Ok(state) => state.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.current().user().is_some_and(|user| user.role == role)
    }

    /// Resolves a bearer token to the session user.
    pub fn authenticate(&self, token: &str) -> PortResult<User> {
        let state = if self.current().is_loading() {
            self.hydrate()?
        } else {
            self.current()
        };
        match state {
            SessionState::Authenticated { user, token: current } if current == token => Ok(user),
            _ => Err(PortError::Unauthorized),
        }
    }

    fn write_state(&self) -> PortResult<std::sync::RwLockWriteGuard<'_, SessionState>> {
        self.state
            .write()
            .map_err(|_| PortError::Unexpected("session state lock poisoned".to_string()))
    }
}

/// The user record the mock backend would have returned. The id is stable per
/// address so leads created in earlier sessions stay visible.
fn mock_user(email: &str) -> User {
    let normalized = email.to_lowercase();
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("mailto:{normalized}").as_bytes());
    let local_part = email.split('@').next().unwrap_or(email);
    User {
        id: id.to_string(),
        email: sanitize_input(email),
        name: sanitize_input(local_part),
        role: Role::Teacher,
    }
}
