//! crates/lead_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) the core logic depends on.
//! These traits form the boundary of the hexagonal architecture, so the core
//! stays independent of where values are stored or how time passes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and service operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Deliberately does not say whether the account or the password was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Stored value under '{key}' is corrupted: {reason}")]
    Corrupted { key: String, reason: String },
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Whole-value key/value storage. Every call reads or replaces one complete value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PortResult<()>;
}

/// Suspends the caller for a while. Lets tests run simulated latency instantly.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Checks well-formed credentials against whatever the backend is.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, email: &str, password: &str) -> PortResult<bool>;
}

//=========================================================================================
// In-process implementations
//=========================================================================================

/// A `KeyValueStore` held in memory, for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> PortResult<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| PortError::Unexpected("in-memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// Returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn wait(&self, _duration: Duration) {}
}

/// Simulated login round-trip: waits, then accepts any address containing `@`
/// with a long enough password.
#[derive(Clone)]
pub struct MockVerifier {
    delay: Arc<dyn Delay>,
    latency: Duration,
    min_password_len: usize,
}

impl MockVerifier {
    pub fn new(delay: Arc<dyn Delay>, latency: Duration, min_password_len: usize) -> Self {
        Self {
            delay,
            latency,
            min_password_len,
        }
    }
}

#[async_trait]
impl CredentialVerifier for MockVerifier {
    async fn verify(&self, email: &str, password: &str) -> PortResult<bool> {
        self.delay.wait(self.latency).await;
        Ok(email.contains('@') && password.chars().count() >= self.min_password_len)
    }
}
