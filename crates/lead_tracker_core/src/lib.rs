pub mod auth;
pub mod domain;
pub mod ports;
pub mod repository;
pub mod session;
pub mod store;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use auth::AuthService;
pub use domain::{
    AuthSession, Lead, LeadFilter, LeadForm, LeadPatch, LeadSource, LeadStatus, Role, SessionState,
    User,
};
pub use ports::{
    CredentialVerifier, Delay, InMemoryStore, KeyValueStore, MockVerifier, NoDelay, PortError,
    PortResult,
};
pub use repository::{CorruptionPolicy, LeadRepository};
pub use session::SessionStore;
pub use store::LeadStore;
