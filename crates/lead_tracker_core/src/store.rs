//! crates/lead_tracker_core/src/store.rs
//!
//! The persistence store: one serialized lead collection under one key.
//! Reads and writes always move the entire collection. Concurrent writers are
//! last-writer-wins at whole-collection granularity.

use crate::domain::Lead;
use crate::ports::{KeyValueStore, PortError, PortResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Storage key of the lead collection.
pub const LEADS_KEY: &str = "leads";

#[derive(Clone)]
pub struct LeadStore {
    kv: Arc<dyn KeyValueStore>,
    key: String,
}

impl LeadStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, LEADS_KEY)
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
        }
    }

    /// Loads the whole collection. A missing key is an empty collection;
    /// an unparsable value is `PortError::Corrupted` and the caller decides.
    pub fn load(&self) -> PortResult<Vec<Lead>> {
        match self.kv.get(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| PortError::Corrupted {
                key: self.key.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Replaces the stored collection with `leads`.
    pub fn save(&self, leads: &[Lead]) -> PortResult<()> {
        let raw = serde_json::to_string(leads)
            .map_err(|e| PortError::Unexpected(format!("failed to serialize leads: {e}")))?;
        self.kv.set(&self.key, &raw)
    }

    /// Copies the raw stored value to `<key>.corrupt-<timestamp>` so a reset
    /// does not lose it. Earlier copies are never overwritten.
    ///
    /// Returns the key the copy was written under, or `None` if nothing is stored.
    pub fn quarantine(&self, at: DateTime<Utc>) -> PortResult<Option<String>> {
        let Some(raw) = self.kv.get(&self.key)? else {
            return Ok(None);
        };
        let base = format!("{}.corrupt-{}", self.key, at.format("%Y%m%dT%H%M%S%3fZ"));
        let mut target = base.clone();
        let mut n = 1;
        while self.kv.get(&target)?.is_some() {
            target = format!("{base}-{n}");
            n += 1;
        }
        self.kv.set(&target, &raw)?;
        Ok(Some(target))
    }
}
