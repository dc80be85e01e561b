//! Realtime device state store
//!
//! In-process key-value store keyed by device id. Each record maps trait
//! names to trait-specific state objects. Every write emits exactly one
//! change event on a broadcast feed, which stands in for the realtime
//! database's on-write trigger and drives the report-state notifier.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};

use crate::traits::StateObject;

/// Capacity of the change feed. Slow subscribers lag and drop, they never
/// block writers.
const CHANGE_FEED_CAPACITY: usize = 256;

/// A state-store write notification
#[derive(Debug, Clone)]
pub struct StateChange {
    /// Device whose record was written
    pub device_id: String,
}

/// Realtime device state store
#[derive(Clone)]
pub struct StateStore {
    records: Arc<RwLock<HashMap<String, StateObject>>>,
    changes: broadcast::Sender<StateChange>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            changes,
        }
    }

    /// Subscribe to the change feed
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.changes.subscribe()
    }

    /// Point read of a device's full record
    pub async fn record(&self, device_id: &str) -> Option<StateObject> {
        self.records.read().await.get(device_id).cloned()
    }

    /// Shallow-merge a patch into one trait of a device's record
    pub async fn merge(&self, device_id: &str, trait_key: &str, patch: StateObject) {
        {
            let mut records = self.records.write().await;
            let state = trait_entry(&mut records, device_id, trait_key);
            for (field, value) in patch {
                state.insert(field, value);
            }
        }
        self.notify(device_id);
    }

    /// Atomic read-modify-write of one trait's state.
    ///
    /// `f` receives the current trait object (if any) and returns the patch
    /// to merge; both happen under the write lock so concurrent transforms
    /// of the same trait serialize. Returns the applied patch.
    pub async fn transform<F>(&self, device_id: &str, trait_key: &str, f: F) -> StateObject
    where
        F: FnOnce(Option<&StateObject>) -> StateObject,
    {
        let patch;
        {
            let mut records = self.records.write().await;
            let current = records
                .get(device_id)
                .and_then(|r| r.get(trait_key))
                .and_then(serde_json::Value::as_object);
            patch = f(current);

            let state = trait_entry(&mut records, device_id, trait_key);
            for (field, value) in patch.clone() {
                state.insert(field, value);
            }
        }
        self.notify(device_id);
        patch
    }

    /// Seed default fields for one trait, inserting only fields not already
    /// present. Used at SYNC so re-linking never resets live state.
    pub async fn seed_missing(&self, device_id: &str, trait_key: &str, defaults: StateObject) {
        let mut wrote = false;
        {
            let mut records = self.records.write().await;
            let state = trait_entry(&mut records, device_id, trait_key);
            for (field, value) in defaults {
                if !state.contains_key(&field) {
                    state.insert(field, value);
                    wrote = true;
                }
            }
        }
        if wrote {
            self.notify(device_id);
        }
    }

    fn notify(&self, device_id: &str) {
        // Send fails only when no notifier is subscribed
        let _ = self.changes.send(StateChange {
            device_id: device_id.to_string(),
        });
    }
}

/// Get or create the trait object within a device's record
fn trait_entry<'a>(
    records: &'a mut HashMap<String, StateObject>,
    device_id: &str,
    trait_key: &str,
) -> &'a mut StateObject {
    let record = records.entry(device_id.to_string()).or_default();
    let entry = record
        .entry(trait_key.to_string())
        .or_insert_with(|| serde_json::Value::Object(StateObject::new()));
    // Invariant: trait keys always hold objects
    if !entry.is_object() {
        *entry = serde_json::Value::Object(StateObject::new());
    }
    entry.as_object_mut().expect("trait entry is an object")
}
