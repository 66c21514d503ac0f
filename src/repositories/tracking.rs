use dashmap::DashMap;

use crate::models::tracking::TrackingParameters;

/// Correlation store bridging checkout-time tracking parameters to the
/// webhook that arrives later under a gateway-issued transaction id.
///
/// In-process only: each instance of this service has its own store, which
/// is an accepted limitation. A multi-instance deployment needs an
/// implementation of this trait backed by a shared keyed store with TTL.
pub trait TrackingStore: Send + Sync {
    fn save(&self, key: &str, params: TrackingParameters);
    fn get(&self, key: &str) -> Option<TrackingParameters>;
}

/// Process-lifetime map. No expiry: a transaction fires its webhook at most
/// a few times, so staleness is bounded in practice. Racing writes to the
/// same key are last-write-wins; values are idempotent snapshots.
#[derive(Default)]
pub struct InMemoryTrackingStore {
    entries: DashMap<String, TrackingParameters>,
}

impl InMemoryTrackingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrackingStore for InMemoryTrackingStore {
    fn save(&self, key: &str, params: TrackingParameters) {
        self.entries.insert(key.to_string(), params);
    }

    fn get(&self, key: &str) -> Option<TrackingParameters> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(src: &str) -> TrackingParameters {
        TrackingParameters {
            src: Some(src.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn get_on_unknown_key_is_absent() {
        let store = InMemoryTrackingStore::new();
        assert!(store.get("never-saved").is_none());
    }

    #[test]
    fn save_then_get_returns_snapshot() {
        let store = InMemoryTrackingStore::new();
        store.save("ord_1", params("facebook"));
        assert_eq!(store.get("ord_1"), Some(params("facebook")));
    }

    #[test]
    fn same_snapshot_under_two_keys() {
        // Checkout saves under the local order id, then again under the
        // gateway transaction id once that is known.
        let store = InMemoryTrackingStore::new();
        store.save("ord_1", params("google"));
        store.save("trx_9", params("google"));
        assert_eq!(store.get("ord_1"), store.get("trx_9"));
    }

    #[test]
    fn last_write_wins_on_same_key() {
        let store = InMemoryTrackingStore::new();
        store.save("ord_1", params("first"));
        store.save("ord_1", params("second"));
        assert_eq!(store.get("ord_1"), Some(params("second")));
    }
}
