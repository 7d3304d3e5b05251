//! In-memory record store.

use parking_lot::RwLock;
use revsync_protocol::{CanonicalPurchase, OutboundAttribution};
use std::collections::{BTreeMap, HashMap, HashSet};

/// A recorded purchase, keyed by its purchase token.
#[derive(Debug, Clone)]
pub struct PurchaseRecord {
    /// The uid that submitted the purchase.
    pub client_uid: String,
    /// The purchase record as received.
    pub purchase: CanonicalPurchase,
}

/// A recorded attribution payload.
#[derive(Debug, Clone)]
pub struct AttributionRecord {
    /// The uid that submitted the payload.
    pub client_uid: String,
    /// The payload as received.
    pub attribution: OutboundAttribution,
}

/// The server's in-memory state: known uids, purchases, merged properties,
/// and the attribution log.
#[derive(Debug, Default)]
pub struct RecordStore {
    users: RwLock<HashSet<String>>,
    purchases: RwLock<HashMap<String, PurchaseRecord>>,
    properties: RwLock<HashMap<String, BTreeMap<String, String>>>,
    attributions: RwLock<Vec<AttributionRecord>>,
}

impl RecordStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly minted uid.
    pub fn register_user(&self, uid: &str) {
        self.users.write().insert(uid.to_string());
    }

    /// Returns the number of registered uids.
    pub fn user_count(&self) -> usize {
        self.users.read().len()
    }

    /// Records a purchase. Returns false if the purchase token was already
    /// recorded; the store never double-counts a purchase.
    pub fn record_purchase(&self, uid: &str, purchase: CanonicalPurchase) -> bool {
        let mut purchases = self.purchases.write();
        if purchases.contains_key(&purchase.purchase_token) {
            return false;
        }
        purchases.insert(
            purchase.purchase_token.clone(),
            PurchaseRecord {
                client_uid: uid.to_string(),
                purchase,
            },
        );
        true
    }

    /// Returns the number of distinct recorded purchases.
    pub fn purchase_count(&self) -> usize {
        self.purchases.read().len()
    }

    /// Returns a recorded purchase by purchase token.
    pub fn purchase(&self, purchase_token: &str) -> Option<PurchaseRecord> {
        self.purchases.read().get(purchase_token).cloned()
    }

    /// Merges a property batch into the uid's stored properties
    /// (last write wins). Returns the number of entries merged.
    pub fn merge_properties(&self, uid: &str, batch: &BTreeMap<String, String>) -> u32 {
        let mut properties = self.properties.write();
        let stored = properties.entry(uid.to_string()).or_default();
        for (key, value) in batch {
            stored.insert(key.clone(), value.clone());
        }
        batch.len() as u32
    }

    /// Returns the stored properties for a uid.
    pub fn properties_for(&self, uid: &str) -> Option<BTreeMap<String, String>> {
        self.properties.read().get(uid).cloned()
    }

    /// Appends an attribution payload to the log.
    pub fn record_attribution(&self, uid: &str, attribution: OutboundAttribution) {
        self.attributions.write().push(AttributionRecord {
            client_uid: uid.to_string(),
            attribution,
        });
    }

    /// Returns the number of logged attribution payloads.
    pub fn attribution_count(&self) -> usize {
        self.attributions.read().len()
    }

    /// Returns a copy of the attribution log.
    pub fn attributions(&self) -> Vec<AttributionRecord> {
        self.attributions.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use revsync_protocol::PurchaseType;

    fn purchase(token: &str) -> CanonicalPurchase {
        CanonicalPurchase {
            product_id: "coins_100".into(),
            purchase_token: token.into(),
            purchase_time_ms: 7,
            original_json: "{}".into(),
            purchase_type: PurchaseType::OneTime,
            price: String::new(),
            currency: String::new(),
            title: String::new(),
        }
    }

    #[test]
    fn purchase_dedup_by_token() {
        let store = RecordStore::new();

        assert!(store.record_purchase("uid-1", purchase("pt-1")));
        assert!(!store.record_purchase("uid-1", purchase("pt-1")));
        assert!(store.record_purchase("uid-1", purchase("pt-2")));

        assert_eq!(store.purchase_count(), 2);
    }

    #[test]
    fn property_merge_last_write_wins() {
        let store = RecordStore::new();

        let mut first = BTreeMap::new();
        first.insert("plan".to_string(), "free".to_string());
        first.insert("locale".to_string(), "en".to_string());
        assert_eq!(store.merge_properties("uid-1", &first), 2);

        let mut second = BTreeMap::new();
        second.insert("plan".to_string(), "pro".to_string());
        store.merge_properties("uid-1", &second);

        let stored = store.properties_for("uid-1").unwrap();
        assert_eq!(stored.get("plan").map(String::as_str), Some("pro"));
        assert_eq!(stored.get("locale").map(String::as_str), Some("en"));
    }

    #[test]
    fn properties_are_scoped_per_uid() {
        let store = RecordStore::new();

        let mut batch = BTreeMap::new();
        batch.insert("plan".to_string(), "pro".to_string());
        store.merge_properties("uid-1", &batch);

        assert!(store.properties_for("uid-2").is_none());
    }

    #[test]
    fn attribution_log_appends() {
        let store = RecordStore::new();
        store.record_attribution(
            "uid-1",
            OutboundAttribution::new(revsync_protocol::AttributionSource::Branch, "c-1"),
        );
        store.record_attribution(
            "uid-1",
            OutboundAttribution::new(revsync_protocol::AttributionSource::Branch, "c-2"),
        );

        assert_eq!(store.attribution_count(), 2);
        assert_eq!(store.attributions()[1].attribution.conversion_id, "c-2");
    }
}
