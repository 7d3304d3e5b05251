//! User-property entries and the deduplicated property set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single user-property write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyEntry {
    /// The property key.
    pub key: String,
    /// The property value.
    pub value: String,
}

/// A set of pending user-property writes, keyed by property key.
///
/// Later writes to the same key replace earlier ones (last write wins).
/// Insertion order is not preserved; entries are reported in key order,
/// which is sufficient for debug introspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertySet {
    entries: BTreeMap<String, String>,
}

impl PropertySet {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a property, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the set holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the entries in key order.
    pub fn entries(&self) -> Vec<PropertyEntry> {
        self.entries
            .iter()
            .map(|(k, v)| PropertyEntry {
                key: k.clone(),
                value: v.clone(),
            })
            .collect()
    }

    /// Consumes the set, returning the underlying map.
    pub fn into_map(self) -> BTreeMap<String, String> {
        self.entries
    }
}

/// Well-known property codes the SDK writes on its own behalf.
///
/// Hosts can also write arbitrary keys via the free-form property API;
/// these codes only reserve the names the engine itself uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownProperty {
    /// Host-supplied user identifier.
    UserId,
    /// User email address.
    Email,
    /// User display name.
    Name,
    /// Device advertising identifier, when the provider resolved one.
    AdvertisingId,
    /// Facebook attribution identifier.
    FacebookAttribution,
}

impl KnownProperty {
    /// Returns the wire code for this property.
    pub fn code(&self) -> &'static str {
        match self {
            KnownProperty::UserId => "user_id",
            KnownProperty::Email => "email",
            KnownProperty::Name => "name",
            KnownProperty::AdvertisingId => "advertising_id",
            KnownProperty::FacebookAttribution => "facebook_attribution",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn last_write_wins() {
        let mut set = PropertySet::new();
        set.insert("plan", "free");
        set.insert("plan", "pro");

        assert_eq!(set.len(), 1);
        assert_eq!(set.get("plan"), Some("pro"));
    }

    #[test]
    fn distinct_keys_all_present() {
        let mut set = PropertySet::new();
        set.insert("a", "1");
        set.insert("b", "2");
        set.insert("c", "3");

        assert_eq!(set.len(), 3);
        let entries = set.entries();
        assert_eq!(entries[0].key, "a");
        assert_eq!(entries[2].value, "3");
    }

    #[test]
    fn clear_empties_the_set() {
        let mut set = PropertySet::new();
        set.insert("a", "1");
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn known_property_codes_are_distinct() {
        let codes = [
            KnownProperty::UserId.code(),
            KnownProperty::Email.code(),
            KnownProperty::Name.code(),
            KnownProperty::AdvertisingId.code(),
            KnownProperty::FacebookAttribution.code(),
        ];
        let mut deduped = codes.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), codes.len());
    }

    proptest! {
        /// For any write sequence, each key holds the value of its final
        /// write and nothing else.
        #[test]
        fn final_write_wins_for_every_key(
            writes in proptest::collection::vec(("[a-d]", "[a-z]{1,4}"), 0..32)
        ) {
            let mut set = PropertySet::new();
            for (key, value) in &writes {
                set.insert(key.clone(), value.clone());
            }

            let mut expected = BTreeMap::new();
            for (key, value) in &writes {
                expected.insert(key.clone(), value.clone());
            }

            prop_assert_eq!(set.into_map(), expected);
        }
    }
}
