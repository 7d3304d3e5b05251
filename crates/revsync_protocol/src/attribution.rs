//! Normalized attribution payloads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The third-party source an attribution payload originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionSource {
    /// AppsFlyer conversion data.
    AppsFlyer,
    /// Branch install/referral data.
    Branch,
    /// Adjust attribution data.
    Adjust,
    /// Facebook attribution data.
    Facebook,
}

impl AttributionSource {
    /// Returns the stable source identifier used on the wire.
    pub fn source_id(&self) -> &'static str {
        match self {
            AttributionSource::AppsFlyer => "appsflyer",
            AttributionSource::Branch => "branch",
            AttributionSource::Adjust => "adjust",
            AttributionSource::Facebook => "facebook",
        }
    }
}

/// A normalized attribution payload, ready for submission.
///
/// Heterogeneous payloads from different providers are flattened into a
/// single string-keyed map, tagged with the originating source and a
/// correlation id so the server can join conversions across reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundAttribution {
    /// Stable identifier of the originating source.
    pub source: String,
    /// Correlation id supplied by the caller (e.g. a conversion uid).
    pub conversion_id: String,
    /// Flattened attribution key/value data.
    pub data: BTreeMap<String, String>,
}

impl OutboundAttribution {
    /// Creates an attribution payload for the given source.
    pub fn new(source: AttributionSource, conversion_id: impl Into<String>) -> Self {
        Self {
            source: source.source_id().to_string(),
            conversion_id: conversion_id.into(),
            data: BTreeMap::new(),
        }
    }

    /// Adds a flattened data entry.
    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_are_stable() {
        assert_eq!(AttributionSource::AppsFlyer.source_id(), "appsflyer");
        assert_eq!(AttributionSource::Branch.source_id(), "branch");
        assert_eq!(AttributionSource::Adjust.source_id(), "adjust");
        assert_eq!(AttributionSource::Facebook.source_id(), "facebook");
    }

    #[test]
    fn builder_collects_entries() {
        let attribution = OutboundAttribution::new(AttributionSource::Branch, "conv-9")
            .with_entry("campaign", "spring")
            .with_entry("channel", "social");

        assert_eq!(attribution.source, "branch");
        assert_eq!(attribution.conversion_id, "conv-9");
        assert_eq!(attribution.data.get("campaign").map(String::as_str), Some("spring"));
        assert_eq!(attribution.data.len(), 2);
    }
}
