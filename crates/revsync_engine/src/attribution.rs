//! Attribution forwarding.

use revsync_protocol::{AttributionSource, OutboundAttribution};
use serde_json::Value;
use std::collections::BTreeMap;

/// Normalizes heterogeneous attribution payloads into one outbound shape.
///
/// Providers deliver arbitrarily nested maps; the forwarder flattens them
/// into dot-separated string keys and tags the result with the originating
/// source and the caller's correlation id. Pure transformation; the send is
/// delegated to the sync client.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributionForwarder;

impl AttributionForwarder {
    /// Creates a new forwarder.
    pub fn new() -> Self {
        Self
    }

    /// Normalizes a raw attribution payload.
    pub fn forward(
        &self,
        raw: &BTreeMap<String, Value>,
        source: AttributionSource,
        conversion_id: &str,
    ) -> OutboundAttribution {
        let mut attribution = OutboundAttribution::new(source, conversion_id);
        for (key, value) in raw {
            flatten(key, value, &mut attribution.data);
        }
        attribution
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten(&format!("{prefix}.{key}"), nested, out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten(&format!("{prefix}.{index}"), item, out);
            }
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Null => {
            out.insert(prefix.to_string(), String::new());
        }
        other => {
            out.insert(prefix.to_string(), other.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> BTreeMap<String, Value> {
        value
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    #[test]
    fn flat_payload_passes_through() {
        let payload = raw(json!({"campaign": "spring", "clicks": 3}));
        let out = AttributionForwarder::new().forward(&payload, AttributionSource::Adjust, "c-1");

        assert_eq!(out.source, "adjust");
        assert_eq!(out.conversion_id, "c-1");
        assert_eq!(out.data.get("campaign").map(String::as_str), Some("spring"));
        assert_eq!(out.data.get("clicks").map(String::as_str), Some("3"));
    }

    #[test]
    fn nested_payload_is_flattened() {
        let payload = raw(json!({
            "media": {"source": "organic", "channels": ["search", "social"]},
            "install": true
        }));
        let out =
            AttributionForwarder::new().forward(&payload, AttributionSource::AppsFlyer, "c-2");

        assert_eq!(
            out.data.get("media.source").map(String::as_str),
            Some("organic")
        );
        assert_eq!(
            out.data.get("media.channels.0").map(String::as_str),
            Some("search")
        );
        assert_eq!(
            out.data.get("media.channels.1").map(String::as_str),
            Some("social")
        );
        assert_eq!(out.data.get("install").map(String::as_str), Some("true"));
    }

    #[test]
    fn null_becomes_empty_string() {
        let payload = raw(json!({"referrer": null}));
        let out = AttributionForwarder::new().forward(&payload, AttributionSource::Branch, "c-3");
        assert_eq!(out.data.get("referrer").map(String::as_str), Some(""));
    }
}
