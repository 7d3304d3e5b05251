//! Canonical purchase records.

use serde::{Deserialize, Serialize};

/// The kind of purchase a canonical record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseType {
    /// A one-time product purchase.
    OneTime,
    /// A recurring subscription.
    Subscription,
}

/// A normalized, platform-agnostic purchase record.
///
/// Produced by the purchase converter from a platform purchase receipt plus
/// optional SKU metadata. Immutable once constructed. The raw platform
/// payload is carried verbatim in `original_json` because server-side
/// validation needs the untouched receipt.
///
/// Detail fields sourced from SKU metadata (`price`, `currency`, `title`)
/// are empty strings when the metadata was unavailable at conversion time;
/// a missing price lookup must never block a purchase submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPurchase {
    /// The product identifier (SKU).
    pub product_id: String,
    /// The opaque platform purchase token.
    pub purchase_token: String,
    /// Purchase time in Unix milliseconds.
    pub purchase_time_ms: u64,
    /// The raw platform purchase payload, verbatim.
    pub original_json: String,
    /// Whether this is a one-time purchase or a subscription.
    pub purchase_type: PurchaseType,
    /// Display price, e.g. `"$4.99"`. Empty if SKU metadata was absent.
    pub price: String,
    /// ISO currency code, e.g. `"USD"`. Empty if SKU metadata was absent.
    pub currency: String,
    /// Product title. Empty if SKU metadata was absent.
    pub title: String,
}

impl CanonicalPurchase {
    /// Returns true if this record is a subscription purchase.
    pub fn is_subscription(&self) -> bool {
        self.purchase_type == PurchaseType::Subscription
    }

    /// Returns true if the detail fields sourced from SKU metadata are
    /// populated.
    pub fn has_details(&self) -> bool {
        !self.price.is_empty() || !self.currency.is_empty() || !self.title.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_json, encode_json};

    fn sample() -> CanonicalPurchase {
        CanonicalPurchase {
            product_id: "premium_monthly".into(),
            purchase_token: "tok-123".into(),
            purchase_time_ms: 1_700_000_000_000,
            original_json: r#"{"orderId":"GPA.1"}"#.into(),
            purchase_type: PurchaseType::Subscription,
            price: "$4.99".into(),
            currency: "USD".into(),
            title: "Premium (monthly)".into(),
        }
    }

    #[test]
    fn subscription_flag() {
        assert!(sample().is_subscription());

        let one_time = CanonicalPurchase {
            purchase_type: PurchaseType::OneTime,
            ..sample()
        };
        assert!(!one_time.is_subscription());
    }

    #[test]
    fn detail_fields_detection() {
        assert!(sample().has_details());

        let bare = CanonicalPurchase {
            price: String::new(),
            currency: String::new(),
            title: String::new(),
            ..sample()
        };
        assert!(!bare.has_details());
    }

    #[test]
    fn original_payload_survives_encoding() {
        let purchase = sample();
        let bytes = encode_json(&purchase).unwrap();
        let decoded: CanonicalPurchase = decode_json(&bytes).unwrap();
        assert_eq!(decoded.original_json, purchase.original_json);
    }
}
