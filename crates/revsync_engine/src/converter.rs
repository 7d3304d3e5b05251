//! Purchase conversion.

use crate::billing::{PlatformPurchase, SkuDetails};
use revsync_protocol::{CanonicalPurchase, PurchaseType};

/// Converts platform purchase records into canonical purchase records.
///
/// Conversion is a pure, total function: no network, no side effects, and
/// no failure path for well-formed inputs. If SKU metadata is absent the
/// detail fields stay empty; a purchase submission must never be blocked by
/// a missing price or title lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct PurchaseConverter;

impl PurchaseConverter {
    /// Creates a new converter.
    pub fn new() -> Self {
        Self
    }

    /// Converts a `(SKU metadata, platform purchase)` pair into a
    /// [`CanonicalPurchase`].
    ///
    /// The raw platform payload is preserved verbatim; server-side
    /// validation needs the untouched receipt.
    pub fn convert(
        &self,
        sku: Option<&SkuDetails>,
        purchase: &PlatformPurchase,
    ) -> CanonicalPurchase {
        let purchase_type = match sku {
            Some(details) if details.is_subscription => PurchaseType::Subscription,
            Some(_) => PurchaseType::OneTime,
            // Without metadata, auto-renewal is the only subscription signal.
            None if purchase.auto_renewing => PurchaseType::Subscription,
            None => PurchaseType::OneTime,
        };

        CanonicalPurchase {
            product_id: purchase.product_id.clone(),
            purchase_token: purchase.purchase_token.clone(),
            purchase_time_ms: purchase.purchase_time_ms,
            original_json: purchase.raw_json.clone(),
            purchase_type,
            price: sku.map(|s| s.price.clone()).unwrap_or_default(),
            currency: sku.map(|s| s.currency.clone()).unwrap_or_default(),
            title: sku.map(|s| s.title.clone()).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sku() -> SkuDetails {
        SkuDetails {
            product_id: "premium_monthly".into(),
            price: "$4.99".into(),
            currency: "USD".into(),
            title: "Premium (monthly)".into(),
            is_subscription: true,
        }
    }

    fn purchase() -> PlatformPurchase {
        PlatformPurchase {
            product_id: "premium_monthly".into(),
            purchase_token: "tok-123".into(),
            purchase_time_ms: 1_700_000_000_000,
            auto_renewing: true,
            raw_json: r#"{"orderId":"GPA.1","productId":"premium_monthly"}"#.into(),
        }
    }

    #[test]
    fn conversion_is_deterministic() {
        let converter = PurchaseConverter::new();
        let sku = sku();
        let purchase = purchase();

        let first = converter.convert(Some(&sku), &purchase);
        let second = converter.convert(Some(&sku), &purchase);
        assert_eq!(first, second);
    }

    #[test]
    fn full_conversion_extracts_detail_fields() {
        let converted = PurchaseConverter::new().convert(Some(&sku()), &purchase());

        assert_eq!(converted.product_id, "premium_monthly");
        assert_eq!(converted.purchase_token, "tok-123");
        assert_eq!(converted.purchase_type, PurchaseType::Subscription);
        assert_eq!(converted.price, "$4.99");
        assert_eq!(converted.currency, "USD");
        assert_eq!(converted.title, "Premium (monthly)");
    }

    #[test]
    fn missing_sku_yields_empty_detail_fields() {
        let converted = PurchaseConverter::new().convert(None, &purchase());

        assert_eq!(converted.price, "");
        assert_eq!(converted.currency, "");
        assert_eq!(converted.title, "");
        assert!(!converted.has_details());
        // Auto-renewing purchase still classifies as a subscription.
        assert_eq!(converted.purchase_type, PurchaseType::Subscription);
    }

    #[test]
    fn non_renewing_purchase_without_sku_is_one_time() {
        let platform = PlatformPurchase {
            auto_renewing: false,
            ..purchase()
        };
        let converted = PurchaseConverter::new().convert(None, &platform);
        assert_eq!(converted.purchase_type, PurchaseType::OneTime);
    }

    #[test]
    fn raw_payload_is_preserved_verbatim() {
        let platform = purchase();
        let converted = PurchaseConverter::new().convert(None, &platform);
        assert_eq!(converted.original_json, platform.raw_json);
    }
}
