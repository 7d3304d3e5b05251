//! Billing-adapter collaborator contract.
//!
//! The engine never owns purchase acquisition. A billing adapter delivers
//! `(SKU metadata, platform purchase)` pairs over a bounded channel; the
//! session spawns exactly one consumer per channel and reacts to each
//! notification by converting and submitting the purchase.

use tokio::sync::mpsc;

/// SKU metadata for a product, as reported by the platform billing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuDetails {
    /// The product identifier.
    pub product_id: String,
    /// Display price, e.g. `"$4.99"`.
    pub price: String,
    /// ISO currency code.
    pub currency: String,
    /// Product title.
    pub title: String,
    /// Whether the product is a subscription.
    pub is_subscription: bool,
}

/// A purchase receipt as delivered by the platform billing API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPurchase {
    /// The product identifier.
    pub product_id: String,
    /// The opaque platform purchase token.
    pub purchase_token: String,
    /// Purchase time in Unix milliseconds.
    pub purchase_time_ms: u64,
    /// Whether the purchase auto-renews (subscriptions).
    pub auto_renewing: bool,
    /// The raw platform payload, verbatim.
    pub raw_json: String,
}

/// A "purchase ready" notification from the billing adapter.
///
/// SKU metadata may be absent when the metadata lookup failed or raced the
/// purchase callback; submission proceeds either way.
#[derive(Debug, Clone)]
pub struct PurchaseReady {
    /// SKU metadata for the purchased product, if available.
    pub sku: Option<SkuDetails>,
    /// The purchase receipt.
    pub purchase: PlatformPurchase,
}

/// Receiving half of a billing-event channel.
pub type BillingReceiver = mpsc::Receiver<PurchaseReady>;

/// Creates a bounded billing-event channel.
///
/// The sender side is handed to the billing adapter; the receiver side is
/// passed to [`crate::session::Collaborators::with_billing`].
pub fn billing_channel(capacity: usize) -> (mpsc::Sender<PurchaseReady>, BillingReceiver) {
    mpsc::channel(capacity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_delivers_notifications() {
        let (tx, mut rx) = billing_channel(4);

        let ready = PurchaseReady {
            sku: None,
            purchase: PlatformPurchase {
                product_id: "coins_100".into(),
                purchase_token: "tok-1".into(),
                purchase_time_ms: 1,
                auto_renewing: false,
                raw_json: "{}".into(),
            },
        };

        tx.send(ready.clone()).await.unwrap();
        drop(tx);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.purchase.purchase_token, "tok-1");
        assert!(rx.recv().await.is_none());
    }
}
