//! Advertising-id provider contract.

/// Resolves the device advertising identifier.
///
/// The provider is an external collaborator; the engine drives `resolve`
/// on a blocking task with a bounded wait. The result is advisory:
/// failure, absence, or timeout never gates initialization.
pub trait AdvertisingIdProvider: Send + Sync {
    /// Resolves the advertising identifier. May block.
    fn resolve(&self) -> Result<String, String>;
}

/// A provider for platforms or builds where no advertising id exists.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAdvertisingIdProvider;

impl AdvertisingIdProvider for NullAdvertisingIdProvider {
    fn resolve(&self) -> Result<String, String> {
        Err("advertising id provider not available".into())
    }
}

/// A provider returning a fixed identifier. Useful for tests.
#[derive(Debug, Clone)]
pub struct FixedAdvertisingIdProvider {
    id: String,
}

impl FixedAdvertisingIdProvider {
    /// Creates a provider that always resolves to `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl AdvertisingIdProvider for FixedAdvertisingIdProvider {
    fn resolve(&self) -> Result<String, String> {
        Ok(self.id.clone())
    }
}
