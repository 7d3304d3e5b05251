//! Server configuration.

/// Configuration for the analytics server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The access key clients must present.
    pub access_key: String,
    /// Maximum number of properties accepted per report.
    pub max_batch: u32,
    /// Whether client uids are verified against the minting signature.
    pub verify_tokens: bool,
    /// Secret key for uid signing.
    pub auth_secret: Vec<u8>,
}

impl ServerConfig {
    /// Creates a new server configuration for the given access key.
    pub fn new(access_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            max_batch: 100,
            verify_tokens: true,
            auth_secret: b"revsync-dev-secret".to_vec(),
        }
    }

    /// Sets the maximum properties per report.
    pub fn with_max_batch(mut self, max: u32) -> Self {
        self.max_batch = max;
        self
    }

    /// Disables or enables uid verification.
    pub fn with_verify_tokens(mut self, verify: bool) -> Self {
        self.verify_tokens = verify;
        self
    }

    /// Sets the uid signing secret.
    pub fn with_auth_secret(mut self, secret: Vec<u8>) -> Self {
        self.auth_secret = secret;
        self
    }
}
