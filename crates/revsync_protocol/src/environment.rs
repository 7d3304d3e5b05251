//! Device/application environment snapshot.

use serde::{Deserialize, Serialize};

/// A snapshot of the host application's environment, attached to
/// token-obtain and properties requests.
///
/// All fields are optional; an empty environment is valid. The engine never
/// interprets these values, it only forwards them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    /// Host application version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
    /// Operating system name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Operating system version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
    /// Device model identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_model: Option<String>,
    /// BCP-47 locale tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Environment {
    /// Creates an empty environment snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the application version.
    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    /// Sets the operating system name and version.
    pub fn with_os(mut self, os: impl Into<String>, version: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self.os_version = Some(version.into());
        self
    }

    /// Sets the device model.
    pub fn with_device_model(mut self, model: impl Into<String>) -> Self {
        self.device_model = Some(model.into());
        self
    }

    /// Sets the locale tag.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_json;

    #[test]
    fn empty_environment_serializes_to_empty_object() {
        let bytes = encode_json(&Environment::new()).unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[test]
    fn builder_sets_fields() {
        let env = Environment::new()
            .with_app_version("3.1.0")
            .with_os("android", "14")
            .with_device_model("Pixel 8")
            .with_locale("en-US");

        assert_eq!(env.app_version.as_deref(), Some("3.1.0"));
        assert_eq!(env.os.as_deref(), Some("android"));
        assert_eq!(env.os_version.as_deref(), Some("14"));
        assert_eq!(env.device_model.as_deref(), Some("Pixel 8"));
        assert_eq!(env.locale.as_deref(), Some("en-US"));
    }
}
