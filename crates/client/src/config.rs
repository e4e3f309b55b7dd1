//! Client configuration

use serde::{Deserialize, Serialize};

/// Default acknowledgement window size for writers
pub const DEFAULT_MAX_INFLIGHT_APPENDS: usize = 16;

fn default_max_inflight_appends() -> usize {
    DEFAULT_MAX_INFLIGHT_APPENDS
}

/// Connection settings for a stream client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Controller endpoint, e.g. `tcp://127.0.0.1:9090`
    pub controller_uri: String,

    /// Enable credential exchange with the controller
    #[serde(default)]
    pub auth_enabled: bool,

    /// Enable TLS on all connections
    #[serde(default)]
    pub tls_enabled: bool,

    /// Skip server certificate verification. Testing only.
    #[serde(default)]
    pub disable_cert_verification: bool,

    /// Acknowledgement window size for writers created by this client
    #[serde(default = "default_max_inflight_appends")]
    pub max_inflight_appends: usize,
}

impl ClientConfig {
    pub fn new(controller_uri: impl Into<String>) -> Self {
        Self {
            controller_uri: controller_uri.into(),
            auth_enabled: false,
            tls_enabled: false,
            disable_cert_verification: false,
            max_inflight_appends: DEFAULT_MAX_INFLIGHT_APPENDS,
        }
    }

    /// Enable credential exchange.
    pub fn with_auth(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    /// Enable TLS, optionally skipping certificate verification.
    pub fn with_tls(mut self, enabled: bool, disable_cert_verification: bool) -> Self {
        self.tls_enabled = enabled;
        self.disable_cert_verification = disable_cert_verification;
        self
    }

    /// Set the writer acknowledgement window size. Clamped to at least 1.
    pub fn with_max_inflight_appends(mut self, max: usize) -> Self {
        self.max_inflight_appends = max.max(1);
        self
    }
}
