//! Ingestion server configuration.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Symbol used when a payload omits one.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// Shared secret expected in TradingView payloads and in the
    /// `x-webhook-secret` header of operator routes (empty = disabled).
    /// Normally supplied through `TV_WEBHOOK_SECRET`.
    #[serde(default, skip_serializing)]
    pub secret: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_symbol() -> String {
    "ETHUSDT".to_string()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            default_symbol: default_symbol(),
            secret: String::new(),
        }
    }
}

impl WebhookConfig {
    /// Check if the shared-secret check is enabled.
    pub fn auth_enabled(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Check a presented secret in constant time.
    ///
    /// Always true when auth is disabled. Both sides are MACed under the
    /// configured secret and the tags compared with `verify_slice`.
    pub fn secret_matches(&self, provided: Option<&str>) -> bool {
        if !self.auth_enabled() {
            return true;
        }
        let Some(provided) = provided else {
            return false;
        };
        let Ok(mut expected) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            return false;
        };
        let mut presented = expected.clone();
        expected.update(self.secret.as_bytes());
        presented.update(provided.as_bytes());
        let tag = expected.finalize().into_bytes();
        presented.verify_slice(&tag[..]).is_ok()
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WebhookConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.default_symbol, "ETHUSDT");
        assert!(!config.auth_enabled());
    }

    #[test]
    fn test_secret_is_never_serialized() {
        let config = WebhookConfig {
            secret: "hunter2".to_string(),
            ..WebhookConfig::default()
        };
        assert!(config.auth_enabled());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_secret_matches() {
        let open = WebhookConfig::default();
        assert!(open.secret_matches(None));
        assert!(open.secret_matches(Some("anything")));

        let guarded = WebhookConfig {
            secret: "hunter2".to_string(),
            ..WebhookConfig::default()
        };
        assert!(guarded.secret_matches(Some("hunter2")));
        assert!(!guarded.secret_matches(Some("hunter")));
        assert!(!guarded.secret_matches(Some("hunter22")));
        assert!(!guarded.secret_matches(Some("")));
        assert!(!guarded.secret_matches(None));
    }
}
