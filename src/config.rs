//! Environment-driven configuration.
//!
//! Everything the notification core needs arrives via environment
//! variables, the same contract the deployment scripts install:
//! `VAPID_PUBLIC_KEY`, `VAPID_PRIVATE_KEY_PEM`, and optionally
//! `VAPID_SUBJECT` and `PUSH_TTL`. A missing private key is not an error;
//! it leaves push delivery disabled while the rest of the backend runs.

/// Default sender contact identifier for VAPID claims.
const DEFAULT_SUBJECT: &str = "mailto:admin@schoolbus.com";

/// Default relay retention for undelivered messages (24 hours).
const DEFAULT_TTL: u64 = 86_400;

/// Configuration for the notification core.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base64url uncompressed VAPID public key, sent to browsers and in
    /// the `k=` authorization parameter.
    pub vapid_public_key: Option<String>,
    /// PEM-encoded VAPID private key. `None` disables push delivery.
    pub vapid_private_key_pem: Option<String>,
    /// Sender contact identifier used as the token `sub` claim.
    pub vapid_subject: String,
    /// `TTL` header value for outbound push messages, in seconds.
    pub push_ttl: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vapid_public_key: None,
            vapid_private_key_pem: None,
            vapid_subject: DEFAULT_SUBJECT.to_string(),
            push_ttl: DEFAULT_TTL,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("VAPID_PUBLIC_KEY") {
            if !key.is_empty() {
                self.vapid_public_key = Some(key);
            }
        }

        if let Ok(pem) = std::env::var("VAPID_PRIVATE_KEY_PEM") {
            if !pem.is_empty() {
                self.vapid_private_key_pem = Some(pem);
            }
        }

        if let Ok(subject) = std::env::var("VAPID_SUBJECT") {
            if !subject.is_empty() {
                self.vapid_subject = subject;
            }
        }

        if let Ok(ttl) = std::env::var("PUSH_TTL") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.push_ttl = ttl;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.vapid_public_key.is_none());
        assert!(config.vapid_private_key_pem.is_none());
        assert_eq!(config.vapid_subject, "mailto:admin@schoolbus.com");
        assert_eq!(config.push_ttl, 86_400);
    }
}
