//! VAPID key management and token signing for Web Push (RFC 8292).
//!
//! The sender identity is a P-256 ECDSA keypair plus a contact subject
//! (`mailto:` style). Keys are generated once by the operator, installed
//! via environment variables, and loaded read-only at startup. A missing
//! private key leaves the signer in a degraded send-disabled state rather
//! than failing the process.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use p256::SecretKey;
use std::fmt;
use std::time::Duration;
use zeroize::Zeroizing;

use super::error::PushError;
use crate::config::Config;

/// Push relays reject tokens valid for longer than 24 hours.
const MAX_TOKEN_LIFETIME: Duration = Duration::from_secs(86_400);

/// Uncompressed SEC1 point length (0x04 || x || y).
const PUBLIC_KEY_LEN: usize = 65;

/// Freshly generated VAPID keypair, ready to install in the environment.
///
/// The private key is serialized as an unencrypted PKCS#8 PEM block (what
/// `VAPID_PRIVATE_KEY_PEM` holds); the public key as the base64url-encoded
/// uncompressed SEC1 point browsers expect as `applicationServerKey`.
#[derive(Debug)]
pub struct VapidKeys {
    private_key_pem: Zeroizing<String>,
    public_key_b64: String,
}

impl VapidKeys {
    /// Generate a fresh P-256 keypair.
    pub fn generate() -> Result<Self, PushError> {
        let secret = SecretKey::random(&mut OsRng);
        let public_bytes = secret.public_key().to_encoded_point(false);

        let private_key_pem = secret
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| PushError::KeyLoad(format!("PKCS#8 encoding failed: {e}")))?;

        Ok(Self {
            private_key_pem,
            public_key_b64: BASE64URL.encode(public_bytes.as_bytes()),
        })
    }

    /// Unencrypted PKCS#8 PEM block holding the private key.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// Base64url-encoded uncompressed public key (65 bytes decoded).
    pub fn public_key_base64url(&self) -> &str {
        &self.public_key_b64
    }
}

/// Holds the sender's signing key and produces VAPID authorization tokens.
///
/// Constructed once at startup and shared read-only across the pipeline.
/// When no private key is configured the signer reports itself unavailable
/// and every signing attempt fails with [`PushError::Signing`]; callers
/// check [`VapidSigner::is_available`] before starting a broadcast.
pub struct VapidSigner {
    signing_key: Option<SigningKey>,
    public_key_b64: String,
    subject: String,
}

impl VapidSigner {
    /// Load the signer from PEM private key material and the base64url
    /// public key string.
    ///
    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) or SEC1 (`BEGIN EC PRIVATE KEY`)
    /// PEM. An empty `public_key_b64` derives the public key from the
    /// private key instead.
    pub fn load(pem: &str, public_key_b64: &str, subject: &str) -> Result<Self, PushError> {
        let signing_key = match SigningKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(_) => {
                let secret = SecretKey::from_sec1_pem(pem).map_err(|_| {
                    PushError::KeyLoad(
                        "PEM is not a valid PKCS#8 or SEC1 P-256 private key".to_string(),
                    )
                })?;
                SigningKey::from(secret)
            }
        };

        let public_key_b64 = if public_key_b64.is_empty() {
            let point = signing_key.verifying_key().to_encoded_point(false);
            BASE64URL.encode(point.as_bytes())
        } else {
            // Reject a public key that is not a 65-byte uncompressed point
            let decoded = BASE64URL
                .decode(public_key_b64.trim_end_matches('='))
                .map_err(|_| {
                    PushError::KeyLoad("public key is not valid base64url".to_string())
                })?;
            if decoded.len() != PUBLIC_KEY_LEN || decoded[0] != 0x04 {
                return Err(PushError::KeyLoad(
                    "public key must be a 65-byte uncompressed P-256 point".to_string(),
                ));
            }
            public_key_b64.to_string()
        };

        Ok(Self {
            signing_key: Some(signing_key),
            public_key_b64,
            subject: subject.to_string(),
        })
    }

    /// A signer with no private key. Sending is disabled; signing attempts
    /// fail with [`PushError::Signing`].
    pub fn disabled(public_key_b64: &str, subject: &str) -> Self {
        Self {
            signing_key: None,
            public_key_b64: public_key_b64.to_string(),
            subject: subject.to_string(),
        }
    }

    /// Build the signer from loaded configuration.
    ///
    /// A missing or unparseable private key logs and degrades to a disabled
    /// signer; the reservation backend keeps serving bookings either way.
    pub fn from_config(config: &Config) -> Self {
        let public = config.vapid_public_key.as_deref().unwrap_or("");
        match &config.vapid_private_key_pem {
            Some(pem) => match Self::load(pem, public, &config.vapid_subject) {
                Ok(signer) => {
                    log::info!("[WebPush] VAPID key loaded");
                    signer
                }
                Err(e) => {
                    log::error!("[WebPush] VAPID key load failed: {e}");
                    Self::disabled(public, &config.vapid_subject)
                }
            },
            None => {
                log::warn!(
                    "[WebPush] VAPID_PRIVATE_KEY_PEM not set; push delivery disabled"
                );
                Self::disabled(public, &config.vapid_subject)
            }
        }
    }

    /// Whether a private key is loaded and messages can be signed.
    pub fn is_available(&self) -> bool {
        self.signing_key.is_some()
    }

    /// Base64url public key string sent in the `k=` authorization parameter.
    pub fn public_key(&self) -> &str {
        &self.public_key_b64
    }

    /// Sender contact identifier used as the token `sub` claim.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// ECDSA-sign `message` with SHA-256, returning the raw 64-byte r‖s
    /// signature JOSE expects (not DER).
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, PushError> {
        let key = self
            .signing_key
            .as_ref()
            .ok_or_else(|| PushError::Signing("no VAPID private key configured".to_string()))?;
        let signature: Signature = key.sign(message);
        Ok(signature.to_bytes().as_slice().to_vec())
    }

    /// Build a compact ES256 JWT scoped to one relay origin.
    ///
    /// Claims: `aud` = the relay origin, `exp` = now + `lifetime` (clamped
    /// to 24 h), `sub` = the sender subject. Each part is base64url without
    /// padding, joined by dots.
    pub fn build_token(&self, audience: &str, lifetime: Duration) -> Result<String, PushError> {
        if !self.is_available() {
            return Err(PushError::Signing(
                "no VAPID private key configured".to_string(),
            ));
        }

        let lifetime = lifetime.min(MAX_TOKEN_LIFETIME);
        let exp = chrono::Utc::now().timestamp() + lifetime.as_secs() as i64;

        let header = serde_json::json!({"alg": "ES256", "typ": "JWT"});
        let claims = serde_json::json!({
            "aud": audience,
            "exp": exp,
            "sub": self.subject,
        });

        let encode = |value: &serde_json::Value| -> Result<String, PushError> {
            let bytes = serde_json::to_vec(value)
                .map_err(|e| PushError::Signing(format!("claims serialization failed: {e}")))?;
            Ok(BASE64URL.encode(bytes))
        };

        let message = format!("{}.{}", encode(&header)?, encode(&claims)?);
        let signature = self.sign(message.as_bytes())?;

        Ok(format!("{message}.{}", BASE64URL.encode(signature)))
    }
}

impl fmt::Debug for VapidSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidSigner")
            .field("available", &self.is_available())
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Origin (`scheme://host[:port]`) of a push endpoint URL, used as the
/// token audience. Default ports are omitted, matching URL normalization
/// on the relay side.
pub(crate) fn relay_origin(endpoint: &str) -> Result<String, PushError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|_| PushError::Dispatch("endpoint is not a valid URL".to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| PushError::Dispatch("endpoint URL has no host".to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    })
}
