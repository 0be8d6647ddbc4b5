//! Web push dispatch and fan-out (RFC 8030) with VAPID authentication.
//!
//! [`WebPushClient`] runs the per-recipient pipeline — encrypt, sign,
//! POST to the subscription's push relay — and classifies each relay
//! response. [`WebPushClient::broadcast`] applies the pipeline across a
//! subscription list and reports which recipients the relay declared dead
//! so the store-owning caller can prune them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::encryption;
use super::error::PushError;
use super::payload::NotificationPayload;
use super::vapid::{relay_origin, VapidSigner};

/// Per-request network timeout bounding worst-case latency.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime of each per-send VAPID token.
const TOKEN_LIFETIME: Duration = Duration::from_secs(86_400);

/// Default `TTL` header: how long the relay may hold an undelivered message.
pub const DEFAULT_TTL: u64 = 86_400;

/// A browser's push subscription, as stored in the user record.
///
/// This is the shape the subscription JS API produces and the external
/// store persists: the relay endpoint plus the two base64url key strings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushSubscription {
    /// Push relay endpoint URL.
    pub endpoint: String,
    /// Subscription key material.
    pub keys: SubscriptionKeys,
}

/// Key material of a push subscription.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    /// Browser's P-256 ECDH public key (base64url).
    pub p256dh: String,
    /// Shared auth secret (base64url).
    pub auth: String,
}

impl PushSubscription {
    /// Build a subscription from its three field values.
    pub fn new(endpoint: String, p256dh: String, auth: String) -> Self {
        Self {
            endpoint,
            keys: SubscriptionKeys { p256dh, auth },
        }
    }

    /// Whether all three required fields are present.
    ///
    /// An incomplete subscription is never attempted; it counts as failed
    /// without a network call.
    pub fn is_complete(&self) -> bool {
        !self.endpoint.is_empty() && !self.keys.p256dh.is_empty() && !self.keys.auth.is_empty()
    }
}

/// Classification of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The relay accepted the message (200/201/202).
    Delivered,
    /// The subscription is permanently invalid (400/404/410/413 from the
    /// relay, or key material that can never encrypt). Never retry.
    Gone,
    /// Network fault or unexpected relay status. The caller may retry;
    /// this client does not.
    TransientFailure,
}

/// Aggregated result of a broadcast.
///
/// `stale_indices` are positions in the input list whose subscriptions the
/// relay declared dead; the caller owns the store and removes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastSummary {
    /// Recipients whose relay accepted the message.
    pub delivered_count: usize,
    /// Recipients that failed, transiently or permanently.
    pub failed_count: usize,
    /// Input indices of permanently dead subscriptions.
    pub stale_indices: Vec<usize>,
}

/// Sends encrypted web push messages on behalf of one sender identity.
///
/// Holds the read-only VAPID signer and a pooled HTTP client; safe to
/// share across concurrent callers.
#[derive(Debug)]
pub struct WebPushClient {
    signer: VapidSigner,
    http: reqwest::Client,
    ttl: u64,
    request_timeout: Duration,
}

impl WebPushClient {
    /// Build a client around a signer, reusing one HTTP connection pool
    /// for all sends.
    pub fn new(signer: VapidSigner, ttl: u64) -> Self {
        Self {
            signer,
            http: reqwest::Client::new(),
            ttl,
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout (tests exercise the timeout path
    /// without waiting out the production value).
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// The sender identity this client signs with.
    pub fn signer(&self) -> &VapidSigner {
        &self.signer
    }

    /// Deliver one encrypted message to one relay endpoint and classify
    /// the response.
    ///
    /// No state is mutated; the only side effect is the outbound POST.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        ciphertext: Vec<u8>,
        token: &str,
    ) -> DeliveryOutcome {
        let authorization = format!("vapid t={token}, k={}", self.signer.public_key());
        let result = self
            .http
            .post(endpoint)
            .timeout(self.request_timeout)
            .header("TTL", self.ttl.to_string())
            .header("Content-Type", "application/octet-stream")
            .header("Content-Encoding", "aes128gcm")
            .header("Authorization", authorization)
            .body(ciphertext)
            .send()
            .await;

        match result {
            Ok(response) => match response.status().as_u16() {
                200 | 201 | 202 => DeliveryOutcome::Delivered,
                status @ (400 | 404 | 410 | 413) => {
                    log::info!("[WebPush] subscription expired (HTTP {status})");
                    DeliveryOutcome::Gone
                }
                status => {
                    log::warn!("[WebPush] relay returned HTTP {status}");
                    DeliveryOutcome::TransientFailure
                }
            },
            Err(e) => {
                log::warn!("[WebPush] request to relay failed: {e}");
                DeliveryOutcome::TransientFailure
            }
        }
    }

    /// Run the full pipeline for one subscription: validate, encrypt,
    /// sign, dispatch.
    async fn send_to(&self, subscription: &PushSubscription, payload: &[u8]) -> DeliveryOutcome {
        if !subscription.is_complete() {
            log::warn!("[WebPush] subscription is missing required fields; skipping");
            return DeliveryOutcome::Gone;
        }

        let audience = match relay_origin(&subscription.endpoint) {
            Ok(audience) => audience,
            Err(e) => {
                log::warn!("[WebPush] bad endpoint URL: {e}");
                return DeliveryOutcome::Gone;
            }
        };

        let ciphertext =
            match encryption::encrypt(payload, &subscription.keys.p256dh, &subscription.keys.auth)
            {
                Ok(ciphertext) => ciphertext,
                Err(e) => {
                    log::warn!("[WebPush] {e}; treating subscription as dead");
                    return DeliveryOutcome::Gone;
                }
            };

        let token = match self.signer.build_token(&audience, TOKEN_LIFETIME) {
            Ok(token) => token,
            Err(e) => {
                log::error!("[WebPush] {e}");
                return DeliveryOutcome::TransientFailure;
            }
        };

        self.dispatch(&subscription.endpoint, ciphertext, &token).await
    }

    /// Fan the notification out to every subscription in the list.
    ///
    /// Recipients are processed sequentially; one failure never aborts the
    /// batch. Fails up front with [`PushError::Signing`] when no signing
    /// key is loaded — checked before any network traffic. An empty list
    /// returns a zero summary immediately.
    pub async fn broadcast(
        &self,
        subscriptions: &[PushSubscription],
        title: &str,
        body: &str,
        data: Option<HashMap<String, String>>,
    ) -> Result<BroadcastSummary, PushError> {
        if !self.signer.is_available() {
            return Err(PushError::Signing(
                "no VAPID private key configured".to_string(),
            ));
        }

        let mut summary = BroadcastSummary::default();
        if subscriptions.is_empty() {
            return Ok(summary);
        }

        let payload = NotificationPayload::new(title, body, data);
        let payload = serde_json::to_vec(&payload)
            .map_err(|e| PushError::Encryption(format!("payload serialization failed: {e}")))?;
        log::info!(
            "[WebPush] broadcasting {}-byte payload to {} subscriptions",
            payload.len(),
            subscriptions.len()
        );

        for (index, subscription) in subscriptions.iter().enumerate() {
            match self.send_to(subscription, &payload).await {
                DeliveryOutcome::Delivered => summary.delivered_count += 1,
                DeliveryOutcome::Gone => {
                    summary.failed_count += 1;
                    summary.stale_indices.push(index);
                }
                DeliveryOutcome::TransientFailure => summary.failed_count += 1,
            }
        }

        log::info!(
            "[WebPush] broadcast complete: {} delivered, {} failed, {} stale",
            summary.delivered_count,
            summary.failed_count,
            summary.stale_indices.len()
        );
        Ok(summary)
    }

    /// Send one notification to one subscription, surfacing the outcome as
    /// an error. Used by the operator test-send path.
    pub async fn send_one(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<(), PushError> {
        if !self.signer.is_available() {
            return Err(PushError::Signing(
                "no VAPID private key configured".to_string(),
            ));
        }
        let bytes = serde_json::to_vec(payload)
            .map_err(|e| PushError::Encryption(format!("payload serialization failed: {e}")))?;
        match self.send_to(subscription, &bytes).await {
            DeliveryOutcome::Delivered => Ok(()),
            DeliveryOutcome::Gone => Err(PushError::Dispatch(
                "subscription is no longer valid".to_string(),
            )),
            DeliveryOutcome::TransientFailure => Err(PushError::Dispatch(
                "push relay did not accept the message".to_string(),
            )),
        }
    }
}
