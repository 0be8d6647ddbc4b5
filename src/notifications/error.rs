//! Error taxonomy for the push delivery pipeline.

use thiserror::Error;

/// Errors produced by the web push pipeline.
///
/// `KeyLoad` disables the delivery subsystem without being fatal to the
/// process. `Encryption` marks a single recipient's key material as
/// malformed (non-retryable). `Signing` aborts a whole broadcast before any
/// network attempt. `Dispatch` is a per-recipient transport fault the
/// caller may retry.
#[derive(Debug, Error)]
pub enum PushError {
    /// The sender's VAPID key material could not be parsed.
    #[error("failed to load VAPID key: {0}")]
    KeyLoad(String),

    /// The recipient's subscription key material is malformed, or the
    /// payload cannot be encrypted for it.
    #[error("payload encryption failed: {0}")]
    Encryption(String),

    /// No signing key is configured, so no message can be authenticated.
    #[error("VAPID signing unavailable: {0}")]
    Signing(String),

    /// The push relay rejected the message or could not be reached.
    #[error("push dispatch failed: {0}")]
    Dispatch(String),
}
