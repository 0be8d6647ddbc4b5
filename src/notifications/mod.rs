//! Web push notification delivery.
//!
//! Sends encrypted push messages (RFC 8030) from the reservation backend
//! straight to each subscriber's browser push relay, authenticated with
//! VAPID (RFC 8292). The relay never sees plaintext.
//!
//! # Pipeline
//!
//! ```text
//! Route opens for booking
//!     ↓
//! encrypt payload per recipient (ECDH + HKDF + AES-128-GCM, fresh
//! ephemeral key and salt per message)
//!     ↓
//! sign a VAPID token scoped to the recipient relay's origin
//!     ↓
//! POST ciphertext to the relay; classify the response
//!     ↓
//! aggregate counts, report dead subscriptions for cleanup
//! ```
//!
//! # Sender Identity
//!
//! One P-256 ECDSA keypair per deployment (`shuttlebus generate-keys`),
//! installed via `VAPID_PUBLIC_KEY` / `VAPID_PRIVATE_KEY_PEM`. Browsers
//! receive the public key as `applicationServerKey` when subscribing.
//! Without the private key the backend runs with push delivery disabled.

pub mod encryption;
pub mod error;
pub mod payload;
pub mod push;
pub mod vapid;
