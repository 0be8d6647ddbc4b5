//! Push message content encryption (RFC 8291, `aes128gcm` coding).
//!
//! Binds each message to exactly one recipient: a fresh ephemeral P-256
//! keypair is agreed against the subscription's `p256dh` key, and the
//! shared secret is stretched through HKDF-SHA256 together with the
//! subscription's `auth` secret and a random 16-byte salt. The payload is
//! then sealed with AES-128-GCM. The relay forwards the blob unread.
//!
//! # Wire Format
//!
//! A single self-describing binary blob:
//!
//! ```text
//! salt (16) || record size (4, big-endian) || key id length (1) ||
//! ephemeral public key (65, uncompressed SEC1) || encrypted record
//! ```
//!
//! The encrypted record is the AES-128-GCM ciphertext of
//! `plaintext || 0x02 || 0x00 * 7` (the last-record padding delimiter
//! followed by a fixed zero pad).

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes128Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL, Engine};
use hkdf::Hkdf;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::rand_core::OsRng;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::PublicKey;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use super::error::PushError;

/// Salt length fixed by the content coding.
const SALT_LEN: usize = 16;

/// Record size advertised in the header. All payloads fit one record.
const RECORD_SIZE: u32 = 4096;

/// AES-GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Subscription auth secrets decode to exactly 16 bytes.
const AUTH_SECRET_LEN: usize = 16;

/// Uncompressed SEC1 point length (0x04 || x || y).
const PUBLIC_KEY_LEN: usize = 65;

/// Last-record delimiter octet plus fixed zero padding.
const PAD_BLOCK: [u8; 8] = [0x02, 0, 0, 0, 0, 0, 0, 0];

/// HKDF info for deriving the input keying material (RFC 8291 §3.3).
const KEY_INFO_LABEL: &[u8] = b"WebPush: info\0";

/// HKDF info for the content-encryption key (RFC 8188 §2.2).
const CEK_INFO: &[u8] = b"Content-Encoding: aes128gcm\0";

/// HKDF info for the nonce (RFC 8188 §2.3).
const NONCE_INFO: &[u8] = b"Content-Encoding: nonce\0";

/// Encrypt `plaintext` for the subscription identified by its base64url
/// `p256dh` public key and `auth` secret.
///
/// Every call generates a fresh ephemeral keypair and salt, so encrypting
/// the same plaintext twice produces different blobs. Malformed key
/// material fails with [`PushError::Encryption`]; the caller treats that
/// as a dead subscription, not a transient fault.
pub fn encrypt(plaintext: &[u8], p256dh: &str, auth: &str) -> Result<Vec<u8>, PushError> {
    let recipient_pub_bytes = decode_b64url("p256dh", p256dh)?;
    if recipient_pub_bytes.len() != PUBLIC_KEY_LEN {
        return Err(PushError::Encryption(format!(
            "p256dh must decode to a {PUBLIC_KEY_LEN}-byte uncompressed point, got {} bytes",
            recipient_pub_bytes.len()
        )));
    }
    let recipient_key = PublicKey::from_sec1_bytes(&recipient_pub_bytes).map_err(|_| {
        PushError::Encryption("p256dh is not a valid point on the P-256 curve".to_string())
    })?;

    let auth_secret = decode_b64url("auth", auth)?;
    if auth_secret.len() != AUTH_SECRET_LEN {
        return Err(PushError::Encryption(format!(
            "auth secret must decode to {AUTH_SECRET_LEN} bytes, got {}",
            auth_secret.len()
        )));
    }

    let record_len = plaintext.len() + PAD_BLOCK.len();
    if record_len + TAG_LEN > RECORD_SIZE as usize {
        return Err(PushError::Encryption(format!(
            "payload of {} bytes exceeds the single-record limit",
            plaintext.len()
        )));
    }

    // Fresh ephemeral key and salt, scoped to this one message
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_pub = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(&recipient_key);

    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);

    let (cek, nonce) = derive_keys(
        shared.raw_secret_bytes().as_slice(),
        &auth_secret,
        &recipient_pub_bytes,
        ephemeral_pub.as_bytes(),
        &salt,
    )?;

    let cipher = Aes128Gcm::new_from_slice(&*cek)
        .map_err(|_| PushError::Encryption("invalid content-encryption key length".to_string()))?;
    let mut record = Vec::with_capacity(record_len);
    record.extend_from_slice(plaintext);
    record.extend_from_slice(&PAD_BLOCK);
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), record.as_ref())
        .map_err(|_| PushError::Encryption("AES-128-GCM encryption failed".to_string()))?;

    let mut blob = Vec::with_capacity(SALT_LEN + 4 + 1 + PUBLIC_KEY_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    blob.push(PUBLIC_KEY_LEN as u8);
    blob.extend_from_slice(ephemeral_pub.as_bytes());
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// RFC 8291 key schedule: ECDH secret + auth secret -> IKM, then
/// salt-keyed extract/expand for the 16-byte CEK and 12-byte nonce.
fn derive_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    recipient_pub: &[u8],
    ephemeral_pub: &[u8],
    salt: &[u8],
) -> Result<(Zeroizing<[u8; 16]>, [u8; 12]), PushError> {
    let mut key_info = Vec::with_capacity(KEY_INFO_LABEL.len() + 2 * PUBLIC_KEY_LEN);
    key_info.extend_from_slice(KEY_INFO_LABEL);
    key_info.extend_from_slice(recipient_pub);
    key_info.extend_from_slice(ephemeral_pub);

    let expand_err = |what: &str| PushError::Encryption(format!("HKDF expand failed for {what}"));

    let mut ikm = Zeroizing::new([0u8; 32]);
    Hkdf::<Sha256>::new(Some(auth_secret), ecdh_secret)
        .expand(&key_info, &mut *ikm)
        .map_err(|_| expand_err("input keying material"))?;

    let hk = Hkdf::<Sha256>::new(Some(salt), &*ikm);
    let mut cek = Zeroizing::new([0u8; 16]);
    hk.expand(CEK_INFO, &mut *cek)
        .map_err(|_| expand_err("content-encryption key"))?;
    let mut nonce = [0u8; 12];
    hk.expand(NONCE_INFO, &mut nonce)
        .map_err(|_| expand_err("nonce"))?;

    Ok((cek, nonce))
}

fn decode_b64url(label: &str, value: &str) -> Result<Vec<u8>, PushError> {
    BASE64URL
        .decode(value.trim_end_matches('='))
        .map_err(|_| PushError::Encryption(format!("{label} is not valid base64url")))
}
