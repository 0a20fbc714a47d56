//! Crypto module: the envelope cipher and the static capsule key.
//!
//! Every sealed field is AES-256-GCM ciphertext under one configured key. The
//! cipher uses a 16-byte IV (GCM with a 128-bit nonce) and a detached 16-byte
//! tag, which keeps it byte-compatible with envelopes already at rest.
//! Nothing here holds state between calls: each function
//! is a pure function of its arguments, so callers may run them on any thread.

pub mod digest;

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Key, Nonce, Tag};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::envelope::{self, IV_LEN, TAG_LEN};
use crate::error::EnvelopeError;

/// AES-256-GCM with a 16-byte nonce.
type CapsuleCipher = AesGcm<Aes256, U16>;

/// Normalized key length (AES-256).
pub const KEY_LEN: usize = 32;

/// Byte used to right-pad configured secrets shorter than [`KEY_LEN`].
pub const KEY_PAD: u8 = b' ';

/// The 32-byte key that seals capsule content.
///
/// Built once from configuration and passed explicitly to every call. Key bytes
/// are zeroed on drop and never appear in `Debug` output.
#[derive(Clone)]
pub struct CipherKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl CipherKey {
    /// Normalize a configured secret: first 32 UTF-8 bytes, right-padded with spaces.
    ///
    /// The result is deterministic, so the same secret string always opens the
    /// same envelopes.
    pub fn from_secret(secret: &str) -> Self {
        let mut bytes = Zeroizing::new([KEY_PAD; KEY_LEN]);
        let src = secret.as_bytes();
        let n = src.len().min(KEY_LEN);
        bytes[..n].copy_from_slice(&src[..n]);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    /// First 8 hex chars of SHA-256 over the normalized key.
    ///
    /// Lets two deployments be compared for "same key?" without exposing it.
    pub fn fingerprint(&self) -> String {
        digest::sha256_hex(&self.bytes[..])[..8].to_string()
    }

    fn cipher(&self) -> CapsuleCipher {
        CapsuleCipher::new(Key::<CapsuleCipher>::from_slice(&self.bytes[..]))
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CipherKey({})", self.fingerprint())
    }
}

/// Encrypt UTF-8 text into a current-format envelope.
///
/// A fresh IV is drawn from the thread-local CSPRNG on every call; there is no
/// way for a caller to supply one. Empty plaintext is refused because its
/// envelope would carry an empty ciphertext component.
pub fn encrypt(plaintext: &str, key: &CipherKey) -> Result<String, EnvelopeError> {
    encrypt_bytes(plaintext.as_bytes(), key)
}

/// Encrypt raw bytes into a current-format envelope.
pub fn encrypt_bytes(plaintext: &[u8], key: &CipherKey) -> Result<String, EnvelopeError> {
    if plaintext.is_empty() {
        return Err(EnvelopeError::EmptyInput);
    }

    let iv: [u8; IV_LEN] = rand::thread_rng().gen();
    let mut buffer = plaintext.to_vec();
    let tag = key
        .cipher()
        .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| EnvelopeError::EncryptionFailed)?;

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(envelope::join_current(&iv, &tag_bytes, &buffer))
}

/// Serialize `value` as compact JSON, then encrypt it.
///
/// [`decrypt_json`] with the same type is the exact inverse.
pub fn encrypt_json<T: Serialize + ?Sized>(value: &T, key: &CipherKey) -> Result<String, EnvelopeError> {
    let json = serde_json::to_string(value).map_err(|_| EnvelopeError::EncryptionFailed)?;
    encrypt(&json, key)
}

/// Decrypt an envelope of either format back to raw bytes.
///
/// All-or-nothing: a tag mismatch (wrong key or tampering) is
/// [`EnvelopeError::IntegrityFailure`] and no plaintext is returned.
pub fn decrypt_bytes(envelope: &str, key: &CipherKey) -> Result<Vec<u8>, EnvelopeError> {
    let parts = envelope::parse(envelope)?;
    tracing::debug!(
        format = parts.format.as_str(),
        len = envelope.len(),
        "parsed envelope"
    );
    let decoded = parts.decode()?;

    let mut buffer = decoded.ciphertext;
    key.cipher()
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&decoded.iv),
            b"",
            &mut buffer,
            Tag::from_slice(&decoded.tag),
        )
        .map_err(|_| EnvelopeError::IntegrityFailure)?;

    Ok(buffer)
}

/// Decrypt an envelope to UTF-8 text.
pub fn decrypt(envelope: &str, key: &CipherKey) -> Result<String, EnvelopeError> {
    let bytes = decrypt_bytes(envelope, key)?;
    String::from_utf8(bytes)
        .map_err(|e| EnvelopeError::DeserializationFailed(format!("plaintext is not UTF-8: {}", e)))
}

/// Decrypt an envelope and deserialize the plaintext as JSON.
pub fn decrypt_json<T: DeserializeOwned>(envelope: &str, key: &CipherKey) -> Result<T, EnvelopeError> {
    let text = decrypt(envelope, key)?;
    serde_json::from_str(&text).map_err(|e| EnvelopeError::DeserializationFailed(e.to_string()))
}

/// Decrypt a field read from a JSON document.
///
/// Only string values can hold an envelope; `null` counts as empty input and
/// any other type is rejected by name.
pub fn decrypt_value(value: &serde_json::Value, key: &CipherKey) -> Result<String, EnvelopeError> {
    use serde_json::Value;

    match value {
        Value::String(s) => decrypt(s, key),
        Value::Null => Err(EnvelopeError::EmptyInput),
        Value::Bool(_) => Err(EnvelopeError::NotAString("boolean")),
        Value::Number(_) => Err(EnvelopeError::NotAString("number")),
        Value::Array(_) => Err(EnvelopeError::NotAString("array")),
        Value::Object(_) => Err(EnvelopeError::NotAString("object")),
    }
}
