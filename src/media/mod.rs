//! Media module: turns a signed media link into decrypted bytes.
//!
//! The HTTP layer maps `GET /media/{id}/{kind}?token=...` onto
//! [`MediaGateway::deliver`] and writes the returned bytes and headers, or the
//! status from [`DeliveryError::status`]. No session is involved; the token is
//! the whole credential.

use base64::Engine;

use crate::capsule::MediaKind;
use crate::crypto::{self, CipherKey};
use crate::error::DeliveryError;
use crate::store::CapsuleStore;
use crate::token::TokenCodec;

/// Released content never changes, so clients may cache it for a day.
pub const MEDIA_CACHE_CONTROL: &str = "public, max-age=86400";

/// Bytes and headers for a successful media request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaResponse {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub cache_control: &'static str,
}

pub struct MediaGateway<S> {
    store: S,
    tokens: TokenCodec,
    key: CipherKey,
}

impl<S: CapsuleStore> MediaGateway<S> {
    /// `key` opens media envelopes; it may be the capsule content key or a
    /// separate media key.
    pub fn new(store: S, tokens: TokenCodec, key: CipherKey) -> Self {
        Self { store, tokens, key }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve a media request.
    ///
    /// Checks run in order: token (401), capsule and media type presence (404),
    /// stored kind against requested kind (400), payload presence (404),
    /// decryption and payload decoding (500).
    pub fn deliver(
        &self,
        capsule_id: &str,
        kind: &str,
        token: Option<&str>,
    ) -> Result<MediaResponse, DeliveryError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(DeliveryError::Unauthorized(None))?;
        self.tokens
            .check(token, capsule_id, kind)
            .map_err(|reason| DeliveryError::Unauthorized(Some(reason)))?;

        let capsule = self
            .store
            .get(capsule_id)
            .map_err(|e| {
                tracing::error!(capsule_id, error = %e, "failed to load capsule for media");
                DeliveryError::NotFound
            })?
            .ok_or(DeliveryError::NotFound)?;

        // The MAC already binds the kind; this guards a record whose kind changed
        let stored_kind = capsule.media_type.ok_or(DeliveryError::NotFound)?;
        if stored_kind.as_str() != kind {
            return Err(DeliveryError::KindMismatch {
                requested: kind.to_string(),
                stored: stored_kind.to_string(),
            });
        }

        let raw = capsule
            .media_content
            .as_deref()
            .filter(|m| !m.is_empty())
            .ok_or(DeliveryError::NotFound)?;

        let payload = if capsule.media_encrypted {
            crypto::decrypt(raw, &self.key).map_err(|e| {
                tracing::error!(capsule_id, kind = %e.kind(), error = %e, "failed to decrypt media");
                DeliveryError::Undecryptable(e.kind())
            })?
        } else {
            raw.to_string()
        };

        let bytes = decode_payload(&payload).ok_or(DeliveryError::InvalidPayload)?;
        Ok(MediaResponse {
            bytes,
            content_type: content_type_for(&payload, stored_kind),
            cache_control: MEDIA_CACHE_CONTROL,
        })
    }
}

/// Declared MIME of a `data:` URI payload, if any.
pub fn data_uri_mime(payload: &str) -> Option<&str> {
    let rest = payload.strip_prefix("data:")?;
    let end = rest.find(|c: char| c == ';' || c == ',')?;
    let mime = &rest[..end];
    (!mime.is_empty() && mime.contains('/')).then_some(mime)
}

/// Content type for a decrypted payload: the declared MIME of a data URI,
/// otherwise the default for the media kind.
pub fn content_type_for(payload: &str, kind: MediaKind) -> String {
    data_uri_mime(payload)
        .unwrap_or(kind.default_content_type())
        .to_string()
}

/// Raw media bytes: the part after `;base64,` for data URIs, else the whole
/// payload, base64-decoded.
pub fn decode_payload(payload: &str) -> Option<Vec<u8>> {
    let b64 = match payload.split_once(";base64,") {
        Some((_, data)) => data,
        None => payload,
    };
    base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .ok()
}
