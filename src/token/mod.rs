//! Token module: stateless, HMAC-signed media access tokens.
//!
//! A token grants bearer access to exactly one (capsule id, media kind) pair
//! until its embedded expiry:
//!
//! ```text
//! token   = "{expiry_ms}.{hex(HMAC-SHA256(secret, signing))}"
//! signing = "{resource_id}:{kind}:{expiry_ms}"
//! ```
//!
//! Nothing is stored server-side. Expiry is the only revocation mechanism.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use zeroize::Zeroizing;

use crate::crypto::digest;
use crate::error::TokenRejection;
use crate::util::now_millis;

/// Default lifetime of a media link (7 days).
pub const DEFAULT_MEDIA_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Hex length of an HMAC-SHA256 digest.
const MAC_HEX_LEN: usize = 64;

/// A parsed media access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaToken {
    /// Unix epoch milliseconds after which the token is rejected.
    pub expires_at_ms: u64,
    /// Lowercase hex HMAC over the signing string.
    pub mac: String,
}

impl fmt::Display for MediaToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.expires_at_ms, self.mac)
    }
}

impl FromStr for MediaToken {
    type Err = TokenRejection;

    /// Split on the first `.`: digits before it, 64 hex chars after it.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (expiry, mac) = s.split_once('.').ok_or(TokenRejection::Malformed)?;
        if expiry.is_empty() || !expiry.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenRejection::Malformed);
        }
        let expires_at_ms = expiry.parse::<u64>().map_err(|_| TokenRejection::Malformed)?;
        if mac.len() != MAC_HEX_LEN || !mac.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(TokenRejection::Malformed);
        }
        Ok(MediaToken {
            expires_at_ms,
            mac: mac.to_ascii_lowercase(),
        })
    }
}

/// Issues and checks media tokens under one server secret.
///
/// The secret is used as the raw HMAC key. It is a different secret from the
/// capsule cipher key.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenCodec(..)")
    }
}

fn signing_string(resource_id: &str, kind: &str, expires_at_ms: u64) -> String {
    format!("{}:{}:{}", resource_id, kind, expires_at_ms)
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
        }
    }

    /// First 8 hex chars of SHA-256 over the secret.
    pub fn fingerprint(&self) -> String {
        digest::sha256_hex(&self.secret)[..8].to_string()
    }

    /// Issue a token valid for `ttl` from now.
    pub fn issue(&self, resource_id: &str, kind: &str, ttl: Duration) -> MediaToken {
        self.issue_at(resource_id, kind, ttl, now_millis())
    }

    /// Issue a token valid for `ttl` from `now_ms`.
    pub fn issue_at(&self, resource_id: &str, kind: &str, ttl: Duration, now_ms: u64) -> MediaToken {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let expires_at_ms = now_ms.saturating_add(ttl_ms);
        let mac = digest::hmac_sha256_hex(
            &self.secret,
            signing_string(resource_id, kind, expires_at_ms).as_bytes(),
        );
        MediaToken { expires_at_ms, mac }
    }

    /// Check `token` against the wall clock.
    pub fn check(&self, token: &str, resource_id: &str, kind: &str) -> Result<(), TokenRejection> {
        self.check_at(token, resource_id, kind, now_millis())
    }

    /// Check `token` for (`resource_id`, `kind`) at time `now_ms`.
    ///
    /// Order: parse, expiry, then a constant-time MAC comparison against the
    /// signing string rebuilt from the claimed expiry. A token expires strictly
    /// after its expiry instant.
    pub fn check_at(
        &self,
        token: &str,
        resource_id: &str,
        kind: &str,
        now_ms: u64,
    ) -> Result<(), TokenRejection> {
        let result = self.classify(token, resource_id, kind, now_ms);
        if let Err(reason) = result {
            tracing::warn!(
                resource_id,
                kind,
                reason = ?reason,
                "media token rejected"
            );
        }
        result
    }

    fn classify(
        &self,
        token: &str,
        resource_id: &str,
        kind: &str,
        now_ms: u64,
    ) -> Result<(), TokenRejection> {
        let parsed: MediaToken = token.parse()?;
        if now_ms > parsed.expires_at_ms {
            return Err(TokenRejection::Expired);
        }
        let signing = signing_string(resource_id, kind, parsed.expires_at_ms);
        if !digest::verify_hmac_sha256_hex(&self.secret, signing.as_bytes(), &parsed.mac) {
            return Err(TokenRejection::Forged);
        }
        Ok(())
    }

    /// Boolean form of [`TokenCodec::check`].
    pub fn verify(&self, token: &str, resource_id: &str, kind: &str) -> bool {
        self.check(token, resource_id, kind).is_ok()
    }
}

/// Public URL for one capsule's media, carrying `token` as a query parameter.
pub fn media_url(base_url: &str, resource_id: &str, kind: &str, token: &MediaToken) -> String {
    format!(
        "{}/media/{}/{}?token={}",
        base_url.trim_end_matches('/'),
        resource_id,
        kind,
        token
    )
}
