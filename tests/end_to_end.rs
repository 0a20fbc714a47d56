/// End-to-end scenario: seal with one key, fail with another, then hand out a
/// photo link that works for photos only.
use std::time::Duration;

use capsule_seal::crypto::{decrypt, encrypt, CipherKey};
use capsule_seal::error::EnvelopeError;
use capsule_seal::token::{TokenCodec, DEFAULT_MEDIA_TOKEN_TTL};

#[test]
fn test_seal_then_share_scenario() {
    let k1 = CipherKey::from_secret("k1");
    let k2 = CipherKey::from_secret("k2");

    let e1 = encrypt("hello world", &k1).expect("encrypt with k1");
    assert_eq!(decrypt(&e1, &k1).unwrap(), "hello world");
    assert_eq!(decrypt(&e1, &k2).unwrap_err(), EnvelopeError::IntegrityFailure);

    let codec = TokenCodec::new("media-token-secret");
    assert_eq!(DEFAULT_MEDIA_TOKEN_TTL, Duration::from_secs(7 * 24 * 3600));
    let t1 = codec.issue("abc123", "photo", DEFAULT_MEDIA_TOKEN_TTL).to_string();

    assert!(codec.verify(&t1, "abc123", "photo"));
    assert!(!codec.verify(&t1, "abc123", "video"));
}
