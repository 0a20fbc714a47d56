/// Integration tests: envelope round trips through every public path.
///
/// Tests cover:
///   1. Text round trip with the configured key
///   2. Legacy ':' envelopes open with the same key
///   3. A different key is rejected as an integrity failure, not garbage
///   4. Structured (JSON) values round trip
///   5. The write hook and safe projection agree end to end
///
/// All tests are plain `#[test]`: no async, no network access.

use capsule_seal::capsule::{self, Capsule, DecryptionHealth, FieldValue, MediaKind};
use capsule_seal::crypto::{decrypt, decrypt_json, encrypt, encrypt_json, CipherKey};
use capsule_seal::envelope::{self, EnvelopeFormat};
use capsule_seal::error::{EnvelopeError, ErrorKind};
use capsule_seal::store::{CapsuleStore, MemoryStore};
use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

fn key_a() -> CipherKey {
    CipherKey::from_secret("k1")
}

fn key_b() -> CipherKey {
    CipherKey::from_secret("k2")
}

fn release() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2035, 3, 14, 15, 9, 26).unwrap()
}

// ── Test 1: Text round trip ──────────────────────────────────────────────

#[test]
fn test_text_round_trip() {
    let sealed = encrypt("hello world", &key_a()).expect("encrypt should succeed");
    assert_eq!(sealed.matches('.').count(), 2, "current format has two separators");
    assert!(!sealed.contains(':'));

    let opened = decrypt(&sealed, &key_a()).expect("decrypt should succeed with the same key");
    assert_eq!(opened, "hello world");
}

// ── Test 2: Legacy format ──────────────────────────────────────────────────

/// Base64 never contains '.' or ':', so swapping separators yields the legacy
/// form of the same envelope.
#[test]
fn test_legacy_envelope_opens() {
    let sealed = encrypt("hello world", &key_a()).unwrap();
    let legacy = sealed.replace('.', ":");

    let parts = envelope::parse(&legacy).unwrap();
    assert_eq!(parts.format, EnvelopeFormat::Legacy);
    assert_eq!(decrypt(&legacy, &key_a()).unwrap(), "hello world");
}

// ── Test 3: Wrong key ────────────────────────────────────────────────────

#[test]
fn test_wrong_key_is_integrity_failure() {
    let sealed = encrypt("hello world", &key_a()).unwrap();
    let err = decrypt(&sealed, &key_b()).unwrap_err();
    assert_eq!(err, EnvelopeError::IntegrityFailure);
    assert_eq!(err.kind(), ErrorKind::IntegrityFailure);
}

// ── Test 4: Structured values ────────────────────────────────────────────

#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct Letter {
    to: String,
    lines: Vec<String>,
    year: u16,
}

#[test]
fn test_structured_round_trip() {
    let letter = Letter {
        to: "future me".into(),
        lines: vec!["hi".into(), "remember this".into()],
        year: 2035,
    };
    let sealed = encrypt_json(&letter, &key_a()).unwrap();
    let back: Letter = decrypt_json(&sealed, &key_a()).unwrap();
    assert_eq!(back, letter);

    let err = decrypt_json::<Vec<u32>>(&sealed, &key_a()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DeserializationFailure);
}

// ── Test 5: Hook round trip through a store ──────────────────────────────

#[test]
fn test_hook_round_trip_through_store() {
    let store = MemoryStore::new(key_a());
    let capsule = Capsule::new("rt-1", "Letter", "dear future", "me@example.com", release())
        .with_media(MediaKind::Photo, "data:image/png;base64,iVBORw0KGgo=")
        .with_recipients(&["friend@example.com"]);

    let saved = store.save(capsule).unwrap();
    assert!(envelope::looks_like_envelope(&saved.content));

    let view = store.view("rt-1").unwrap().unwrap();
    assert_eq!(view.content, FieldValue::Decrypted("dear future".to_string()));
    assert_eq!(view.media_payload(), Some("data:image/png;base64,iVBORw0KGgo="));
    assert!(!view.content_encrypted());
    assert!(!view.media_encrypted());

    // The projection does not touch the stored record
    assert_eq!(store.get("rt-1").unwrap().unwrap(), saved);
}

#[test]
fn test_unencrypted_capsule_passes_through() {
    let mut capsule = Capsule::new("plain-1", "Open letter", "nothing secret", "me@example.com", release());
    capsule.content_encrypted = false;

    let store = MemoryStore::new(key_a());
    let saved = store.save(capsule).unwrap();
    assert_eq!(saved.content, "nothing secret");

    let view = capsule::project(&saved, &key_b());
    assert_eq!(view.content, FieldValue::Plain("nothing secret".to_string()));
}

#[test]
fn test_wrong_deployment_key_is_systemic() {
    let store = MemoryStore::new(key_a());
    for id in ["h-1", "h-2", "h-3"] {
        store
            .save(Capsule::new(id, "t", "text", "me@example.com", release()))
            .unwrap();
    }

    let healthy = DecryptionHealth::from_views(&store.view_all().unwrap());
    assert!(healthy.is_healthy());

    let records = store.list().unwrap();
    let views: Vec<_> = records.iter().map(|c| capsule::project(c, &key_b())).collect();
    let health = DecryptionHealth::from_views(&views);
    assert!(health.is_systemic());
    assert_eq!(health.failed_fields, 3);
    assert!(views.iter().all(|v| v.content.display_text() == capsule::CONTENT_UNAVAILABLE));
}
