//! Capsule module: the persisted capsule record and its encryption hook.
//!
//! Two sealed fields live on a capsule, `content` and the optional
//! `media_content`. Each has a flag saying whether it is (to be) stored as an
//! envelope. The persistence adapter calls [`seal_for_write`] right before a
//! save and [`project`] right after a load; nothing else in the crate touches
//! ciphertext.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{self, CipherKey};
use crate::envelope::looks_like_envelope;
use crate::error::{EnvelopeError, ErrorKind};

/// Generic message shown in place of a field that could not be opened.
pub const CONTENT_UNAVAILABLE: &str = "Content unavailable";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }

    /// Content type served when the payload does not declare one.
    pub fn default_content_type(&self) -> &'static str {
        match self {
            MediaKind::Photo => "image/jpeg",
            MediaKind::Video => "video/mp4",
            MediaKind::Audio => "audio/mpeg",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown media kind: {0}")]
pub struct UnknownMediaKind(pub String);

impl FromStr for MediaKind {
    type Err = UnknownMediaKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            "audio" => Ok(MediaKind::Audio),
            other => Err(UnknownMediaKind(other.to_string())),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    pub email: String,
    #[serde(default)]
    pub has_accessed: bool,
    #[serde(default)]
    pub access_date: Option<DateTime<Utc>>,
}

impl Recipient {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.trim().to_lowercase(),
            has_accessed: false,
            access_date: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A capsule as the persistence layer stores it.
///
/// When `content_encrypted` is true, `content` holds an envelope once the
/// capsule has been saved; the same goes for `media_encrypted` and
/// `media_content`. Serialized with camelCase names to match existing documents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Capsule {
    pub id: String,
    pub title: String,
    /// Text body: plaintext before the first save, an envelope afterwards.
    pub content: String,
    #[serde(default = "default_true")]
    pub content_encrypted: bool,
    #[serde(default)]
    pub media_type: Option<MediaKind>,
    /// Base64 payload, optionally a `data:` URI.
    #[serde(default)]
    pub media_content: Option<String>,
    #[serde(default = "default_true")]
    pub media_encrypted: bool,
    pub release_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_public: bool,
    pub owner_email: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default)]
    pub notified_recipients: bool,
}

impl Capsule {
    /// A new, unsaved capsule. Both sealed fields default to encrypted.
    pub fn new(id: &str, title: &str, content: &str, owner_email: &str, release_date: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            title: title.trim().to_string(),
            content: content.to_string(),
            content_encrypted: true,
            media_type: None,
            media_content: None,
            media_encrypted: true,
            release_date,
            created_at: Utc::now(),
            is_public: false,
            owner_email: owner_email.to_string(),
            recipients: Vec::new(),
            notified_recipients: false,
        }
    }

    pub fn with_media(mut self, kind: MediaKind, payload: &str) -> Self {
        self.media_type = Some(kind);
        self.media_content = Some(payload.to_string());
        self
    }

    pub fn with_recipients(mut self, emails: &[&str]) -> Self {
        self.recipients = emails.iter().map(|e| Recipient::new(e)).collect();
        self
    }

    pub fn is_released(&self, now: DateTime<Utc>) -> bool {
        self.release_date <= now
    }
}

/// Which sealed fields a write modified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFields {
    pub content: bool,
    pub media: bool,
}

impl DirtyFields {
    /// Every field counts as modified, as on a first insert.
    pub fn all() -> Self {
        Self {
            content: true,
            media: true,
        }
    }

    /// Compare the stored version with the one about to be written.
    ///
    /// Flipping a field's encrypted flag counts as modifying that field, so
    /// the hook brings the stored value in line with the new flag.
    pub fn between(stored: &Capsule, incoming: &Capsule) -> Self {
        Self {
            content: stored.content != incoming.content
                || stored.content_encrypted != incoming.content_encrypted,
            media: stored.media_content != incoming.media_content
                || stored.media_encrypted != incoming.media_encrypted,
        }
    }
}

/// What [`seal_for_write`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SealReport {
    pub content_sealed: bool,
    pub media_sealed: bool,
    /// Content was an envelope but is now flagged plain, and was decrypted.
    pub content_unsealed: bool,
    pub media_unsealed: bool,
}

/// Write-path hook: bring every modified field in line with its flag.
///
/// A flagged field that is not an envelope yet is encrypted; an unflagged
/// field that still holds an envelope is decrypted. Idempotent: a field that
/// already matches its flag is left untouched, so re-saving never produces
/// double ciphertext. An empty or absent media field is skipped. Errors abort
/// the save.
pub fn seal_for_write(
    capsule: &mut Capsule,
    dirty: DirtyFields,
    key: &CipherKey,
) -> Result<SealReport, EnvelopeError> {
    let mut report = SealReport::default();

    if dirty.content {
        let sealed = looks_like_envelope(&capsule.content);
        if capsule.content_encrypted && !sealed {
            capsule.content = crypto::encrypt(&capsule.content, key)?;
            report.content_sealed = true;
        } else if !capsule.content_encrypted && sealed {
            capsule.content = crypto::decrypt(&capsule.content, key)?;
            report.content_unsealed = true;
        }
    }

    if dirty.media {
        if let Some(media) = capsule.media_content.as_deref().filter(|m| !m.is_empty()) {
            let sealed = looks_like_envelope(media);
            if capsule.media_encrypted && !sealed {
                capsule.media_content = Some(crypto::encrypt(media, key)?);
                report.media_sealed = true;
            } else if !capsule.media_encrypted && sealed {
                capsule.media_content = Some(crypto::decrypt(media, key)?);
                report.media_unsealed = true;
            }
        }
    }

    if report != SealReport::default() {
        tracing::debug!(
            capsule_id = %capsule.id,
            content_sealed = report.content_sealed,
            media_sealed = report.media_sealed,
            content_unsealed = report.content_unsealed,
            media_unsealed = report.media_unsealed,
            "synced capsule fields with their flags"
        );
    }
    Ok(report)
}

/// A sealed field after the read path has tried to open it.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FieldValue<T> {
    /// The field was stored unencrypted.
    Plain(T),
    /// The field was an envelope and opened successfully.
    Decrypted(T),
    /// The field was an envelope that could not be opened.
    Unavailable(ErrorKind),
}

impl<T> FieldValue<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FieldValue::Plain(v) | FieldValue::Decrypted(v) => Some(v),
            FieldValue::Unavailable(_) => None,
        }
    }

    pub fn failure(&self) -> Option<ErrorKind> {
        match self {
            FieldValue::Unavailable(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Whether the field was stored as an envelope.
    pub fn was_sealed(&self) -> bool {
        !matches!(self, FieldValue::Plain(_))
    }

    pub fn is_available(&self) -> bool {
        self.value().is_some()
    }
}

impl FieldValue<String> {
    /// The text, or the generic unavailable message.
    pub fn display_text(&self) -> &str {
        self.value().map(String::as_str).unwrap_or(CONTENT_UNAVAILABLE)
    }
}

/// Safe projection of a capsule: sealed fields opened, nothing persisted changed.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CapsuleView {
    pub id: String,
    pub title: String,
    pub content: FieldValue<String>,
    pub media_type: Option<MediaKind>,
    pub media: Option<FieldValue<String>>,
    pub release_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_public: bool,
    pub owner_email: String,
    pub recipients: Vec<Recipient>,
}

impl CapsuleView {
    /// True only when the content is still ciphertext (it could not be opened).
    pub fn content_encrypted(&self) -> bool {
        !self.content.is_available()
    }

    pub fn media_encrypted(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.is_available())
    }

    /// Decrypted media payload; `None` when absent or undecryptable.
    pub fn media_payload(&self) -> Option<&str> {
        self.media.as_ref().and_then(|m| m.value()).map(String::as_str)
    }
}

fn open_field(capsule_id: &str, field: &'static str, raw: &str, key: &CipherKey) -> FieldValue<String> {
    match crypto::decrypt(raw, key) {
        Ok(plaintext) => FieldValue::Decrypted(plaintext),
        Err(e) => {
            tracing::warn!(
                capsule_id,
                field,
                kind = %e.kind(),
                error = %e,
                "capsule field could not be decrypted"
            );
            FieldValue::Unavailable(e.kind())
        }
    }
}

/// Read-path hook: build the safe projection of `capsule`.
///
/// Never fails and never mutates its input. A field that cannot be opened
/// becomes [`FieldValue::Unavailable`] without affecting the other field, so a
/// single corrupt record cannot break a listing.
pub fn project(capsule: &Capsule, key: &CipherKey) -> CapsuleView {
    let content = if capsule.content_encrypted {
        open_field(&capsule.id, "content", &capsule.content, key)
    } else {
        FieldValue::Plain(capsule.content.clone())
    };

    let media = capsule.media_content.as_deref().filter(|m| !m.is_empty()).map(|raw| {
        if capsule.media_encrypted {
            open_field(&capsule.id, "mediaContent", raw, key)
        } else {
            FieldValue::Plain(raw.to_string())
        }
    });

    CapsuleView {
        id: capsule.id.clone(),
        title: capsule.title.clone(),
        content,
        media_type: capsule.media_type,
        media,
        release_date: capsule.release_date,
        created_at: capsule.created_at,
        is_public: capsule.is_public,
        owner_email: capsule.owner_email.clone(),
        recipients: capsule.recipients.clone(),
    }
}

/// Decryption outcome across a batch of projections.
///
/// Separates a misconfigured key (every sealed field fails) from isolated
/// corruption (a few records fail).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptionHealth {
    pub sealed_fields: usize,
    pub failed_fields: usize,
    pub failures_by_kind: HashMap<ErrorKind, usize>,
}

impl DecryptionHealth {
    pub fn from_views(views: &[CapsuleView]) -> Self {
        let mut health = DecryptionHealth::default();
        let fields = views
            .iter()
            .flat_map(|v| std::iter::once(&v.content).chain(v.media.as_ref()));
        for field in fields.filter(|f| f.was_sealed()) {
            health.sealed_fields += 1;
            if let Some(kind) = field.failure() {
                health.failed_fields += 1;
                *health.failures_by_kind.entry(kind).or_insert(0) += 1;
            }
        }
        health
    }

    pub fn is_healthy(&self) -> bool {
        self.failed_fields == 0
    }

    /// Every sealed field failed, which points at configuration rather than data.
    pub fn is_systemic(&self) -> bool {
        self.failed_fields > 0 && self.failed_fields == self.sealed_fields
    }
}
