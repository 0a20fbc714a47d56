use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a sealing failure.
///
/// This is the part of an error that is safe to surface to API callers and to
/// aggregate in diagnostics: it never carries key material or payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    MalformedEnvelope,
    IntegrityFailure,
    DeserializationFailure,
    EncryptionFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::MalformedEnvelope => "malformed_envelope",
            ErrorKind::IntegrityFailure => "integrity_failure",
            ErrorKind::DeserializationFailure => "deserialization_failure",
            ErrorKind::EncryptionFailure => "encryption_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of the three envelope components a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Iv,
    Tag,
    Ciphertext,
}

impl std::fmt::Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Component::Iv => "IV",
            Component::Tag => "auth tag",
            Component::Ciphertext => "ciphertext",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Cannot process empty input")]
    EmptyInput,

    #[error("Cannot decrypt value of type {0}")]
    NotAString(&'static str),

    #[error("Unrecognized envelope format: no known separator present")]
    UnrecognizedFormat,

    #[error("Malformed current-format envelope: expected 3 parts, got {0}")]
    MalformedCurrent(usize),

    #[error("Malformed legacy-format envelope: {0}")]
    MalformedLegacy(&'static str),

    #[error("Invalid base64 in {0} component")]
    InvalidBase64(Component),

    #[error("Invalid {component} length: {actual} bytes (expected {expected})")]
    LengthMismatch {
        component: Component,
        expected: usize,
        actual: usize,
    },

    #[error("Empty ciphertext component")]
    EmptyCiphertext,

    #[error("Integrity check failed: wrong key or tampered envelope")]
    IntegrityFailure,

    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    #[error("Encryption failed")]
    EncryptionFailed,
}

impl EnvelopeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvelopeError::EmptyInput
            | EnvelopeError::NotAString(_)
            | EnvelopeError::UnrecognizedFormat => ErrorKind::InvalidInput,
            EnvelopeError::MalformedCurrent(_)
            | EnvelopeError::MalformedLegacy(_)
            | EnvelopeError::InvalidBase64(_)
            | EnvelopeError::LengthMismatch { .. }
            | EnvelopeError::EmptyCiphertext => ErrorKind::MalformedEnvelope,
            EnvelopeError::IntegrityFailure => ErrorKind::IntegrityFailure,
            EnvelopeError::DeserializationFailed(_) => ErrorKind::DeserializationFailure,
            EnvelopeError::EncryptionFailed => ErrorKind::EncryptionFailure,
        }
    }
}

/// Why a media access token was refused.
///
/// All three resolve to "access denied" for the caller; the distinction exists
/// for logs, so clock skew can be told apart from tampering.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    #[error("Media token is malformed")]
    Malformed,

    #[error("Media token has expired")]
    Expired,

    #[error("Media token signature does not match")]
    Forged,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to seal capsule {id}: {source}")]
    Seal {
        id: String,
        #[source]
        source: EnvelopeError,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Invalid or expired media token")]
    Unauthorized(Option<TokenRejection>),

    #[error("Capsule or media not found")]
    NotFound,

    #[error("Invalid media type requested: {requested} (stored: {stored})")]
    KindMismatch { requested: String, stored: String },

    #[error("Failed to decrypt media content ({0})")]
    Undecryptable(ErrorKind),

    #[error("Failed to process media content")]
    InvalidPayload,
}

impl DeliveryError {
    /// HTTP status the transport layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            DeliveryError::Unauthorized(_) => 401,
            DeliveryError::NotFound => 404,
            DeliveryError::KindMismatch { .. } => 400,
            DeliveryError::Undecryptable(_) | DeliveryError::InvalidPayload => 500,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    MissingSecret(&'static str),

    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
