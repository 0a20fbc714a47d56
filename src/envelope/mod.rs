//! Envelope module: on-wire layout of an encrypted field.
//!
//! An envelope is three standard-base64 components (IV, auth tag, ciphertext)
//! joined by a separator. Two generations exist:
//!
//! ```text
//! current:  base64(iv).base64(tag).base64(ciphertext)
//! legacy:   base64(iv):base64(tag):base64(ciphertext)
//! ```
//!
//! New writes always produce the current form. The legacy form is read-only and
//! is sliced on the first two `:` occurrences rather than split, so anything past
//! the second separator belongs to the ciphertext component.

use base64::Engine;

use crate::error::{Component, EnvelopeError};

/// Separator used by every envelope written today.
pub const CURRENT_SEPARATOR: char = '.';

/// Separator used by records written before the format change.
pub const LEGACY_SEPARATOR: char = ':';

/// Decoded IV length in bytes.
pub const IV_LEN: usize = 16;

/// Decoded GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeFormat {
    Current,
    Legacy,
}

impl EnvelopeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeFormat::Current => "current",
            EnvelopeFormat::Legacy => "legacy",
        }
    }
}

/// The three base64 components of an envelope, borrowed from the input string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeParts<'a> {
    pub iv: &'a str,
    pub tag: &'a str,
    pub ciphertext: &'a str,
    pub format: EnvelopeFormat,
}

/// Decoded envelope components with validated lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEnvelope {
    pub iv: [u8; IV_LEN],
    pub tag: [u8; TAG_LEN],
    pub ciphertext: Vec<u8>,
    pub format: EnvelopeFormat,
}

/// Split an envelope string into its components.
///
/// `.` is checked first; a string containing `.` is never treated as legacy.
pub fn parse(envelope: &str) -> Result<EnvelopeParts<'_>, EnvelopeError> {
    if envelope.is_empty() {
        return Err(EnvelopeError::EmptyInput);
    }

    if envelope.contains(CURRENT_SEPARATOR) {
        let parts: Vec<&str> = envelope.split(CURRENT_SEPARATOR).collect();
        if parts.len() != 3 {
            return Err(EnvelopeError::MalformedCurrent(parts.len()));
        }
        return Ok(EnvelopeParts {
            iv: parts[0],
            tag: parts[1],
            ciphertext: parts[2],
            format: EnvelopeFormat::Current,
        });
    }

    if let Some(first) = envelope.find(LEGACY_SEPARATOR) {
        let rest_start = first + LEGACY_SEPARATOR.len_utf8();
        let second = envelope[rest_start..]
            .find(LEGACY_SEPARATOR)
            .map(|offset| rest_start + offset)
            .ok_or(EnvelopeError::MalformedLegacy("missing second separator"))?;

        let iv = &envelope[..first];
        let tag = &envelope[rest_start..second];
        let ciphertext = &envelope[second + LEGACY_SEPARATOR.len_utf8()..];

        if iv.is_empty() || tag.is_empty() || ciphertext.is_empty() {
            return Err(EnvelopeError::MalformedLegacy("empty component(s)"));
        }
        return Ok(EnvelopeParts {
            iv,
            tag,
            ciphertext,
            format: EnvelopeFormat::Legacy,
        });
    }

    Err(EnvelopeError::UnrecognizedFormat)
}

impl EnvelopeParts<'_> {
    /// Base64-decode every component and enforce the fixed IV and tag sizes.
    pub fn decode(&self) -> Result<DecodedEnvelope, EnvelopeError> {
        let iv = decode_fixed::<IV_LEN>(self.iv, Component::Iv)?;
        let tag = decode_fixed::<TAG_LEN>(self.tag, Component::Tag)?;

        if self.ciphertext.is_empty() {
            return Err(EnvelopeError::EmptyCiphertext);
        }
        let ciphertext = base64::engine::general_purpose::STANDARD
            .decode(self.ciphertext)
            .map_err(|_| EnvelopeError::InvalidBase64(Component::Ciphertext))?;
        if ciphertext.is_empty() {
            return Err(EnvelopeError::EmptyCiphertext);
        }

        Ok(DecodedEnvelope {
            iv,
            tag,
            ciphertext,
            format: self.format,
        })
    }
}

fn decode_fixed<const N: usize>(b64: &str, component: Component) -> Result<[u8; N], EnvelopeError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64)
        .map_err(|_| EnvelopeError::InvalidBase64(component))?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| EnvelopeError::LengthMismatch {
        component,
        expected: N,
        actual,
    })
}

/// Parse and decode in one step.
pub fn open(envelope: &str) -> Result<DecodedEnvelope, EnvelopeError> {
    parse(envelope)?.decode()
}

/// Whether `value` is a structurally valid envelope in either format.
///
/// This is the only "is it already encrypted?" check in the crate. It decodes
/// every component, so ordinary text that happens to contain `.` or `:` is not
/// mistaken for ciphertext.
pub fn looks_like_envelope(value: &str) -> bool {
    open(value).is_ok()
}

/// Encode raw components in the current format.
pub fn join_current(iv: &[u8; IV_LEN], tag: &[u8; TAG_LEN], ciphertext: &[u8]) -> String {
    let engine = &base64::engine::general_purpose::STANDARD;
    format!(
        "{}{sep}{}{sep}{}",
        engine.encode(iv),
        engine.encode(tag),
        engine.encode(ciphertext),
        sep = CURRENT_SEPARATOR
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(bytes)
    }

    fn sample_current() -> String {
        join_current(&[1u8; 16], &[2u8; 16], b"ciphertext bytes")
    }

    #[test]
    fn test_parse_current_format() {
        let env = sample_current();
        let parts = parse(&env).expect("current envelope should parse");
        assert_eq!(parts.format, EnvelopeFormat::Current);
        assert_eq!(parts.iv, b64(&[1u8; 16]));
        assert_eq!(parts.tag, b64(&[2u8; 16]));
        assert_eq!(parts.ciphertext, b64(b"ciphertext bytes"));
    }

    #[test]
    fn test_parse_current_wrong_part_count() {
        assert_eq!(parse("a.b"), Err(EnvelopeError::MalformedCurrent(2)));
        assert_eq!(parse("a.b.c.d"), Err(EnvelopeError::MalformedCurrent(4)));
    }

    #[test]
    fn test_dot_takes_precedence_over_colon() {
        // A string with both separators is judged as current format
        assert_eq!(parse("a:b.c"), Err(EnvelopeError::MalformedCurrent(2)));
    }

    #[test]
    fn test_parse_legacy_format() {
        let env = format!("{}:{}:{}", b64(&[1u8; 16]), b64(&[2u8; 16]), b64(b"xyz"));
        let parts = parse(&env).expect("legacy envelope should parse");
        assert_eq!(parts.format, EnvelopeFormat::Legacy);
        assert_eq!(parts.iv, b64(&[1u8; 16]));
        assert_eq!(parts.ciphertext, b64(b"xyz"));
    }

    #[test]
    fn test_legacy_slices_on_first_two_separators() {
        let parts = parse("iv:tag:cipher:with:colons").expect("should slice, not split");
        assert_eq!(parts.iv, "iv");
        assert_eq!(parts.tag, "tag");
        assert_eq!(parts.ciphertext, "cipher:with:colons");
    }

    #[test]
    fn test_legacy_missing_second_separator() {
        assert_eq!(
            parse("onlyone:separator"),
            Err(EnvelopeError::MalformedLegacy("missing second separator"))
        );
    }

    #[test]
    fn test_legacy_empty_component() {
        assert_eq!(
            parse("iv::cipher"),
            Err(EnvelopeError::MalformedLegacy("empty component(s)"))
        );
        assert_eq!(
            parse(":tag:cipher"),
            Err(EnvelopeError::MalformedLegacy("empty component(s)"))
        );
        assert_eq!(
            parse("iv:tag:"),
            Err(EnvelopeError::MalformedLegacy("empty component(s)"))
        );
    }

    #[test]
    fn test_no_separator_is_unrecognized() {
        assert_eq!(parse("plain text"), Err(EnvelopeError::UnrecognizedFormat));
        assert_eq!(parse(""), Err(EnvelopeError::EmptyInput));
    }

    #[test]
    fn test_decode_rejects_short_iv() {
        let env = format!("{}.{}.{}", b64(&[1u8; 12]), b64(&[2u8; 16]), b64(b"x"));
        let err = open(&env).unwrap_err();
        assert_eq!(
            err,
            EnvelopeError::LengthMismatch {
                component: Component::Iv,
                expected: 16,
                actual: 12
            }
        );
    }

    #[test]
    fn test_decode_rejects_long_tag() {
        let env = format!("{}.{}.{}", b64(&[1u8; 16]), b64(&[2u8; 20]), b64(b"x"));
        let err = open(&env).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::LengthMismatch {
                component: Component::Tag,
                actual: 20,
                ..
            }
        ));
    }

    #[test]
    fn test_decode_rejects_empty_ciphertext() {
        let env = format!("{}.{}.", b64(&[1u8; 16]), b64(&[2u8; 16]));
        assert_eq!(open(&env).unwrap_err(), EnvelopeError::EmptyCiphertext);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let env = format!("{}.{}.!!!", b64(&[1u8; 16]), b64(&[2u8; 16]));
        assert_eq!(
            open(&env).unwrap_err(),
            EnvelopeError::InvalidBase64(Component::Ciphertext)
        );
    }

    #[test]
    fn test_looks_like_envelope() {
        assert!(looks_like_envelope(&sample_current()));
        let legacy = format!("{}:{}:{}", b64(&[1u8; 16]), b64(&[2u8; 16]), b64(b"abc"));
        assert!(looks_like_envelope(&legacy));

        // Prose with separators is not an envelope
        assert!(!looks_like_envelope("Dear future me. See you in 2030."));
        assert!(!looks_like_envelope("Note: remember this: always"));
        assert!(!looks_like_envelope("no separators at all"));
        assert!(!looks_like_envelope(""));
    }
}
