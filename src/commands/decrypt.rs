/// Decrypt command: open an envelope with the configured or prompted key.
use owo_colors::{OwoColorize, Stream::Stderr};

use capsule_seal::crypto::{self, CipherKey};
use capsule_seal::error::EnvelopeError;

use crate::cli::DecryptArgs;

pub fn run_decrypt(args: DecryptArgs) -> anyhow::Result<()> {
    let key = if args.prompt_key {
        let secret = dialoguer::Password::new()
            .with_prompt("Encryption key")
            .interact()
            .map_err(|e| anyhow::anyhow!("key prompt failed: {}", e))?;
        CipherKey::from_secret(&secret)
    } else {
        super::load_keyring()?.1.cipher
    };

    match open_envelope(&args.envelope, &key, args.json) {
        Ok(plaintext) => {
            println!("{}", plaintext);
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} {} (key {})",
                "Error:".if_supports_color(Stderr, |t| t.red()),
                e,
                key.fingerprint()
            );
            std::process::exit(1);
        }
    }
}

/// Plaintext of `envelope`, pretty-printed when `json` is set.
fn open_envelope(envelope: &str, key: &CipherKey, json: bool) -> Result<String, EnvelopeError> {
    if json {
        let value = crypto::decrypt_json::<serde_json::Value>(envelope, key)?;
        serde_json::to_string_pretty(&value)
            .map_err(|e| EnvelopeError::DeserializationFailed(e.to_string()))
    } else {
        crypto::decrypt(envelope, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_envelope_text_and_json() {
        let key = CipherKey::from_secret("cli-key");
        let text = crypto::encrypt("plain words", &key).unwrap();
        assert_eq!(open_envelope(&text, &key, false).unwrap(), "plain words");

        let doc = crypto::encrypt_json(&serde_json::json!({"a": 1}), &key).unwrap();
        assert_eq!(open_envelope(&doc, &key, true).unwrap(), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_open_envelope_wrong_key_is_error() {
        let key = CipherKey::from_secret("cli-key");
        let sealed = crypto::encrypt("plain words", &key).unwrap();
        let err = open_envelope(&sealed, &CipherKey::from_secret("other"), false).unwrap_err();
        assert_eq!(err, EnvelopeError::IntegrityFailure);
    }
}
