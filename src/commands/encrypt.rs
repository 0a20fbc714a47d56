/// Encrypt command: seal text (or a JSON document) with the configured key.
use std::io::{IsTerminal, Read};

use anyhow::Context;

use crate::cli::EncryptArgs;

pub fn run_encrypt(args: EncryptArgs) -> anyhow::Result<()> {
    let (_, keyring) = super::load_keyring()?;

    let input = match args.text {
        Some(text) => text,
        None => {
            if std::io::stdin().is_terminal() {
                eprintln!("Reading plaintext from stdin (Ctrl-D to finish)...");
            }
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read plaintext from stdin")?;
            // Drop the newline a shell pipe appends
            buf.strip_suffix('\n').map(str::to_string).unwrap_or(buf)
        }
    };

    let envelope = if args.json {
        let value: serde_json::Value =
            serde_json::from_str(&input).context("Input is not valid JSON")?;
        capsule_seal::crypto::encrypt_json(&value, &keyring.cipher)?
    } else {
        capsule_seal::crypto::encrypt(&input, &keyring.cipher)?
    };

    println!("{}", envelope);
    Ok(())
}
