/// Keygen command: print a fresh random secret.
use owo_colors::{OwoColorize, Stream::Stderr};

use capsule_seal::crypto::{digest, KEY_LEN};

use crate::cli::KeygenArgs;

pub fn run_keygen(args: KeygenArgs) -> anyhow::Result<()> {
    if args.bytes == 0 {
        anyhow::bail!("--bytes must be at least 1");
    }
    let secret = digest::random_token(args.bytes);

    // The cipher only uses the first KEY_LEN bytes of the secret string
    if secret.len() > KEY_LEN {
        eprintln!(
            "{} only the first {} characters are used as CAPSULE_ENCRYPT_KEY",
            "Note:".if_supports_color(Stderr, |t| t.yellow()),
            KEY_LEN
        );
    }

    println!("{}", secret);
    Ok(())
}
