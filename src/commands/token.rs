/// Token commands: issue a signed media link, or check one.
use std::time::Duration;

use owo_colors::{OwoColorize, Stream::Stderr, Stream::Stdout};

use capsule_seal::capsule::MediaKind;
use capsule_seal::error::TokenRejection;
use capsule_seal::token;
use capsule_seal::util::{human_duration, now_millis};

use crate::cli::{TokenIssueArgs, TokenVerifyArgs};

fn try_copy_to_clipboard(text: &str) -> bool {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => clipboard.set_text(text).is_ok(),
        Err(_) => false,
    }
}

pub fn run_issue(args: TokenIssueArgs) -> anyhow::Result<()> {
    let kind: MediaKind = args.kind.parse()?;
    let (config, keyring) = super::load_keyring()?;

    let ttl = args
        .ttl
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.media_token_ttl());
    let issued = keyring.tokens.issue(&args.id, kind.as_str(), ttl);
    let url = token::media_url(&config.base_url, &args.id, kind.as_str(), &issued);

    println!("Token:   {}", issued.to_string().if_supports_color(Stdout, |t| t.cyan()));
    println!("URL:     {}", url.if_supports_color(Stdout, |t| t.cyan()));
    println!("Expires: in {}", human_duration(ttl.as_secs()));

    if args.qr {
        println!();
        qr2term::print_qr(&url).map_err(|e| anyhow::anyhow!("QR code render failed: {}", e))?;
    }

    if args.copy {
        if try_copy_to_clipboard(&url) {
            println!("Media URL copied to clipboard.");
        } else {
            println!("(Clipboard unavailable, copy the URL manually)");
        }
    }

    Ok(())
}

pub fn run_verify(args: TokenVerifyArgs) -> anyhow::Result<()> {
    let (_, keyring) = super::load_keyring()?;

    match keyring.tokens.check(&args.token, &args.id, &args.kind) {
        Ok(()) => {
            let remaining = args
                .token
                .parse::<token::MediaToken>()
                .map(|t| t.expires_at_ms.saturating_sub(now_millis()) / 1000)
                .unwrap_or(0);
            println!(
                "{} (expires in {})",
                "valid".if_supports_color(Stdout, |t| t.green()),
                human_duration(remaining)
            );
            Ok(())
        }
        Err(reason) => {
            let label = match reason {
                TokenRejection::Malformed => "malformed",
                TokenRejection::Expired => "expired",
                TokenRejection::Forged => "forged",
            };
            eprintln!("{} {}", label.if_supports_color(Stderr, |t| t.red()), reason);
            std::process::exit(1);
        }
    }
}
