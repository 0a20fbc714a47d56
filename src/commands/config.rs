/// Config command: show what the process would run with, never the secrets.
use owo_colors::{OwoColorize, Stream::Stdout};

use capsule_seal::config::{self, ENV_CONFIG_PATH};
use capsule_seal::util::human_duration;

pub fn run_config() -> anyhow::Result<()> {
    let (cfg, keyring) = super::load_keyring()?;

    let file = std::env::var(ENV_CONFIG_PATH)
        .ok()
        .map(std::path::PathBuf::from)
        .or_else(|| config::default_config_path().filter(|p| p.exists()));

    let source = |set: bool| if set { "" } else { " (development fallback)" };

    println!("Environment:  {}", cfg.environment.if_supports_color(Stdout, |t| t.cyan()));
    println!(
        "Content key:  {}{}",
        keyring.cipher.fingerprint(),
        source(cfg.capsule_encrypt_key.is_some()).if_supports_color(Stdout, |t| t.yellow())
    );
    println!(
        "Media secret: {}{}",
        keyring.tokens.fingerprint(),
        source(cfg.media_token_secret.is_some()).if_supports_color(Stdout, |t| t.yellow())
    );
    println!("Base URL:     {}", cfg.base_url);
    println!("Token TTL:    {}", human_duration(cfg.media_token_ttl_secs));
    match file {
        Some(path) => println!("Config file:  {}", path.display()),
        None => println!("Config file:  (none)"),
    }

    Ok(())
}
