pub mod config;
pub mod decrypt;
pub mod encrypt;
pub mod inspect;
pub mod keygen;
pub mod token;

use anyhow::Context;
use capsule_seal::config::{Keyring, SealConfig};

/// Load configuration and build the keyring, with CLI-friendly error context.
pub fn load_keyring() -> anyhow::Result<(SealConfig, Keyring)> {
    let config = SealConfig::load().context("Failed to load configuration")?;
    let keyring = config.keyring().context("Failed to build keys from configuration")?;
    Ok((config, keyring))
}
