//! Config module: where the two server secrets come from.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables. The result is turned into a [`Keyring`] once at
//! startup and passed down explicitly.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::CipherKey;
use crate::error::ConfigError;
use crate::token::{TokenCodec, DEFAULT_MEDIA_TOKEN_TTL};

pub const ENV_CONFIG_PATH: &str = "CAPSULE_SEAL_CONFIG";
pub const ENV_ENVIRONMENT: &str = "CAPSULE_SEAL_ENV";
pub const ENV_ENCRYPT_KEY: &str = "CAPSULE_ENCRYPT_KEY";
pub const ENV_MEDIA_SECRET: &str = "MEDIA_TOKEN_SECRET";
/// Older deployments signed media links with the session secret.
pub const ENV_MEDIA_SECRET_FALLBACK: &str = "JWT_SECRET";
pub const ENV_BASE_URL: &str = "PUBLIC_BASE_URL";
pub const ENV_TOKEN_TTL: &str = "MEDIA_TOKEN_TTL_SECS";

const PRODUCTION: &str = "production";
const DEV_ENCRYPT_KEY: &str = "dev-only-capsule-key-change-me";
const DEV_MEDIA_SECRET: &str = "dev-only-media-secret-change-me";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SealConfig {
    pub environment: String,
    pub capsule_encrypt_key: Option<String>,
    pub media_token_secret: Option<String>,
    pub base_url: String,
    pub media_token_ttl_secs: u64,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            capsule_encrypt_key: None,
            media_token_secret: None,
            base_url: "http://localhost:3000/api".to_string(),
            media_token_ttl_secs: DEFAULT_MEDIA_TOKEN_TTL.as_secs(),
        }
    }
}

impl fmt::Debug for SealConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn redact(v: &Option<String>) -> &'static str {
            if v.is_some() { "<set>" } else { "<unset>" }
        }
        f.debug_struct("SealConfig")
            .field("environment", &self.environment)
            .field("capsule_encrypt_key", &redact(&self.capsule_encrypt_key))
            .field("media_token_secret", &redact(&self.media_token_secret))
            .field("base_url", &self.base_url)
            .field("media_token_ttl_secs", &self.media_token_ttl_secs)
            .finish()
    }
}

/// Keys derived from configuration, built once per process.
#[derive(Debug, Clone)]
pub struct Keyring {
    pub cipher: CipherKey,
    pub tokens: TokenCodec,
}

/// Default config file location: `<config dir>/capsule-seal/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("capsule-seal").join("config.json"))
}

impl SealConfig {
    /// Load from the process environment and the config file it points at.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|name| std::env::var(name).ok())
    }

    /// Load using `env` as the variable source.
    ///
    /// An explicitly named file must exist; the default location is optional.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match env(ENV_CONFIG_PATH) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => match default_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        base.with_env(env)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Overlay environment variables. Empty values count as unset.
    pub fn with_env<F>(mut self, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| env(name).filter(|v| !v.is_empty());

        if let Some(v) = get(ENV_ENVIRONMENT) {
            self.environment = v;
        }
        if let Some(v) = get(ENV_ENCRYPT_KEY) {
            self.capsule_encrypt_key = Some(v);
        }
        if let Some(v) = get(ENV_MEDIA_SECRET).or_else(|| get(ENV_MEDIA_SECRET_FALLBACK)) {
            self.media_token_secret = Some(v);
        }
        if let Some(v) = get(ENV_BASE_URL) {
            self.base_url = v;
        }
        if let Some(v) = get(ENV_TOKEN_TTL) {
            self.media_token_ttl_secs = v.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name: ENV_TOKEN_TTL,
                value: v.clone(),
            })?;
        }
        Ok(self)
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }

    pub fn media_token_ttl(&self) -> Duration {
        Duration::from_secs(self.media_token_ttl_secs)
    }

    /// Build the cipher key and token codec.
    ///
    /// Outside production an unset secret falls back to a fixed development
    /// value and logs a warning. In production it is an error.
    pub fn keyring(&self) -> Result<Keyring, ConfigError> {
        let key = self.secret(&self.capsule_encrypt_key, ENV_ENCRYPT_KEY, DEV_ENCRYPT_KEY)?;
        let media = self.secret(&self.media_token_secret, ENV_MEDIA_SECRET, DEV_MEDIA_SECRET)?;
        Ok(Keyring {
            cipher: CipherKey::from_secret(key),
            tokens: TokenCodec::new(media),
        })
    }

    fn secret<'a>(
        &self,
        value: &'a Option<String>,
        name: &'static str,
        dev_fallback: &'static str,
    ) -> Result<&'a str, ConfigError> {
        match value.as_deref() {
            Some(v) if !v.is_empty() => Ok(v),
            _ if self.is_production() => Err(ConfigError::MissingSecret(name)),
            _ => {
                tracing::warn!(variable = name, "secret not set, using development fallback");
                Ok(dev_fallback)
            }
        }
    }
}
