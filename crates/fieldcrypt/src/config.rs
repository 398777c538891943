//! Configuration loading and validation.
//!
//! All values are read from environment variables at startup. Callers should
//! exit with a clear error message if any required variable is missing or
//! invalid: key material is never looked up lazily.

use std::fmt;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated key and logging configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Primary authenticated-encryption key (url-safe base64 of 32 bytes). **Required.**
    pub fernet_key: String,

    /// Key material for deterministic encryption and search hashes.
    /// Falls back to `fernet_key` when unset or empty.
    #[serde(default)]
    pub deterministic_encryption_key: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`), used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::default())
    }

    fn load(env: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.fernet_key.trim().is_empty() {
            anyhow::bail!("FERNET_KEY is required and must not be empty");
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("fernet_key", &"[REDACTED]")
            .field(
                "deterministic_encryption_key",
                &self.deterministic_encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}
