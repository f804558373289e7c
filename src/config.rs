//! Player configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `PIP_PLAYER_*` environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_DWELL_MS: u64 = 3000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlayerConfig {
    /// How long an image or gif stays up before auto-advancing.
    pub dwell_ms: u64,
    /// Decoded images kept in memory by the image loader.
    pub image_cache_entries: usize,
    /// Per-request timeout for remote media.
    pub request_timeout_secs: u64,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            dwell_ms: DEFAULT_DWELL_MS,
            image_cache_entries: 32,
            request_timeout_secs: 15,
            log_filter: "pip_player=info".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Load configuration, reading `path` if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("dwell_ms", defaults.dwell_ms as i64)?
            .set_default("image_cache_entries", defaults.image_cache_entries as i64)?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("log_filter", defaults.log_filter)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        }

        let config = builder
            .add_source(config::Environment::with_prefix("PIP_PLAYER").try_parsing(true))
            .build()
            .context("Failed to build configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Invalid player configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.dwell_ms == 0 {
            anyhow::bail!("dwell_ms must be greater than zero");
        }
        if self.image_cache_entries == 0 {
            anyhow::bail!("image_cache_entries must be greater than zero");
        }
        Ok(())
    }

    pub fn dwell(&self) -> Duration {
        Duration::from_millis(self.dwell_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
