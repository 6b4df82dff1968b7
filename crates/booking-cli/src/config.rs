//! CLI settings, layered: built-in defaults, then an optional TOML file, then
//! `BOOKING_*` environment variables.

use std::path::Path;

use anyhow::{Context, Result};
use booking_engine::generator::{GeneratorOptions, DEFAULT_MAX_INSTANCES};
use booking_engine::time::parse_timezone;
use booking_engine::DstPolicy;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Config file read when `--config` is not given. Missing is fine.
pub const DEFAULT_CONFIG_FILE: &str = "booking.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// IANA timezone the calendar's wall clock follows.
    pub timezone: String,
    pub max_instances: u32,
    pub dst_policy: DstPolicy,
    /// Default `tracing` filter; `RUST_LOG` wins when set.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            max_instances: DEFAULT_MAX_INSTANCES,
            dst_policy: DstPolicy::default(),
            log_level: "warn".to_string(),
        }
    }
}

impl Settings {
    /// Load settings. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let toml = match path {
            Some(path) => {
                anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
                Toml::file_exact(path)
            }
            None => Toml::file(DEFAULT_CONFIG_FILE),
        };

        Figment::from(Serialized::defaults(Settings::default()))
            .merge(toml)
            .merge(Env::prefixed("BOOKING_"))
            .extract()
            .context("Failed to load configuration")
    }

    pub fn generator_options(&self) -> Result<GeneratorOptions> {
        anyhow::ensure!(self.max_instances > 0, "max_instances must be at least 1");
        Ok(GeneratorOptions {
            timezone: parse_timezone(&self.timezone)?,
            dst_policy: self.dst_policy,
            max_instances: self.max_instances,
        })
    }
}
