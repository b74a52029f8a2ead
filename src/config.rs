//! Settings for the demo binary.
//!
//! Loaded in layers, later sources overriding earlier ones:
//!
//! 1. Built-in defaults (two flyers, mirroring the classic two-flyer demo)
//! 2. An optional TOML file
//! 3. Environment variables prefixed `DAQ_FLYER` (e.g.
//!    `DAQ_FLYER_WAIT_TIMEOUT=10s`)
//!
//! Durations are human-readable strings ("500ms", "2s") via humantime-serde.

use anyhow::{Context, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One flyer instance to construct and fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlyerSettings {
    /// Device name (keys the collected stream).
    pub name: String,
    /// Samples to acquire per cycle.
    pub steps: usize,
    /// Sampling period.
    #[serde(with = "humantime_serde")]
    pub period: Duration,
}

/// Demo configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Flyers to run concurrently.
    pub flyers: Vec<FlyerSettings>,
    /// Upper bound on each status wait.
    #[serde(with = "humantime_serde")]
    pub wait_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            flyers: vec![
                FlyerSettings {
                    name: "flyer0".to_string(),
                    steps: 3,
                    period: Duration::from_millis(500),
                },
                FlyerSettings {
                    name: "flyer1".to_string(),
                    steps: 5,
                    period: Duration::from_millis(500),
                },
            ],
            wait_timeout: Duration::from_secs(30),
        }
    }
}

impl Settings {
    /// Loads settings, layering an optional file and the environment over
    /// the built-in defaults.
    pub fn new(path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Settings::default()).context("serializing defaults")?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder
            .add_source(config::Environment::with_prefix("DAQ_FLYER"))
            .build()
            .context("building configuration")?
            .try_deserialize()
            .context("deserializing configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_mirror_the_two_flyer_demo() {
        let settings = Settings::default();
        assert_eq!(settings.flyers.len(), 2);
        assert_eq!(settings.flyers[0].steps, 3);
        assert_eq!(settings.flyers[1].steps, 5);
        assert_eq!(settings.flyers[0].period, Duration::from_millis(500));
    }

    #[test]
    fn test_new_without_file_uses_defaults() {
        let settings = Settings::new(None).unwrap();
        assert_eq!(settings.flyers.len(), 2);
        assert_eq!(settings.wait_timeout, Duration::from_secs(30));
    }
}
