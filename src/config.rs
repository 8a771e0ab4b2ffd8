use std::{fs, path::Path, time::Duration};

use anyhow::{ensure, Context, Result};
use serde::Deserialize;

use crate::{replay::Pacing, store::Source};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Used when no source is given on the command line
    pub source: Option<String>,

    pub playback: PlaybackConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
    pub pacing: PacingMode,
    // only used with recorded pacing; 2.0 replays twice as fast as recorded
    pub time_scale: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            pacing: PacingMode::Fixed,
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    Fixed,
    Recorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub speed_decimals: u32,
    pub progress_decimals: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            speed_decimals: 1,
            progress_decimals: 1,
        }
    }
}

impl Config {
    pub fn pacing(&self) -> Pacing {
        match self.playback.pacing {
            PacingMode::Fixed => Pacing::Fixed(Duration::from_millis(self.playback.tick_interval_ms)),
            PacingMode::Recorded => Pacing::Recorded {
                time_scale: self.playback.time_scale,
            },
        }
    }

    /// The command line wins over the config file
    pub fn source(&self, cli: Option<Source>) -> Result<Source> {
        match cli {
            Some(source) => Ok(source),
            None => {
                let raw = self
                    .source
                    .as_deref()
                    .context("No source given on the command line or in the config")?;
                Ok(raw.parse()?)
            }
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.playback.tick_interval_ms > 0,
            "playback.tick_interval_ms must be positive"
        );
        ensure!(
            self.playback.time_scale.is_finite() && self.playback.time_scale > 0.0,
            "playback.time_scale must be positive"
        );
        Ok(())
    }
}

pub fn load(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path).context("Failed to read config")?;
    let config: Config = toml::from_str(&data).context("Failed to parse config")?;
    config.validate().context("Invalid config")?;
    Ok(config)
}

/// An explicit path must exist; the default one is optional.
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load(path),
        None => {
            let path = Path::new("config.toml");
            if path.exists() {
                load(path)
            } else {
                Ok(Config::default())
            }
        }
    }
}
