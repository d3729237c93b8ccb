//! Runtime configuration.
//!
//! Configuration is read from a JSON file. Every field is optional and falls back to its default,
//! so a config file only needs to mention the values it changes. The `DRAPE_CONFIG` environment
//! variable can point at the file to use.

use std::{
    env::{self, VarError},
    fs,
    path::Path,
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// Environment variable holding the path of the config file.
pub const CONFIG_ENV_VAR: &str = "DRAPE_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub lighting: LightingConfig,
    pub orientation: OrientationConfig,
    pub detector: DetectorConfig,
    /// Pacing of the still-image redraw loop, in milliseconds.
    pub still_redraw_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub enabled: bool,
    /// Edge length of the square sampling surface, in pixels.
    pub sample_size: u32,
    /// Sample lighting every n-th frame while the camera is live.
    pub live_interval: u32,
    /// Sample lighting every n-th frame while showing a still image.
    pub still_interval: u32,
    /// Weight of the previous lighting state when blending in a new sample.
    ///
    /// Tuned for the default intervals; changing those requires re-tuning this.
    pub smoothing: f32,
    /// Whether the color temperature tint is applied.
    pub tint: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrientationConfig {
    /// Weight of the previous orientation when blending in a new frame.
    pub smoothing: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Delay between checks whether the landmark detector has finished loading.
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lighting: LightingConfig::default(),
            orientation: OrientationConfig::default(),
            detector: DetectorConfig::default(),
            still_redraw_interval_ms: 33,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_size: 64,
            live_interval: 3,
            still_interval: 5,
            smoothing: 0.85,
            tint: true,
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self { smoothing: 0.7 }
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
        }
    }
}

impl Config {
    /// Reads a config file.
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_json(&content)?;
        log::debug!("loaded configuration from '{}'", path.display());
        Ok(config)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str::<Config>(json)?.sanitized())
    }

    /// Loads the config file named by `DRAPE_CONFIG`.
    ///
    /// Falls back to the defaults if the variable is unset or the file cannot be loaded.
    pub fn from_env() -> Self {
        match env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(&path).unwrap_or_else(|e| {
                log::warn!("failed to load config from '{path}': {e}; using defaults");
                Self::default()
            }),
            Err(VarError::NotPresent) => Self::default(),
            Err(VarError::NotUnicode(s)) => {
                log::warn!(
                    "invalid value set for `{CONFIG_ENV_VAR}` variable: {}; using defaults",
                    s.to_string_lossy()
                );
                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn still_redraw_interval(&self) -> Duration {
        Duration::from_millis(self.still_redraw_interval_ms)
    }

    /// Replaces values that would break the frame loop with their defaults, logging a warning for
    /// each.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.lighting.sample_size == 0 {
            log::warn!("lighting.sample_size must not be 0");
            self.lighting.sample_size = defaults.lighting.sample_size;
        }
        if self.lighting.live_interval == 0 || self.lighting.still_interval == 0 {
            log::warn!("lighting sample intervals must not be 0");
            self.lighting.live_interval = self.lighting.live_interval.max(1);
            self.lighting.still_interval = self.lighting.still_interval.max(1);
        }
        if !(0.0..=1.0).contains(&self.lighting.smoothing) {
            log::warn!("lighting.smoothing must be in range 0..=1");
            self.lighting.smoothing = defaults.lighting.smoothing;
        }
        if !(0.0..=1.0).contains(&self.orientation.smoothing) {
            log::warn!("orientation.smoothing must be in range 0..=1");
            self.orientation.smoothing = defaults.orientation.smoothing;
        }
        self
    }
}

impl DetectorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config() {
        let config = Config::from_json(r#"{ "lighting": { "tint": false } }"#).unwrap();
        assert!(!config.lighting.tint);
        assert!(config.lighting.enabled);
        assert_eq!(config.lighting.sample_size, 64);
        assert_eq!(config.orientation, OrientationConfig::default());
        assert_eq!(config.still_redraw_interval(), Duration::from_millis(33));
    }

    #[test]
    fn invalid_values_are_replaced() {
        let config = Config::from_json(
            r#"{ "lighting": { "sample_size": 0, "live_interval": 0, "smoothing": 3.0 },
                 "orientation": { "smoothing": -1 } }"#,
        )
        .unwrap();
        assert_eq!(config.lighting.sample_size, 64);
        assert_eq!(config.lighting.live_interval, 1);
        assert_eq!(config.lighting.still_interval, 5);
        assert_eq!(config.lighting.smoothing, 0.85);
        assert_eq!(config.orientation.smoothing, 0.7);
    }

    #[test]
    fn json_roundtrip() {
        let config = Config::default();
        let json = config.to_json().unwrap();
        assert_eq!(Config::from_json(&json).unwrap(), config);
        assert!(Config::from_json("[1, 2]").is_err());
    }

    #[test]
    fn load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/drape.json"),
            Err(crate::Error::Io(_))
        ));
    }
}
