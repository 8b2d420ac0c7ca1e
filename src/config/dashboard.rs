//! Dashboard configuration stored as JSON in the user's config directory
//!
//! Every field has a default, so a partial or empty file is fine. A missing
//! file is created with defaults on first load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::{self, http, polling, surface};
use crate::dashboard::DashboardSettings;
use crate::stream::{PollSettings, VideoSurface};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub first_poll_delay_ms: u64,
    pub poll_interval_ms: u64,
    /// `None` keeps polling until the stream is ready or stopped
    pub max_poll_attempts: Option<u32>,
    pub player: PlayerConfig,
    /// Overrides `LOG_LEVEL` when set
    pub log_level: Option<String>,
    pub surface: SurfaceConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base: constants::config::DEFAULT_API_BASE.to_string(),
            request_timeout_ms: http::DEFAULT_TIMEOUT_MS,
            first_poll_delay_ms: polling::FIRST_POLL_DELAY_MS,
            poll_interval_ms: polling::POLL_INTERVAL_MS,
            max_poll_attempts: None,
            player: PlayerConfig::default(),
            log_level: None,
            surface: SurfaceConfig::default(),
        }
    }
}

/// External player command line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub program: String,
    /// Placed before the manifest URL
    pub args: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            program: constants::player::DEFAULT_PROGRAM.to_string(),
            args: constants::player::DEFAULT_ARGS
                .iter()
                .map(|arg| arg.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            width: surface::DEFAULT_WIDTH,
            height: surface::DEFAULT_HEIGHT,
        }
    }
}

impl DashboardConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(constants::config::APP_DIR);
        path.push(constants::config::FILENAME);
        path
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load `path`, writing defaults there if it does not exist yet.
    /// Environment overrides and clamping are applied to the result.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path)
                .context(format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str::<Self>(&contents)
                .context(format!("Failed to parse config file {}", path.display()))?
        } else {
            info!(path = %path.display(), "No config file found, writing defaults");
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.apply_env_overrides(|key| env::var(key).ok());
        config.validate_and_clamp();
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;
        fs::write(path, contents)
            .context(format!("Failed to write config file to {}", path.display()))?;
        Ok(())
    }

    /// Apply `LIVEDECK_*` overrides. `lookup` reads a variable by name.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = lookup(constants::env::API_BASE)
            && !api_base.trim().is_empty()
        {
            self.api_base = api_base.trim().to_string();
        }

        if let Some(raw) = lookup(constants::env::MAX_POLL_ATTEMPTS) {
            let raw = raw.trim();
            if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
                self.max_poll_attempts = None;
            } else {
                match raw.parse::<u32>() {
                    Ok(n) => self.max_poll_attempts = Some(n),
                    Err(e) => warn!(
                        var = constants::env::MAX_POLL_ATTEMPTS,
                        value = %raw,
                        error = %e,
                        "Ignoring unparseable env var"
                    ),
                }
            }
        }
    }

    /// Pull out-of-range values back into a usable range
    pub fn validate_and_clamp(&mut self) {
        if self.poll_interval_ms < polling::MIN_POLL_INTERVAL_MS {
            warn!(poll_interval_ms = self.poll_interval_ms, min = polling::MIN_POLL_INTERVAL_MS, "poll_interval_ms below minimum, clamping");
            self.poll_interval_ms = polling::MIN_POLL_INTERVAL_MS;
        }
        if self.first_poll_delay_ms < polling::MIN_POLL_INTERVAL_MS {
            warn!(first_poll_delay_ms = self.first_poll_delay_ms, min = polling::MIN_POLL_INTERVAL_MS, "first_poll_delay_ms below minimum, clamping");
            self.first_poll_delay_ms = polling::MIN_POLL_INTERVAL_MS;
        }
        if self.request_timeout_ms < http::MIN_TIMEOUT_MS {
            warn!(request_timeout_ms = self.request_timeout_ms, min = http::MIN_TIMEOUT_MS, "request_timeout_ms below minimum, clamping");
            self.request_timeout_ms = http::MIN_TIMEOUT_MS;
        }
        if self.max_poll_attempts == Some(0) {
            warn!("max_poll_attempts of 0 would never poll, treating as unbounded");
            self.max_poll_attempts = None;
        }
        if self.surface.width < surface::MIN_WIDTH {
            warn!(width = self.surface.width, min = surface::MIN_WIDTH, "surface width below minimum, clamping");
            self.surface.width = surface::MIN_WIDTH;
        }
        if self.surface.height < surface::MIN_HEIGHT {
            warn!(height = self.surface.height, min = surface::MIN_HEIGHT, "surface height below minimum, clamping");
            self.surface.height = surface::MIN_HEIGHT;
        }
        if self.player.program.trim().is_empty() {
            warn!(using = constants::player::DEFAULT_PROGRAM, "player program empty, using default");
            self.player.program = constants::player::DEFAULT_PROGRAM.to_string();
        }
        if let Some(level) = &self.log_level
            && !matches!(
                level.to_lowercase().as_str(),
                "trace" | "debug" | "info" | "warn" | "error"
            )
        {
            warn!(log_level = %level, "Unknown log_level, ignoring");
            self.log_level = None;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            first_delay: Duration::from_millis(self.first_poll_delay_ms),
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }

    pub fn video_surface(&self) -> VideoSurface {
        VideoSurface {
            title: surface::TITLE.to_string(),
            width: self.surface.width,
            height: self.surface.height,
        }
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            poll: self.poll_settings(),
            surface: self.video_surface(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("livedeck").join("config.json");

        let config = DashboardConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.poll_interval_ms, 2000);
        assert_eq!(config.first_poll_delay_ms, 3000);
        assert_eq!(config.max_poll_attempts, None);

        let written: DashboardConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, DashboardConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_base": "http://stream-box:5000/api", "player": {"program": "mpv"}}"#).unwrap();

        let config = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(config.api_base, "http://stream-box:5000/api");
        assert_eq!(config.player.program, "mpv");
        assert!(config.player.args.is_empty() || config.player.args == PlayerConfig::default().args);
        assert_eq!(config.surface, SurfaceConfig::default());
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = DashboardConfig::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.json"));
    }

    #[test]
    fn test_clamps_out_of_range_values() {
        let mut config = DashboardConfig {
            poll_interval_ms: 5,
            first_poll_delay_ms: 0,
            request_timeout_ms: 1,
            max_poll_attempts: Some(0),
            surface: SurfaceConfig { width: 10, height: 10 },
            log_level: Some("loud".to_string()),
            ..Default::default()
        };
        config.validate_and_clamp();

        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.first_poll_delay_ms, 100);
        assert_eq!(config.request_timeout_ms, 500);
        assert_eq!(config.max_poll_attempts, None);
        assert_eq!(config.surface, SurfaceConfig { width: 160, height: 90 });
        assert_eq!(config.log_level, None);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LIVEDECK_API_BASE", "http://10.0.0.2/api"),
            ("LIVEDECK_MAX_POLL_ATTEMPTS", "30"),
        ]);
        let mut config = DashboardConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base, "http://10.0.0.2/api");
        assert_eq!(config.max_poll_attempts, Some(30));
        assert_eq!(config.poll_settings().max_attempts, Some(30));
    }

    #[test]
    fn test_bad_env_value_is_ignored() {
        let mut config = DashboardConfig {
            max_poll_attempts: Some(5),
            ..Default::default()
        };
        config.apply_env_overrides(|key| {
            (key == "LIVEDECK_MAX_POLL_ATTEMPTS").then(|| "lots".to_string())
        });
        assert_eq!(config.max_poll_attempts, Some(5));
    }
}
