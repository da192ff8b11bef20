use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Delay strategy selectable from a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DelayKind {
    /// Binary backoff, not capped by `max_delay_secs`.
    #[default]
    Backoff,
    /// Always the base delay.
    Fixed,
    /// Binary backoff capped at `max_delay_secs`.
    Capped,
}

/// Persisted retry settings, loaded from `~/.config/persevere/config.toml`.
/// Turn into an executor configuration with `Config::from_settings`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of attempts (including the first); 0 = unlimited.
    pub attempts: u32,
    /// Base delay in seconds (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum delay in seconds. Only the `capped` strategy applies it.
    pub max_delay_secs: u64,
    /// Return only the last attempt's error instead of the full history.
    pub last_error_only: bool,
    pub strategy: DelayKind,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 30,
            last_error_only: false,
            strategy: DelayKind::Backoff,
        }
    }
}

impl RetrySettings {
    /// Base delay as a `Duration`. Negative and NaN values become zero;
    /// values too large for a `Duration` saturate to `Duration::MAX`.
    pub fn base_delay(&self) -> Duration {
        if self.base_delay_secs.is_nan() || self.base_delay_secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(self.base_delay_secs).unwrap_or(Duration::MAX)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("persevere")?;
    Ok(xdg_dirs.get_config_home().join("config.toml"))
}

pub fn load_from_path(path: &Path) -> Result<RetrySettings> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading retry settings from {}", path.display()))?;
    let settings: RetrySettings = toml::from_str(&data)
        .with_context(|| format!("parsing retry settings in {}", path.display()))?;
    Ok(settings)
}

/// Load settings from the XDG config file, or the built-in defaults if there is none.
pub fn load_or_default() -> Result<RetrySettings> {
    let path = config_path()?;
    if !path.exists() {
        tracing::debug!("no retry config at {}, using defaults", path.display());
        return Ok(RetrySettings::default());
    }
    load_from_path(&path)
}
