//! Configuration file support for Podium.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/podium/config.toml`.

use crate::{Error, Result, SessionSettings, Thresholds};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Posture heuristic thresholds, in normalized frame coordinates
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Tolerance for shoulder level, hip level and back alignment
    #[serde(default = "default_alignment_tolerance")]
    pub alignment_tolerance: f64,

    /// Minimum horizontal wrist separation for uncrossed arms
    #[serde(default = "default_arm_separation")]
    pub arm_separation: f64,

    /// Tolerance for knee and ankle level
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,

    /// Landmarks reporting visibility below this count as missing
    #[serde(default)]
    pub min_visibility: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            alignment_tolerance: default_alignment_tolerance(),
            arm_separation: default_arm_separation(),
            balance_tolerance: default_balance_tolerance(),
            min_visibility: 0.0,
        }
    }
}

/// Session aggregation configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,

    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: f64,

    #[serde(default)]
    pub count_incomplete_frames: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            flush_interval_secs: default_flush_interval_secs(),
            sample_rate_hz: default_sample_rate_hz(),
            count_incomplete_frames: false,
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|| PathBuf::from("."))
    });
    base.join("podium")
}

fn default_alignment_tolerance() -> f64 {
    0.08
}

fn default_arm_separation() -> f64 {
    0.15
}

fn default_balance_tolerance() -> f64 {
    0.05
}

fn default_flush_interval_secs() -> u64 {
    300
}

fn default_sample_rate_hz() -> f64 {
    30.0
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load and validate configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|| PathBuf::from("."))
        });
        base.join("podium").join("config.toml")
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path();
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the analyzer or tracker cannot work with
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        for (name, value) in [
            ("alignment_tolerance", a.alignment_tolerance),
            ("arm_separation", a.arm_separation),
            ("balance_tolerance", a.balance_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "analysis.{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !(0.0..=1.0).contains(&a.min_visibility) {
            return Err(Error::Config(format!(
                "analysis.min_visibility must be within [0, 1], got {}",
                a.min_visibility
            )));
        }

        let s = &self.session;
        if s.flush_interval_secs == 0 {
            return Err(Error::Config(
                "session.flush_interval_secs must be greater than zero".into(),
            ));
        }
        if !s.sample_rate_hz.is_finite() || s.sample_rate_hz <= 0.0 {
            return Err(Error::Config(format!(
                "session.sample_rate_hz must be positive, got {}",
                s.sample_rate_hz
            )));
        }
        Ok(())
    }

    /// Analyzer thresholds from the `[analysis]` section
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            alignment_tolerance: self.analysis.alignment_tolerance,
            arm_separation: self.analysis.arm_separation,
            balance_tolerance: self.analysis.balance_tolerance,
            min_visibility: self.analysis.min_visibility,
        }
    }

    /// Tracker settings from the `[session]` section
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            flush_interval: chrono::Duration::seconds(
                self.session.flush_interval_secs.min(u64::from(u32::MAX)) as i64,
            ),
            sample_rate_hz: self.session.sample_rate_hz,
            count_incomplete_frames: self.session.count_incomplete_frames,
        }
    }

    /// Directory where the file store keeps its records
    pub fn store_dir(&self) -> PathBuf {
        self.data.data_dir.join("state")
    }
}
