//! Settings file handling.
//!
//! Settings live in `settings.json` under the XDG config directory. Every
//! section and field is optional; missing values take their defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::XdgDirs;
use crate::composer::ComposerConfig;
use crate::messaging::{SpinnerConfig, DOTS};
use crate::sequencer::SequencerConfig;

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse settings file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Display composer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerSettings {
    pub separator: String,
    pub refresh_interval_ms: u64,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            refresh_interval_ms: 2000,
        }
    }
}

/// Announcement sequencer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSettings {
    pub icon_throttle_window_ms: u64,
    pub icon_timeout_ms: u64,
    pub speech_timeout_ms: u64,
    pub default_duration_ms: u64,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            icon_throttle_window_ms: 20_000,
            icon_timeout_ms: 5_000,
            speech_timeout_ms: 30_000,
            default_duration_ms: 0,
        }
    }
}

/// Spinner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinnerSettings {
    pub interval_ms: u64,
    pub frames: Vec<String>,
}

impl Default for SpinnerSettings {
    fn default() -> Self {
        Self {
            interval_ms: 220,
            frames: DOTS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Audio settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Initial value of the mute switch.
    pub muted: bool,
}

/// Root settings structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub composer: ComposerSettings,
    pub sequencer: SequencerSettings,
    pub spinner: SpinnerSettings,
    pub audio: AudioSettings,
}

impl Settings {
    /// Load and validate settings from a file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        settings.validate()?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Load settings from the default path.
    ///
    /// Default path: `$XDG_CONFIG_HOME/herald/settings.json`
    pub fn load_default() -> Result<Self, SettingsError> {
        Self::load(&XdgDirs::new().settings_file())
    }

    /// Load from `path`, or the default path, falling back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| XdgDirs::new().settings_file());
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Self::default();
        }
        match Self::load(&path) {
            Ok(settings) => {
                info!(path = %path.display(), "Settings loaded");
                settings
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Ignoring settings file");
                Self::default()
            }
        }
    }

    /// Save settings as pretty JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.composer.refresh_interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "composer.refresh_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.spinner.interval_ms == 0 {
            return Err(SettingsError::Invalid(
                "spinner.interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.spinner.frames.is_empty() {
            return Err(SettingsError::Invalid(
                "spinner.frames must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn spinner_config(&self) -> SpinnerConfig {
        SpinnerConfig {
            frames: self.spinner.frames.clone(),
            interval_ms: self.spinner.interval_ms,
        }
    }

    pub fn composer_config(&self) -> ComposerConfig {
        ComposerConfig {
            separator: self.composer.separator.clone(),
            refresh_interval: Duration::from_millis(self.composer.refresh_interval_ms),
            spinner: self.spinner_config(),
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            icon_throttle_window: Duration::from_millis(self.sequencer.icon_throttle_window_ms),
            icon_timeout: Duration::from_millis(self.sequencer.icon_timeout_ms),
            speech_timeout: Duration::from_millis(self.sequencer.speech_timeout_ms),
            default_duration: Duration::from_millis(self.sequencer.default_duration_ms),
        }
    }
}
