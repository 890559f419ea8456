//! XDG Base Directory support.

use std::path::PathBuf;

/// Where Herald looks for its settings.
pub struct XdgDirs {
    /// `$XDG_CONFIG_HOME/herald`, or `~/.config/herald` when unset.
    pub config: PathBuf,
}

impl XdgDirs {
    pub fn new() -> Self {
        let config_home = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".config")
            });
        Self {
            config: config_home.join("herald"),
        }
    }

    /// Default settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config.join("settings.json")
    }
}

impl Default for XdgDirs {
    fn default() -> Self {
        Self::new()
    }
}
