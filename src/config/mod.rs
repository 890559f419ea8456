//! Configuration management.

mod settings;
mod xdg;

pub use settings::{
    AudioSettings, ComposerSettings, SequencerSettings, Settings, SettingsError, SpinnerSettings,
};
pub use xdg::XdgDirs;
