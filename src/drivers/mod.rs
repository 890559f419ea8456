//! Output device contracts.
//!
//! The display and the audio channel are external collaborators; herald only
//! talks to them through these traits. Two concrete drivers are provided for
//! terminal use:
//! - [`TerminalDisplay`] rewrites the current terminal line
//! - [`CommandSpeech`] speaks through a system TTS binary

mod speech;
mod terminal;

pub use speech::CommandSpeech;
pub use terminal::TerminalDisplay;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Driver failed: {0}")]
    Failed(String),
}

/// A text display that shows one line at a time.
#[async_trait]
pub trait DisplayDriver: Send + Sync {
    /// Replace the displayed line. An empty line clears the display.
    async fn show_message(&self, line: &str) -> Result<(), DriverError>;
}

/// Speech and earcon output.
#[async_trait]
pub trait AudioDriver: Send + Sync {
    /// Play a short sound identifying the kind of event.
    async fn play_audio_icon(&self, icon: AudioIcon) -> Result<(), DriverError>;

    /// Speak `text`, resolving once speech is finished.
    async fn speak(&self, text: &str) -> Result<(), DriverError>;
}

/// Read-only view of the process-wide mute switch.
pub trait MuteState: Send + Sync {
    fn is_muted(&self) -> bool;
}

impl MuteState for AtomicBool {
    fn is_muted(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// Announcement severity, always within `1..=9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(u8);

impl Severity {
    pub const MIN: Severity = Severity(1);
    pub const MAX: Severity = Severity(9);

    /// Create a severity, clamping out-of-range levels.
    pub fn new(level: i32) -> Self {
        Self(level.clamp(1, 9) as u8)
    }

    pub fn level(self) -> u8 {
        self.0
    }

    /// Earcon that goes with this severity bucket.
    pub fn audio_icon(self) -> AudioIcon {
        match self.0 {
            1 => AudioIcon::Notice,
            9 => AudioIcon::Alarm,
            _ => AudioIcon::Attention,
        }
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::MIN
    }
}

impl From<i32> for Severity {
    fn from(level: i32) -> Self {
        Self::new(level)
    }
}

/// Earcons, from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioIcon {
    Notice,
    Attention,
    Alarm,
}

impl AudioIcon {
    pub fn name(self) -> &'static str {
        match self {
            AudioIcon::Notice => "notice",
            AudioIcon::Attention => "attention",
            AudioIcon::Alarm => "alarm",
        }
    }
}
