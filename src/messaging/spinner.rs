//! Animated spinner for showing activity on the display.
//!
//! The frame advances on a fixed interval while the spinner is shown.

use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::message::{message_handle, Message, MessageKind, MessageState};

/// Braille dots, the default: they read well on a braille line.
pub const DOTS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const LINE: &[&str] = &["-", "\\", "|", "/"];
pub const CIRCLE: &[&str] = &["◐", "◓", "◑", "◒"];
pub const BOUNCE: &[&str] = &["⠁", "⠂", "⠄", "⡀", "⢀", "⠠", "⠐", "⠈"];

/// Spinner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinnerConfig {
    /// Animation frames.
    pub frames: Vec<String>,
    /// Frame duration in milliseconds.
    pub interval_ms: u64,
}

impl SpinnerConfig {
    pub fn with_frames(frames: &[&str]) -> Self {
        Self {
            frames: frames.iter().map(|f| f.to_string()).collect(),
            ..Self::default()
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            frames: DOTS.iter().map(|f| f.to_string()).collect(),
            interval_ms: 220,
        }
    }
}

pub(crate) struct SpinnerState {
    config: SpinnerConfig,
    label: Option<String>,
    frame: usize,
}

impl SpinnerState {
    pub(crate) fn render(&self) -> Option<String> {
        if self.config.frames.is_empty() {
            return None;
        }
        let frame = &self.config.frames[self.frame % self.config.frames.len()];
        Some(match &self.label {
            Some(label) => format!("{} {}", frame, label),
            None => frame.clone(),
        })
    }

    /// Spawn the frame ticker.
    pub(crate) fn start(&mut self, message: Weak<Mutex<MessageState>>) -> JoinHandle<()> {
        self.frame = 0;
        tokio::spawn(tick(message, self.config.interval()))
    }
}

async fn tick(message: Weak<Mutex<MessageState>>, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        let Some(message) = Message::upgrade(&message) else {
            break;
        };
        message.with_state(|state| {
            if let MessageKind::Spinner(spinner) = &mut state.kind {
                spinner.frame = spinner.frame.wrapping_add(1);
            }
        });
        message.update();
    }
}

/// Spinner message, animating only while shown.
#[derive(Clone, Debug)]
pub struct SpinnerMessage {
    message: Message,
}

message_handle!(SpinnerMessage, Spinner, SpinnerState);

impl SpinnerMessage {
    /// Create a detached spinner.
    pub fn new(config: SpinnerConfig, label: Option<String>) -> Self {
        Self {
            message: Message::new(MessageKind::Spinner(SpinnerState {
                config,
                label,
                frame: 0,
            })),
        }
    }

    /// Frames advanced since the spinner was shown.
    pub fn frame(&self) -> usize {
        self.with(|spinner| spinner.frame).unwrap_or(0)
    }

    pub fn label(&self) -> Option<String> {
        self.with(|spinner| spinner.label.clone()).flatten()
    }

    /// Change the trailing label. Writing the current value is a no-op.
    pub fn set_label(&self, label: Option<String>) {
        let changed = self
            .with(|spinner| {
                if spinner.label == label {
                    return false;
                }
                spinner.label = label;
                true
            })
            .unwrap_or(false);
        if changed {
            self.message.update();
        }
    }
}
