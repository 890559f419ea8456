//! Toggleable heads-up message.
//!
//! While enabled, the label is shown for `timeout`, then hidden. With a
//! `reminder` configured it comes back after `reminder` and the cycle
//! repeats until the message is disabled or hidden.

use parking_lot::Mutex;
use std::sync::Weak;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::message::{message_handle, Message, MessageKind, MessageState};

/// Timing for a [`HudMessage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HudOptions {
    /// Hide the label this long after it was enabled or re-shown.
    pub timeout: Option<Duration>,
    /// Show the label again this long after it was hidden.
    pub reminder: Option<Duration>,
}

impl HudOptions {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn reminder(mut self, reminder: Duration) -> Self {
        self.reminder = Some(reminder);
        self
    }
}

pub(crate) struct HudState {
    label: String,
    enabled: bool,
    hidden: bool,
    options: HudOptions,
}

impl HudState {
    pub(crate) fn render(&self) -> Option<String> {
        (self.enabled && !self.hidden).then(|| self.label.clone())
    }

    /// Reset visibility and arm the timeout, if enabled.
    pub(crate) fn restart(&mut self, message: Weak<Mutex<MessageState>>) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }
        self.hidden = false;
        let timeout = self.options.timeout?;
        Some(tokio::spawn(cycle(message, timeout, self.options.reminder)))
    }
}

async fn cycle(message: Weak<Mutex<MessageState>>, timeout: Duration, reminder: Option<Duration>) {
    loop {
        tokio::time::sleep(timeout).await;
        if !set_hidden(&message, true) {
            break;
        }
        let Some(reminder) = reminder else {
            break;
        };
        tokio::time::sleep(reminder).await;
        if !set_hidden(&message, false) {
            break;
        }
    }
}

fn set_hidden(message: &Weak<Mutex<MessageState>>, hidden: bool) -> bool {
    let Some(message) = Message::upgrade(message) else {
        return false;
    };
    message.with_state(|state| {
        if let MessageKind::Hud(hud) = &mut state.kind {
            hud.hidden = hidden;
        }
    });
    message.update();
    true
}

/// A label that can be switched on and off, optionally flashing.
///
/// Enabling arms timers, so it must happen inside a Tokio runtime.
#[derive(Clone, Debug)]
pub struct HudMessage {
    message: Message,
}

message_handle!(HudMessage, Hud, HudState);

impl HudMessage {
    /// Create a detached, disabled HUD message.
    pub fn new(label: impl Into<String>, options: HudOptions) -> Self {
        Self {
            message: Message::new(MessageKind::Hud(HudState {
                label: label.into(),
                enabled: false,
                hidden: false,
                options,
            })),
        }
    }

    /// Show the label and (re)arm the timeout.
    pub fn enable(&self) {
        let weak = self.message.downgrade();
        let changed = self.message.with_state(|state| {
            let MessageKind::Hud(hud) = &mut state.kind else {
                return false;
            };
            let before = hud.render();
            hud.enabled = true;
            let timer = hud.restart(weak);
            let changed = hud.render() != before;
            state.cancel_timer();
            state.timer = timer;
            changed
        });
        if changed {
            self.message.update();
        }
    }

    /// Hide the label and stop the timers.
    pub fn disable(&self) {
        let changed = self.message.with_state(|state| {
            let MessageKind::Hud(hud) = &mut state.kind else {
                return false;
            };
            let was_visible = hud.render().is_some();
            hud.enabled = false;
            hud.hidden = false;
            state.cancel_timer();
            was_visible
        });
        if changed {
            self.message.update();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.with(|hud| hud.enabled).unwrap_or(false)
    }

    pub fn label(&self) -> String {
        self.with(|hud| hud.label.clone()).unwrap_or_default()
    }

    /// Change the label. Only a visible change notifies the composer.
    pub fn set_label(&self, label: impl Into<String>) {
        let label = label.into();
        let changed = self
            .with(|hud| {
                if hud.label == label {
                    return false;
                }
                hud.label = label;
                hud.render().is_some()
            })
            .unwrap_or(false);
        if changed {
            self.message.update();
        }
    }
}
