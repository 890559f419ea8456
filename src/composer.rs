//! Display composer.
//!
//! Keeps the set of shown messages and pushes their joined text to the
//! display. Changes are coalesced: any number of updates before the composer
//! task runs produce one composition and at most one push. While there is
//! something on screen the line is re-pushed periodically so a device that
//! timed out or reset catches up.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::drivers::DisplayDriver;
use crate::messaging::{
    HudMessage, HudOptions, Message, ProgressConfig, ProgressMessage, SpinnerConfig,
    SpinnerMessage, TextMessage,
};

/// Composer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Joins the fragments of the shown messages.
    pub separator: String,
    /// Period of the keep-alive re-push.
    pub refresh_interval: Duration,
    /// Used by [`DisplayComposer::create_spinner`].
    pub spinner: SpinnerConfig,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            refresh_interval: Duration::from_millis(2000),
            spinner: SpinnerConfig::default(),
        }
    }
}

struct ComposerState {
    active: bool,
    /// Shown messages in insertion order.
    messages: Vec<Message>,
    /// A composition task is queued.
    needs_update: bool,
    /// A message needing cleanup was removed; push even an empty line.
    cleanup_pending: bool,
    /// The queued composition or the keep-alive refresh, never both.
    timer: Option<JoinHandle<()>>,
}

pub(crate) struct ComposerShared {
    state: Mutex<ComposerState>,
    /// Held for the whole of one push; pushes never overlap.
    pushing: tokio::sync::Mutex<()>,
    display: Arc<dyn DisplayDriver>,
    config: ComposerConfig,
}

impl ComposerShared {
    fn compose(&self, messages: &[Message]) -> String {
        messages
            .iter()
            .filter_map(Message::text)
            .collect::<Vec<_>>()
            .join(&self.config.separator)
    }

    /// Queue a composition on the next scheduling tick.
    pub(crate) fn schedule_update(self: &Arc<Self>) {
        let mut state = self.state.lock();
        if !state.active || state.needs_update {
            return;
        }
        state.needs_update = true;
        if let Some(refresh) = state.timer.take() {
            refresh.abort();
        }
        state.timer = Some(self.spawn_flush(Duration::ZERO));
    }

    fn spawn_flush(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            shared.flush().await;
        })
    }

    /// Compose, push if there is anything to push, then keep the refresh
    /// going for as long as pushes happen.
    ///
    /// Waits for a push still in progress before composing, so the most
    /// recent line is always the last to reach the display.
    async fn flush(self: &Arc<Self>) {
        let _pushing = self.pushing.lock().await;
        let line = {
            let mut state = self.state.lock();
            state.timer = None;
            state.needs_update = false;
            if !state.active {
                return;
            }
            let line = self.compose(&state.messages);
            let cleanup = std::mem::take(&mut state.cleanup_pending);
            if line.is_empty() && !cleanup {
                debug!("Nothing to show, display refresh stopped");
                return;
            }
            line
        };

        debug!(line = %line, "Pushing composed line");
        if let Err(err) = self.display.show_message(&line).await {
            warn!(error = %err, "Display push failed");
        }

        let mut state = self.state.lock();
        if state.active && !state.needs_update && state.timer.is_none() {
            state.timer = Some(self.spawn_flush(self.config.refresh_interval));
        }
    }

    /// Remove a shown message. Called through [`Message::hide`].
    pub(crate) fn remove(self: &Arc<Self>, message: &Message) {
        {
            let mut state = self.state.lock();
            if let Some(index) = state.messages.iter().position(|m| m == message) {
                state.messages.remove(index);
            }
            if message.requires_cleanup() {
                state.cleanup_pending = true;
            }
        }
        message.detach();
        self.schedule_update();
    }
}

/// Owns the set of shown messages and the display they are pushed to.
///
/// Cloning gives another handle to the same composer. Must be used inside a
/// Tokio runtime.
#[derive(Clone)]
pub struct DisplayComposer {
    shared: Arc<ComposerShared>,
}

impl DisplayComposer {
    pub fn new(display: Arc<dyn DisplayDriver>, config: ComposerConfig) -> Self {
        Self {
            shared: Arc::new(ComposerShared {
                state: Mutex::new(ComposerState {
                    active: true,
                    messages: Vec::new(),
                    needs_update: false,
                    cleanup_pending: false,
                    timer: None,
                }),
                pushing: tokio::sync::Mutex::new(()),
                display,
                config,
            }),
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.shared.config
    }

    /// Show a message. Showing an already shown message does nothing.
    pub fn show(&self, message: &Message) {
        if !self.is_active() {
            warn!("show() on a disposed composer ignored");
            return;
        }
        if !message.attach(&self.shared) {
            debug!("Message already shown");
            return;
        }
        message.started();
        self.shared.state.lock().messages.push(message.clone());
        self.shared.schedule_update();
    }

    /// Show a static text message.
    pub fn show_text(&self, text: impl Into<String>) -> TextMessage {
        let message = TextMessage::new(text);
        self.show(&message);
        message
    }

    /// Show a HUD message. It stays invisible until enabled.
    pub fn create_hud(&self, label: impl Into<String>, options: HudOptions) -> HudMessage {
        let message = HudMessage::new(label, options);
        self.show(&message);
        message
    }

    /// Show a spinner using the configured frames and interval.
    pub fn create_spinner(&self, label: Option<String>) -> SpinnerMessage {
        let message = SpinnerMessage::new(self.shared.config.spinner.clone(), label);
        self.show(&message);
        message
    }

    /// Show a progress bar.
    pub fn create_progress(&self, config: ProgressConfig) -> ProgressMessage {
        let message = ProgressMessage::new(config);
        self.show(&message);
        message
    }

    /// The line that would be pushed right now.
    pub fn composed_line(&self) -> String {
        let state = self.shared.state.lock();
        self.shared.compose(&state.messages)
    }

    /// Number of shown messages.
    pub fn len(&self) -> usize {
        self.shared.state.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_active(&self) -> bool {
        self.shared.state.lock().active
    }

    /// Deactivate, tearing down every shown message and pending timer.
    pub fn dispose(&self) {
        let (messages, timer) = {
            let mut state = self.shared.state.lock();
            if !state.active {
                return;
            }
            state.active = false;
            state.needs_update = false;
            state.cleanup_pending = false;
            (std::mem::take(&mut state.messages), state.timer.take())
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        for message in &messages {
            message.detach();
        }
        debug_assert!(self.shared.state.lock().messages.is_empty());
        info!(removed = messages.len(), "Display composer disposed");
    }
}

impl std::fmt::Debug for DisplayComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayComposer").finish_non_exhaustive()
    }
}
