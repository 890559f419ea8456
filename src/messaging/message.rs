//! Shared message handle and lifecycle.
//!
//! A [`Message`] is a cheap, clonable handle to one text fragment on the
//! display. The variant-specific handles ([`TextMessage`](super::TextMessage),
//! [`HudMessage`](super::HudMessage), ...) wrap it and dereference to it.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::error;

use super::hud::HudState;
use super::progress::ProgressState;
use super::spinner::SpinnerState;
use super::text::TextState;
use crate::composer::ComposerShared;

/// Closed set of message behaviors.
pub(crate) enum MessageKind {
    Text(TextState),
    Hud(HudState),
    Spinner(SpinnerState),
    Progress(ProgressState),
}

impl MessageKind {
    fn name(&self) -> &'static str {
        match self {
            MessageKind::Text(_) => "text",
            MessageKind::Hud(_) => "hud",
            MessageKind::Spinner(_) => "spinner",
            MessageKind::Progress(_) => "progress",
        }
    }

    /// Variants that own a timer need one more push after removal so their
    /// last frame does not linger on the device.
    fn requires_cleanup(&self) -> bool {
        matches!(self, MessageKind::Hud(_) | MessageKind::Spinner(_))
    }
}

pub(crate) struct MessageState {
    pub(crate) kind: MessageKind,
    /// Owning composer, only set while shown.
    center: Option<Weak<ComposerShared>>,
    /// Animation or visibility timer owned by this message.
    pub(crate) timer: Option<JoinHandle<()>>,
}

impl MessageState {
    fn render(&self) -> Option<String> {
        match &self.kind {
            MessageKind::Text(text) => text.render(),
            MessageKind::Hud(hud) => hud.render(),
            MessageKind::Spinner(spinner) => {
                if self.timer.is_none() {
                    debug_assert!(false, "spinner rendered without a running animation");
                    error!("spinner rendered without a running animation");
                    return None;
                }
                spinner.render()
            }
            MessageKind::Progress(progress) => progress.render(),
        }
    }

    /// Stop any timer this message owns.
    pub(crate) fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

/// Handle to one displayable text fragment.
#[derive(Clone)]
pub struct Message {
    inner: Arc<Mutex<MessageState>>,
}

impl Message {
    pub(crate) fn new(kind: MessageKind) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MessageState {
                kind,
                center: None,
                timer: None,
            })),
        }
    }

    pub(crate) fn downgrade(&self) -> Weak<Mutex<MessageState>> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<Mutex<MessageState>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Run `f` with the message state locked.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut MessageState) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Current text, or `None` when this message contributes nothing.
    pub fn text(&self) -> Option<String> {
        self.inner.lock().render()
    }

    /// Whether the message is currently shown on a composer.
    pub fn is_shown(&self) -> bool {
        self.inner.lock().center.is_some()
    }

    /// Whether removing this message forces a display refresh.
    pub fn requires_cleanup(&self) -> bool {
        self.inner.lock().kind.requires_cleanup()
    }

    /// Remove the message from the composer showing it.
    ///
    /// The message must currently be shown; hiding it twice, or before it
    /// was shown, is a programming error and panics in debug builds.
    pub fn hide(&self) {
        let center = self.inner.lock().center.clone();
        let Some(center) = center else {
            debug_assert!(false, "hide() called on a message that is not shown");
            error!("hide() called on a message that is not shown");
            return;
        };
        match center.upgrade() {
            Some(center) => center.remove(self),
            // Composer already dropped, just tear down locally.
            None => self.detach(),
        }
    }

    /// Notify the owning composer that the text may have changed.
    pub(crate) fn update(&self) {
        let center = self.inner.lock().center.as_ref().and_then(Weak::upgrade);
        if let Some(center) = center {
            center.schedule_update();
        }
    }

    /// Set the back-reference. Returns `false` when the message is already
    /// shown, which is only legitimate on the same composer.
    pub(crate) fn attach(&self, center: &Arc<ComposerShared>) -> bool {
        let mut state = self.inner.lock();
        match &state.center {
            Some(existing) => {
                debug_assert!(
                    std::ptr::eq(existing.as_ptr(), Arc::as_ptr(center)),
                    "message is already shown on another composer"
                );
                false
            }
            None => {
                state.center = Some(Arc::downgrade(center));
                true
            }
        }
    }

    /// Attach hook, starts variant timers.
    pub(crate) fn started(&self) {
        let weak = self.downgrade();
        let mut state = self.inner.lock();
        let timer = match &mut state.kind {
            MessageKind::Spinner(spinner) => Some(spinner.start(weak)),
            MessageKind::Hud(hud) => hud.restart(weak),
            MessageKind::Text(_) | MessageKind::Progress(_) => None,
        };
        if let Some(timer) = timer {
            state.cancel_timer();
            state.timer = Some(timer);
        }
    }

    /// Detach hook: stops timers and clears the back-reference.
    pub(crate) fn detach(&self) {
        let mut state = self.inner.lock();
        state.cancel_timer();
        state.center = None;
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Message {}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("Message")
            .field("kind", &state.kind.name())
            .field("shown", &state.center.is_some())
            .finish_non_exhaustive()
    }
}

/// Implements the handle plumbing shared by every variant wrapper.
macro_rules! message_handle {
    ($handle:ident, $variant:ident, $state:ty) => {
        impl $handle {
            /// Run `f` against this variant's state.
            fn with<R>(&self, f: impl FnOnce(&mut $state) -> R) -> Option<R> {
                self.message.with_state(|state| match &mut state.kind {
                    $crate::messaging::message::MessageKind::$variant(inner) => Some(f(inner)),
                    _ => None,
                })
            }

            /// The underlying message handle.
            pub fn message(&self) -> &$crate::messaging::Message {
                &self.message
            }
        }

        impl std::ops::Deref for $handle {
            type Target = $crate::messaging::Message;

            fn deref(&self) -> &Self::Target {
                &self.message
            }
        }

        impl From<$handle> for $crate::messaging::Message {
            fn from(handle: $handle) -> Self {
                handle.message
            }
        }
    };
}

pub(crate) use message_handle;
