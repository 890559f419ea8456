//! Messages shown on the shared display.
//!
//! Provides:
//! - [`Message`], the handle every variant dereferences to
//! - [`TextMessage`] for static text
//! - [`HudMessage`] for labels that flash on and off
//! - [`SpinnerMessage`] for activity indication
//! - [`ProgressMessage`] for a bar and/or percentage

pub(crate) mod message;
mod hud;
mod progress;
mod spinner;
mod text;

pub use hud::{HudMessage, HudOptions};
pub use message::Message;
pub use progress::{ProgressConfig, ProgressMessage};
pub use spinner::{SpinnerConfig, SpinnerMessage, BOUNCE, CIRCLE, DOTS, LINE};
pub use text::TextMessage;
