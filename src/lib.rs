//! Herald Library
//!
//! Coordinates everything that wants to reach one shared output surface:
//! a remote text display (for example a braille line) plus a speech/audio
//! channel.
//!
//! - [`composer::DisplayComposer`] joins the text of every live
//!   [`messaging::Message`] into one line and pushes it, debounced.
//! - [`sequencer::AnnouncementSequencer`] runs announcements one at a time,
//!   in call order.
//! - [`center::NotificationCenter`] owns one of each.

pub mod center;
pub mod composer;
pub mod config;
pub mod drivers;
pub mod messaging;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testing;

pub use center::NotificationCenter;
pub use composer::{ComposerConfig, DisplayComposer};
pub use drivers::{AudioDriver, AudioIcon, DisplayDriver, DriverError, MuteState, Severity};
pub use messaging::{HudMessage, Message, ProgressMessage, SpinnerMessage, TextMessage};
pub use sequencer::{Announcement, AnnouncementOutcome, AnnouncementSequencer, SequencerConfig};
