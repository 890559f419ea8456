//! Notification center: one composer plus one sequencer sharing a display.

use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::composer::DisplayComposer;
use crate::config::Settings;
use crate::drivers::{AudioDriver, DisplayDriver, MuteState};
use crate::sequencer::{Announcement, AnnouncementOutcome, AnnouncementSequencer};

/// Entry point wiring the display composer and the announcement sequencer.
#[derive(Clone, Debug)]
pub struct NotificationCenter {
    composer: DisplayComposer,
    sequencer: AnnouncementSequencer,
}

impl NotificationCenter {
    pub fn new(
        display: Arc<dyn DisplayDriver>,
        audio: Arc<dyn AudioDriver>,
        mute: Arc<dyn MuteState>,
        settings: &Settings,
    ) -> Self {
        let composer = DisplayComposer::new(display, settings.composer_config());
        let sequencer =
            AnnouncementSequencer::new(composer.clone(), audio, mute, settings.sequencer_config());
        Self {
            composer,
            sequencer,
        }
    }

    pub fn composer(&self) -> &DisplayComposer {
        &self.composer
    }

    pub fn sequencer(&self) -> &AnnouncementSequencer {
        &self.sequencer
    }

    /// See [`AnnouncementSequencer::announce`].
    pub fn announce(
        &self,
        announcement: Announcement,
    ) -> impl Future<Output = AnnouncementOutcome> + Send + 'static {
        self.sequencer.announce(announcement)
    }

    /// Deactivate announcements and tear down every shown message.
    pub fn dispose(&self) {
        self.sequencer.deactivate();
        self.composer.dispose();
        info!("Notification center disposed");
    }
}
