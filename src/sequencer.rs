//! Announcement sequencer.
//!
//! Announcements run strictly one at a time, in the order `announce` was
//! called. Each one walks through: show text, play an earcon, speak, dwell
//! for its minimum duration, hide text. After [`AnnouncementSequencer::deactivate`]
//! nothing further reaches a device; in-flight and queued announcements
//! resolve as [`AnnouncementOutcome::Abandoned`].

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::composer::DisplayComposer;
use crate::drivers::{AudioDriver, MuteState, Severity};
use crate::messaging::TextMessage;

/// Sequencer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Repeat earcons of equal or lower severity are skipped within this window.
    pub icon_throttle_window: Duration,
    /// Bound on playing one earcon.
    pub icon_timeout: Duration,
    /// Bound on speaking one announcement.
    pub speech_timeout: Duration,
    /// Minimum dwell for announcements that do not set their own.
    pub default_duration: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            icon_throttle_window: Duration::from_secs(20),
            icon_timeout: Duration::from_secs(5),
            speech_timeout: Duration::from_secs(30),
            default_duration: Duration::ZERO,
        }
    }
}

/// One announcement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub text: String,
    pub severity: Severity,
    /// Speak the text.
    pub verbal: bool,
    /// Play the earcon for `severity`.
    pub audio_icon: bool,
    /// Show the text on the display while the announcement runs.
    pub visual: bool,
    /// Minimum time the announcement occupies the queue.
    pub duration: Option<Duration>,
}

impl Announcement {
    /// Spoken, shown, with an earcon, at the lowest severity.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::default(),
            verbal: true,
            audio_icon: true,
            visual: true,
            duration: None,
        }
    }

    pub fn severity(mut self, severity: impl Into<Severity>) -> Self {
        self.severity = severity.into();
        self
    }

    pub fn verbal(mut self, verbal: bool) -> Self {
        self.verbal = verbal;
        self
    }

    pub fn audio_icon(mut self, audio_icon: bool) -> Self {
        self.audio_icon = audio_icon;
        self
    }

    pub fn visual(mut self, visual: bool) -> Self {
        self.visual = visual;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// How an announcement ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    Completed,
    /// The sequencer was deactivated before the announcement finished.
    Abandoned,
}

/// Last earcon that actually played.
#[derive(Debug, Clone, Copy)]
struct PlayedIcon {
    severity: Severity,
    at: Instant,
}

struct SequencerShared {
    composer: DisplayComposer,
    audio: Arc<dyn AudioDriver>,
    mute: Arc<dyn MuteState>,
    config: SequencerConfig,
    active: watch::Sender<bool>,
    /// Completion signal of the most recently queued announcement.
    tail: Mutex<Option<oneshot::Receiver<()>>>,
    last_icon: Mutex<Option<PlayedIcon>>,
}

impl SequencerShared {
    fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    async fn perform(&self, announcement: Announcement) -> AnnouncementOutcome {
        if !self.is_active() {
            debug!(text = %announcement.text, "Sequencer inactive, announcement dropped");
            return AnnouncementOutcome::Abandoned;
        }

        let _visual = ShownText(
            announcement
                .visual
                .then(|| self.composer.show_text(announcement.text.clone())),
        );
        let deadline =
            Instant::now() + announcement.duration.unwrap_or(self.config.default_duration);

        if announcement.audio_icon && !self.mute.is_muted() {
            self.play_icon(announcement.severity).await;
        }

        if !self.is_active() {
            return abandon(&announcement.text);
        }

        if announcement.verbal && !self.mute.is_muted() {
            self.speak(&announcement.text).await;
        }

        self.dwell(deadline).await;

        if !self.is_active() {
            return abandon(&announcement.text);
        }
        AnnouncementOutcome::Completed
    }

    /// Play the earcon unless an equally or more severe one played recently.
    async fn play_icon(&self, severity: Severity) {
        let now = Instant::now();
        if let Some(last) = *self.last_icon.lock() {
            let recent = now.duration_since(last.at) < self.config.icon_throttle_window;
            if recent && severity <= last.severity {
                debug!(
                    severity = severity.level(),
                    last = last.severity.level(),
                    "Earcon throttled"
                );
                return;
            }
        }

        let icon = severity.audio_icon();
        match timeout(self.config.icon_timeout, self.audio.play_audio_icon(icon)).await {
            Ok(Ok(())) => {
                *self.last_icon.lock() = Some(PlayedIcon { severity, at: now });
            }
            Ok(Err(err)) => warn!(icon = icon.name(), error = %err, "Earcon failed"),
            Err(_) => debug!(icon = icon.name(), "Earcon timed out"),
        }
    }

    async fn speak(&self, text: &str) {
        match timeout(self.config.speech_timeout, self.audio.speak(text)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "Speech failed"),
            Err(_) => debug!(text = %text, "Speech timed out"),
        }
    }

    /// Wait out the minimum duration, cut short by deactivation.
    async fn dwell(&self, deadline: Instant) {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = deactivated(self.active.subscribe()) => {}
        }
    }
}

fn abandon(text: &str) -> AnnouncementOutcome {
    debug!(text = %text, "Announcement abandoned");
    AnnouncementOutcome::Abandoned
}

/// Text shown for an announcement, hidden when the announcement ends.
///
/// Ending includes the announce future being dropped part way through.
struct ShownText(Option<TextMessage>);

impl Drop for ShownText {
    fn drop(&mut self) {
        if let Some(message) = self.0.take() {
            if message.is_shown() {
                message.hide();
            }
        }
    }
}

/// A place in the announcement queue.
///
/// `previous` resolves when the announcement ahead finishes; `done` signals
/// the one behind. A slot dropped before its turn passes the predecessor's
/// completion on, so the queue behind it keeps waiting.
struct QueueSlot {
    previous: Option<oneshot::Receiver<()>>,
    done: Option<oneshot::Sender<()>>,
}

impl QueueSlot {
    async fn wait_turn(&mut self) {
        if let Some(previous) = self.previous.as_mut() {
            // An error only means the previous holder went away for good.
            let _ = previous.await;
        }
        self.previous = None;
    }

    fn finish(mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}

impl Drop for QueueSlot {
    fn drop(&mut self) {
        let (Some(previous), Some(done)) = (self.previous.take(), self.done.take()) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = previous.await;
                    let _ = done.send(());
                });
            }
            Err(_) => warn!("Announcement dropped outside a runtime, queue released early"),
        }
    }
}

async fn deactivated(mut active: watch::Receiver<bool>) {
    loop {
        if !*active.borrow_and_update() {
            return;
        }
        if active.changed().await.is_err() {
            return;
        }
    }
}

/// Serializes announcements onto the display and audio channel.
#[derive(Clone)]
pub struct AnnouncementSequencer {
    shared: Arc<SequencerShared>,
}

impl AnnouncementSequencer {
    pub fn new(
        composer: DisplayComposer,
        audio: Arc<dyn AudioDriver>,
        mute: Arc<dyn MuteState>,
        config: SequencerConfig,
    ) -> Self {
        let (active, _) = watch::channel(true);
        Self {
            shared: Arc::new(SequencerShared {
                composer,
                audio,
                mute,
                config,
                active,
                tail: Mutex::new(None),
                last_icon: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.shared.config
    }

    /// Queue an announcement.
    ///
    /// The queue position is taken when this is called, not when the returned
    /// future is first polled. Dropping the future gives the position up
    /// without letting later announcements overtake earlier ones, and hides
    /// any text it had put on the display.
    pub fn announce(
        &self,
        announcement: Announcement,
    ) -> impl Future<Output = AnnouncementOutcome> + Send + 'static {
        let (done, turn) = oneshot::channel::<()>();
        let mut slot = QueueSlot {
            previous: self.shared.tail.lock().replace(turn),
            done: Some(done),
        };
        let shared = Arc::clone(&self.shared);
        async move {
            slot.wait_turn().await;
            let outcome = shared.perform(announcement).await;
            slot.finish();
            outcome
        }
    }

    /// Stop performing announcements. Irreversible.
    pub fn deactivate(&self) {
        if self.shared.active.send_replace(false) {
            debug!("Announcement sequencer deactivated");
        }
    }

    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }
}

impl std::fmt::Debug for AnnouncementSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnnouncementSequencer")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composer::ComposerConfig;
    use crate::drivers::AudioIcon;
    use crate::testing::{settle, Event, EventLog, RecordingAudio, RecordingDisplay};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::{assert_pending, assert_ready_eq, task};

    struct Rig {
        log: EventLog,
        audio: Arc<RecordingAudio>,
        mute: Arc<AtomicBool>,
        composer: DisplayComposer,
        sequencer: AnnouncementSequencer,
    }

    fn rig(speech_time: Duration) -> Rig {
        rig_with(Duration::from_millis(10), speech_time)
    }

    fn rig_with(icon_time: Duration, speech_time: Duration) -> Rig {
        let log = EventLog::default();
        let display = RecordingDisplay::with_log(log.clone());
        let audio = RecordingAudio::new(log.clone(), icon_time, speech_time);
        let mute = Arc::new(AtomicBool::new(false));
        let composer = DisplayComposer::new(display, ComposerConfig::default());
        let sequencer = AnnouncementSequencer::new(
            composer.clone(),
            audio.clone(),
            mute.clone(),
            SequencerConfig::default(),
        );
        Rig {
            log,
            audio,
            mute,
            composer,
            sequencer,
        }
    }

    fn speech_only(text: &str) -> Announcement {
        Announcement::new(text).audio_icon(false).visual(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_announcements_run_in_call_order_without_overlap() {
        let rig = rig(Duration::from_millis(50));
        let handles: Vec<_> = ["one", "two", "three"]
            .into_iter()
            .map(|text| {
                tokio::spawn(
                    rig.sequencer
                        .announce(Announcement::new(text).duration(Duration::from_millis(100))),
                )
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap(), AnnouncementOutcome::Completed);
        }

        let speech: Vec<_> = rig
            .log
            .events()
            .into_iter()
            .filter(|event| matches!(event, Event::SpeechStarted(_) | Event::SpeechFinished(_)))
            .collect();
        assert_eq!(
            speech,
            vec![
                Event::SpeechStarted("one".into()),
                Event::SpeechFinished("one".into()),
                Event::SpeechStarted("two".into()),
                Event::SpeechFinished("two".into()),
                Event::SpeechStarted("three".into()),
                Event::SpeechFinished("three".into()),
            ]
        );

        let lines: Vec<_> = rig
            .log
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Display(line) => Some(line),
                _ => None,
            })
            .collect();
        assert_eq!(lines, vec!["one", "two", "three"]);
        assert!(rig.composer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_position_taken_at_call_time() {
        let rig = rig(Duration::from_millis(50));
        let mut first = task::spawn(rig.sequencer.announce(speech_only("first")));
        let mut second = task::spawn(rig.sequencer.announce(speech_only("second")));

        // Polling the second first must not let it jump the queue.
        assert_pending!(second.poll());
        assert_pending!(first.poll());
        assert_eq!(rig.log.events(), vec![Event::SpeechStarted("first".into())]);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_ready_eq!(first.poll(), AnnouncementOutcome::Completed);
        assert_pending!(second.poll());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_ready_eq!(second.poll(), AnnouncementOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_announcement_releases_queue() {
        let rig = rig(Duration::from_millis(50));
        let abandoned = rig.sequencer.announce(speech_only("never"));
        let next = rig.sequencer.announce(speech_only("next"));
        drop(abandoned);
        assert_eq!(next.await, AnnouncementOutcome::Completed);
        assert_eq!(
            rig.log.events(),
            vec![
                Event::SpeechStarted("next".into()),
                Event::SpeechFinished("next".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_keeps_queue_exclusive() {
        let rig = rig(Duration::from_millis(100));
        let first = tokio::spawn(rig.sequencer.announce(speech_only("first")));
        let middle = rig.sequencer.announce(speech_only("middle"));
        let third = tokio::spawn(rig.sequencer.announce(speech_only("third")));

        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(middle);

        assert_eq!(first.await.unwrap(), AnnouncementOutcome::Completed);
        assert_eq!(third.await.unwrap(), AnnouncementOutcome::Completed);
        assert_eq!(
            rig.log.events(),
            vec![
                Event::SpeechStarted("first".into()),
                Event::SpeechFinished("first".into()),
                Event::SpeechStarted("third".into()),
                Event::SpeechFinished("third".into()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_waiter_keeps_queue_exclusive() {
        let rig = rig(Duration::from_millis(100));
        let first = tokio::spawn(rig.sequencer.announce(speech_only("first")));
        let middle = tokio::spawn(rig.sequencer.announce(speech_only("middle")));
        let third = tokio::spawn(rig.sequencer.announce(speech_only("third")));

        tokio::time::sleep(Duration::from_millis(10)).await;
        middle.abort();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(rig.log.events(), vec![Event::SpeechStarted("first".into())]);

        first.await.unwrap();
        third.await.unwrap();
        assert_eq!(rig.log.events().len(), 4);
        assert_eq!(rig.log.events()[2], Event::SpeechStarted("third".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_announcement_clears_its_text() {
        let rig = rig(Duration::from_secs(60));
        let cut_short = tokio::time::timeout(
            Duration::from_millis(50),
            rig.sequencer.announce(Announcement::new("stuck").audio_icon(false)),
        )
        .await;
        assert!(cut_short.is_err());

        settle().await;
        assert!(rig.composer.is_empty());
        assert_eq!(rig.composer.composed_line(), "");

        // Nothing keeps re-pushing the text afterwards.
        let pushed = rig.log.events().len();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rig.log.events().len(), pushed);

        // The queue is free again.
        let outcome = rig
            .sequencer
            .announce(Announcement::new("next").verbal(false).audio_icon(false))
            .await;
        assert_eq!(outcome, AnnouncementOutcome::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_icon_throttle() {
        let rig = rig(Duration::from_millis(10));
        let silent = |severity: i32| {
            Announcement::new("ping")
                .severity(severity)
                .verbal(false)
                .visual(false)
        };

        rig.sequencer.announce(silent(3)).await;
        rig.sequencer.announce(silent(3)).await;
        assert_eq!(rig.audio.icons(), vec![AudioIcon::Attention]);

        // Higher severity overrides the throttle.
        rig.sequencer.announce(silent(9)).await;
        assert_eq!(rig.audio.icons(), vec![AudioIcon::Attention, AudioIcon::Alarm]);

        // Lower severity stays throttled until the window passes.
        rig.sequencer.announce(silent(1)).await;
        assert_eq!(rig.audio.icons().len(), 2);
        tokio::time::sleep(Duration::from_secs(20)).await;
        rig.sequencer.announce(silent(1)).await;
        assert_eq!(
            rig.audio.icons(),
            vec![AudioIcon::Attention, AudioIcon::Alarm, AudioIcon::Notice]
        );
    }

    fn earcon_only(severity: i32) -> Announcement {
        Announcement::new("ping")
            .severity(severity)
            .verbal(false)
            .visual(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_icon_timeout_is_not_fatal() {
        let rig = rig_with(Duration::from_secs(6), Duration::from_millis(10));
        let start = Instant::now();
        let outcome = rig.sequencer.announce(earcon_only(3)).await;
        assert_eq!(outcome, AnnouncementOutcome::Completed);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert!(rig.audio.icons().is_empty());
        assert!(rig.sequencer.shared.last_icon.lock().is_none());

        // A timed out earcon does not throttle the next one.
        rig.sequencer.announce(earcon_only(3)).await;
        assert_eq!(rig.audio.icon_attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_icon_failure_is_not_fatal() {
        let rig = rig(Duration::from_millis(10));
        rig.audio.set_failing_icons(true);
        let outcome = rig.sequencer.announce(earcon_only(3)).await;
        assert_eq!(outcome, AnnouncementOutcome::Completed);
        assert!(rig.audio.icons().is_empty());
        assert!(rig.sequencer.shared.last_icon.lock().is_none());

        rig.audio.set_failing_icons(false);
        rig.sequencer.announce(earcon_only(3)).await;
        assert_eq!(rig.audio.icon_attempts(), 2);
        assert_eq!(rig.audio.icons(), vec![AudioIcon::Attention]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_muted_skips_audio_but_still_shows() {
        let rig = rig(Duration::from_millis(10));
        rig.mute.store(true, Ordering::Relaxed);
        let outcome = rig
            .sequencer
            .announce(Announcement::new("quiet").duration(Duration::from_millis(5)))
            .await;
        assert_eq!(outcome, AnnouncementOutcome::Completed);
        assert_eq!(rig.log.events(), vec![Event::Display("quiet".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speech_timeout_is_not_fatal() {
        let rig = rig(Duration::from_secs(60));
        let start = Instant::now();
        let outcome = rig.sequencer.announce(speech_only("long")).await;
        assert_eq!(outcome, AnnouncementOutcome::Completed);
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(rig.log.events(), vec![Event::SpeechStarted("long".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visual_kept_for_duration() {
        let rig = rig(Duration::from_millis(10));
        let announcement = rig.sequencer.announce(
            Announcement::new("Download complete")
                .verbal(false)
                .audio_icon(false)
                .duration(Duration::from_millis(500)),
        );
        let handle = tokio::spawn(announcement);
        settle().await;
        assert_eq!(rig.composer.composed_line(), "Download complete");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(rig.composer.composed_line(), "Download complete");
        assert_eq!(handle.await.unwrap(), AnnouncementOutcome::Completed);
        assert_eq!(rig.composer.composed_line(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivated_sequencer_does_nothing() {
        let rig = rig(Duration::from_millis(10));
        rig.sequencer.deactivate();
        let start = Instant::now();
        let outcome = rig.sequencer.announce(Announcement::new("late")).await;
        assert_eq!(outcome, AnnouncementOutcome::Abandoned);
        assert_eq!(start.elapsed(), Duration::ZERO);
        settle().await;
        assert!(rig.log.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivation_mid_flight_abandons_queue() {
        let rig = rig(Duration::from_millis(100));
        let first = tokio::spawn(
            rig.sequencer
                .announce(speech_only("first").duration(Duration::from_secs(60))),
        );
        let second = tokio::spawn(rig.sequencer.announce(Announcement::new("second")));

        tokio::time::sleep(Duration::from_millis(50)).await;
        rig.sequencer.deactivate();

        let start = Instant::now();
        assert_eq!(first.await.unwrap(), AnnouncementOutcome::Abandoned);
        assert_eq!(second.await.unwrap(), AnnouncementOutcome::Abandoned);
        // Outstanding speech finishes, the long dwell does not.
        assert!(start.elapsed() <= Duration::from_millis(50));
        assert_eq!(
            rig.log.events(),
            vec![
                Event::SpeechStarted("first".into()),
                Event::SpeechFinished("first".into()),
            ]
        );
    }
}
