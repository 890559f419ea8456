//! Recording drivers shared by the unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::drivers::{AudioDriver, AudioIcon, DisplayDriver, DriverError};

/// Something that reached an output device.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Event {
    Display(String),
    Icon(AudioIcon),
    SpeechStarted(String),
    SpeechFinished(String),
}

/// Event log shared between fake devices, so ordering across them is visible.
#[derive(Clone, Default)]
pub(crate) struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub(crate) fn push(&self, event: Event) {
        self.0.lock().push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.0.lock().clone()
    }
}

pub(crate) struct RecordingDisplay {
    log: EventLog,
    failing: AtomicBool,
    attempts: AtomicUsize,
    push_time: Mutex<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingDisplay {
    pub(crate) fn new() -> Arc<Self> {
        Self::with_log(EventLog::default())
    }

    pub(crate) fn with_log(log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            log,
            failing: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
            push_time: Mutex::new(Duration::ZERO),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    /// Make every push take this long before it lands.
    pub(crate) fn set_push_time(&self, push_time: Duration) {
        *self.push_time.lock() = push_time;
    }

    /// Most pushes ever in progress at the same time.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.log.events()
    }

    /// Lines that were pushed successfully.
    pub(crate) fn lines(&self) -> Vec<String> {
        self.log
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Display(line) => Some(line),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl DisplayDriver for RecordingDisplay {
    async fn show_message(&self, line: &str) -> Result<(), DriverError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let push_time = *self.push_time.lock();
        if !push_time.is_zero() {
            tokio::time::sleep(push_time).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(DriverError::Failed("display unplugged".to_string()));
        }
        self.log.push(Event::Display(line.to_string()));
        Ok(())
    }
}

pub(crate) struct RecordingAudio {
    log: EventLog,
    icon_time: Duration,
    speech_time: Duration,
    failing_icons: AtomicBool,
    icon_attempts: AtomicUsize,
}

impl RecordingAudio {
    pub(crate) fn new(log: EventLog, icon_time: Duration, speech_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            log,
            icon_time,
            speech_time,
            failing_icons: AtomicBool::new(false),
            icon_attempts: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_failing_icons(&self, failing: bool) {
        self.failing_icons.store(failing, Ordering::SeqCst);
    }

    /// Earcon calls made, whether or not they finished.
    pub(crate) fn icon_attempts(&self) -> usize {
        self.icon_attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn icons(&self) -> Vec<AudioIcon> {
        self.log
            .events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Icon(icon) => Some(icon),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl AudioDriver for RecordingAudio {
    async fn play_audio_icon(&self, icon: AudioIcon) -> Result<(), DriverError> {
        self.icon_attempts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.icon_time).await;
        if self.failing_icons.load(Ordering::SeqCst) {
            return Err(DriverError::Unavailable("no sound card".to_string()));
        }
        self.log.push(Event::Icon(icon));
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), DriverError> {
        self.log.push(Event::SpeechStarted(text.to_string()));
        tokio::time::sleep(self.speech_time).await;
        self.log.push(Event::SpeechFinished(text.to_string()));
        Ok(())
    }
}

/// Let queued composer work run without reaching any refresh deadline.
pub(crate) async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
