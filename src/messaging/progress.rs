//! Progress bar message.

use tracing::warn;

use super::message::{message_handle, Message, MessageKind};

/// Number of cells in the rendered bar.
const BAR_CELLS: usize = 10;

/// Range and rendering options for a [`ProgressMessage`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressConfig {
    pub min: f64,
    pub max: f64,
    /// Render `[****      ]`.
    pub show_bar: bool,
    /// Render `40.0%`.
    pub show_value: bool,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 100.0,
            show_bar: true,
            show_value: true,
        }
    }
}

pub(crate) struct ProgressState {
    config: ProgressConfig,
    value: f64,
}

impl ProgressState {
    fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.config.min;
        }
        value.clamp(self.config.min, self.config.max)
    }

    /// Completed share in `0.0..=1.0`; an empty range counts as nothing done.
    fn fraction(&self) -> f64 {
        let span = self.config.max - self.config.min;
        if span <= 0.0 {
            return 0.0;
        }
        ((self.value - self.config.min) / span).clamp(0.0, 1.0)
    }

    pub(crate) fn render(&self) -> Option<String> {
        let fraction = self.fraction();
        let mut parts = Vec::with_capacity(2);
        if self.config.show_bar {
            let filled = ((BAR_CELLS as f64 * fraction).floor() as usize).min(BAR_CELLS);
            parts.push(format!(
                "[{}{}]",
                "*".repeat(filled),
                " ".repeat(BAR_CELLS - filled)
            ));
        }
        if self.config.show_value {
            parts.push(format!("{:.1}%", fraction * 100.0));
        }
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

/// A numeric progress indicator.
#[derive(Clone, Debug)]
pub struct ProgressMessage {
    message: Message,
}

message_handle!(ProgressMessage, Progress, ProgressState);

impl ProgressMessage {
    /// Create a detached progress message starting at `config.min`.
    pub fn new(config: ProgressConfig) -> Self {
        let config = ordered(config);
        Self {
            message: Message::new(MessageKind::Progress(ProgressState {
                value: config.min,
                config,
            })),
        }
    }

    pub fn value(&self) -> f64 {
        self.with(|progress| progress.value).unwrap_or(0.0)
    }

    /// Set the value, clamped into `[min, max]`. Unchanged values are ignored.
    pub fn set_value(&self, value: f64) {
        let changed = self
            .with(|progress| {
                let value = progress.clamp(value);
                if value == progress.value {
                    return false;
                }
                progress.value = value;
                true
            })
            .unwrap_or(false);
        if changed {
            self.message.update();
        }
    }

    /// Change the range, re-clamping the current value.
    pub fn set_range(&self, min: f64, max: f64) {
        let changed = self
            .with(|progress| {
                let config = ordered(ProgressConfig {
                    min,
                    max,
                    ..progress.config
                });
                if config == progress.config {
                    return false;
                }
                let before = progress.render();
                progress.config = config;
                progress.value = progress.clamp(progress.value);
                progress.render() != before
            })
            .unwrap_or(false);
        if changed {
            self.message.update();
        }
    }
}

/// Make the bounds usable for clamping: finite, with `min <= max`.
///
/// A NaN or infinite bound falls back to the default bound.
fn ordered(mut config: ProgressConfig) -> ProgressConfig {
    let defaults = ProgressConfig::default();
    if !config.min.is_finite() {
        warn!(min = config.min, "Non-finite progress minimum replaced");
        config.min = defaults.min;
    }
    if !config.max.is_finite() {
        warn!(max = config.max, "Non-finite progress maximum replaced");
        config.max = defaults.max;
    }
    if config.min > config.max {
        std::mem::swap(&mut config.min, &mut config.max);
    }
    config
}
