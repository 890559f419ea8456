//! System TTS audio driver.

use async_trait::async_trait;
use std::io::{stdout, Write};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{AudioDriver, AudioIcon, DriverError};

/// Speech programs to look for, in order of preference.
const SPEECH_PROGRAMS: &[&str] = &["espeak-ng", "espeak", "say"];

/// Gap between bell rings of one earcon.
const BELL_GAP: Duration = Duration::from_millis(120);

/// Audio driver backed by a speech binary on `PATH` and the terminal bell.
pub struct CommandSpeech {
    program: Option<PathBuf>,
}

impl CommandSpeech {
    /// Locate the first available speech program.
    pub fn detect() -> Self {
        let program = SPEECH_PROGRAMS
            .iter()
            .find_map(|name| which::which(name).ok());
        match &program {
            Some(path) => debug!(program = %path.display(), "Using speech program"),
            None => debug!("No speech program found, speech disabled"),
        }
        Self { program }
    }

    /// Use an explicit speech program.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    /// Whether a speech program is available.
    pub fn can_speak(&self) -> bool {
        self.program.is_some()
    }
}

fn bell_count(icon: AudioIcon) -> usize {
    match icon {
        AudioIcon::Notice => 1,
        AudioIcon::Attention => 2,
        AudioIcon::Alarm => 3,
    }
}

#[async_trait]
impl AudioDriver for CommandSpeech {
    async fn play_audio_icon(&self, icon: AudioIcon) -> Result<(), DriverError> {
        for i in 0..bell_count(icon) {
            if i > 0 {
                tokio::time::sleep(BELL_GAP).await;
            }
            let mut stdout = stdout();
            stdout.write_all(b"\x07")?;
            stdout.flush()?;
        }
        Ok(())
    }

    async fn speak(&self, text: &str) -> Result<(), DriverError> {
        let program = self.program.as_ref().ok_or_else(|| {
            DriverError::Unavailable(format!(
                "none of {} found on PATH",
                SPEECH_PROGRAMS.join(", ")
            ))
        })?;

        let status = Command::new(program)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(DriverError::Failed(format!(
                "{} exited with {}",
                program.display(),
                status
            )))
        }
    }
}
