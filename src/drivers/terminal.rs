//! Terminal line display.
//!
//! Stands in for a remote text display by rewriting the current terminal line.

use async_trait::async_trait;
use crossterm::{
    cursor::MoveToColumn,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
    QueueableCommand,
};
use std::io::{stdout, Write};

use super::{DisplayDriver, DriverError};

/// Display driver that draws the composed line on the terminal.
pub struct TerminalDisplay {
    color: Color,
}

impl TerminalDisplay {
    pub fn new() -> Self {
        Self { color: Color::Cyan }
    }

    pub fn with_color(color: Color) -> Self {
        Self { color }
    }

    fn draw(&self, line: &str) -> std::io::Result<()> {
        let mut stdout = stdout();
        stdout.queue(MoveToColumn(0))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        if !line.is_empty() {
            stdout.queue(SetForegroundColor(self.color))?;
            stdout.queue(Print(line))?;
            stdout.queue(ResetColor)?;
        }
        stdout.flush()
    }
}

impl Default for TerminalDisplay {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DisplayDriver for TerminalDisplay {
    async fn show_message(&self, line: &str) -> Result<(), DriverError> {
        self.draw(line)?;
        Ok(())
    }
}
