//! Live terminal preview using crossterm
//!
//! Renders chunks as a viewer would see them. The terminal cursor is kept
//! at the end of the output; positioned chunks move up to their line, draw,
//! and move back.

use std::io::{self, Write};

use crossterm::{
    cursor::{MoveDown, MoveToColumn, MoveUp},
    execute, queue,
    style::{
        Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
};
use tracing::warn;

use super::{SinkError, Transcript};
use crate::core::term::{
    CursorPosition, FormattedText, OutputSink, TerminalOutputChunk, TextColor, TextStyles,
};

/// Map a named color to the crossterm palette
fn to_crossterm(color: TextColor) -> Color {
    match color {
        TextColor::Black => Color::Black,
        TextColor::Red => Color::DarkRed,
        TextColor::Green => Color::DarkGreen,
        TextColor::Yellow => Color::DarkYellow,
        TextColor::Blue => Color::DarkBlue,
        TextColor::Magenta => Color::DarkMagenta,
        TextColor::Cyan => Color::DarkCyan,
        TextColor::LightGray => Color::Grey,
        TextColor::DarkGray => Color::DarkGrey,
        TextColor::LightRed => Color::Red,
        TextColor::LightGreen => Color::Green,
        TextColor::LightYellow => Color::Yellow,
        TextColor::LightBlue => Color::Blue,
        TextColor::LightMagenta => Color::Magenta,
        TextColor::LightCyan => Color::Cyan,
        TextColor::White => Color::White,
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Terminal preview
pub struct PreviewSink<W: Write> {
    out: W,
    /// Mirrors what is on screen, to know where the cursor lands
    transcript: Transcript,
    error: Option<SinkError>,
}

impl<W: Write> PreviewSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: Transcript::new(),
            error: None,
        }
    }

    pub fn finish(mut self) -> Result<W, SinkError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }

    fn render(&mut self, chunk: &TerminalOutputChunk) -> io::Result<()> {
        let end = self.transcript.end();
        if let Some(position) = chunk.custom_position {
            self.move_between(end, position)?;
        }

        self.apply_attrs(&chunk.formatted_text)?;
        // Raw `\n` only moves down on some terminals
        queue!(self.out, Print(chunk.text().replace('\n', "\r\n")))?;
        queue!(self.out, ResetColor, SetAttribute(Attribute::Reset))?;

        let landed = self.transcript.apply(chunk);
        self.move_between(landed, self.transcript.end())?;
        self.out.flush()
    }

    fn move_between(&mut self, from: CursorPosition, to: CursorPosition) -> io::Result<()> {
        if from == to {
            return Ok(());
        }
        if to.y < from.y {
            queue!(self.out, MoveUp(clamp_u16(from.y - to.y)))?;
        } else if to.y > from.y {
            queue!(self.out, MoveDown(clamp_u16(to.y - from.y)))?;
        }
        queue!(self.out, MoveToColumn(clamp_u16(to.x)))
    }

    /// Apply text attributes
    fn apply_attrs(&mut self, text: &FormattedText) -> io::Result<()> {
        if text.styles.contains(TextStyles::BOLD) {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if text.styles.contains(TextStyles::DIM) {
            queue!(self.out, SetAttribute(Attribute::Dim))?;
        }
        if text.styles.contains(TextStyles::UNDERLINED) {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        if text.styles.contains(TextStyles::HIDDEN) {
            queue!(self.out, SetAttribute(Attribute::Hidden))?;
        }

        if let Some(color) = text.text_color {
            queue!(self.out, SetForegroundColor(to_crossterm(color)))?;
        }
        if let Some(color) = text.background_color {
            queue!(self.out, SetBackgroundColor(to_crossterm(color)))?;
        }
        Ok(())
    }
}

impl<W: Write> OutputSink for PreviewSink<W> {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self.render(&chunk) {
            warn!("preview output failed: {}", e);
            self.error = Some(e.into());
        }
    }

    fn close(&mut self) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = execute!(self.out, ResetColor, SetAttribute(Attribute::Reset)) {
            self.error = Some(e.into());
        }
    }
}
