//! Emitted events
//!
//! The emulator reports its output as a stream of [`TerminalOutputChunk`]s,
//! pushed in order into an [`OutputSink`].

use std::cmp::Ordering;
use std::sync::mpsc::Sender;

use serde::Serialize;

use super::graphics::{GraphicsState, TextColor, TextStyles};

/// Position on the emulated screen.
///
/// `y` is the logical line, `x` the column within that line. Positions are
/// ordered line first, then column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CursorPosition {
    pub x: usize,
    pub y: usize,
}

impl CursorPosition {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl Ord for CursorPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for CursorPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A run of literal text together with the graphics state it was written in
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedText {
    pub text: String,
    pub text_color: Option<TextColor>,
    pub background_color: Option<TextColor>,
    pub styles: TextStyles,
}

impl FormattedText {
    /// Snapshot `graphics` for `text`. Later changes to the live state do not
    /// affect the returned value.
    pub fn new(text: impl Into<String>, graphics: &GraphicsState) -> Self {
        Self {
            text: text.into(),
            text_color: graphics.text_color,
            background_color: graphics.background_color,
            styles: graphics.styles,
        }
    }

    /// Unstyled text
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, &GraphicsState::default())
    }
}

/// One update for a downstream viewer.
///
/// `custom_position` is `None` when the text simply continues the output
/// (append it), and set when the text must be written at that coordinate,
/// replacing what is already there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminalOutputChunk {
    pub formatted_text: FormattedText,
    pub custom_position: Option<CursorPosition>,
}

impl TerminalOutputChunk {
    pub fn text(&self) -> &str {
        &self.formatted_text.text
    }

    pub fn is_append(&self) -> bool {
        self.custom_position.is_none()
    }
}

/// Receiver of emulator output.
///
/// `push` is called synchronously from within `feed`/`flush_remaining` and
/// must not feed the same emulator again.
pub trait OutputSink {
    fn push(&mut self, chunk: TerminalOutputChunk);

    /// Called once when the stream has been drained
    fn close(&mut self) {}
}

impl OutputSink for Vec<TerminalOutputChunk> {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        Vec::push(self, chunk);
    }
}

impl OutputSink for Sender<TerminalOutputChunk> {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        if self.send(chunk).is_err() {
            tracing::debug!("output receiver disconnected, dropping chunk");
        }
    }
}

impl<F> OutputSink for F
where
    F: FnMut(TerminalOutputChunk),
{
    fn push(&mut self, chunk: TerminalOutputChunk) {
        self(chunk)
    }
}
