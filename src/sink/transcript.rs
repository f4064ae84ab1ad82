//! Final visible text of a chunk stream
//!
//! Replays [`TerminalOutputChunk`]s the way a viewer would: appended chunks
//! continue at the end of the output, positioned chunks overwrite in place.

use crate::core::term::{CursorPosition, OutputSink, TerminalOutputChunk};

#[derive(Debug, Clone)]
pub struct Transcript {
    lines: Vec<String>,
    /// Furthest position written
    end: CursorPosition,
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcript {
    pub fn new() -> Self {
        Self {
            lines: vec![String::new()],
            end: CursorPosition::default(),
        }
    }

    pub fn end(&self) -> CursorPosition {
        self.end
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Visible text, lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    /// Apply one chunk. Returns the position right after its text.
    pub fn apply(&mut self, chunk: &TerminalOutputChunk) -> CursorPosition {
        let start = chunk.custom_position.unwrap_or(self.end);
        let cursor = self.write_at(start, chunk.text());
        self.end = self.end.max(cursor);
        cursor
    }

    fn write_at(&mut self, start: CursorPosition, text: &str) -> CursorPosition {
        let mut cursor = start;

        for (i, segment) in text.split('\n').enumerate() {
            if i > 0 {
                cursor = CursorPosition::new(0, cursor.y + 1);
            }
            while self.lines.len() <= cursor.y {
                self.lines.push(String::new());
            }
            overwrite(&mut self.lines[cursor.y], cursor.x, segment);
            cursor.x += segment.chars().count();
        }

        cursor
    }
}

/// Replace the characters of `line` starting at column `x`, padding with
/// spaces if the line is shorter
fn overwrite(line: &mut String, x: usize, segment: &str) {
    if segment.is_empty() {
        return;
    }

    let mut chars: Vec<char> = line.chars().collect();
    if chars.len() < x {
        chars.resize(x, ' ');
    }
    let end = (x + segment.chars().count()).min(chars.len());
    chars.splice(x..end, segment.chars());
    *line = chars.into_iter().collect();
}

impl OutputSink for Transcript {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        self.apply(&chunk);
    }
}
