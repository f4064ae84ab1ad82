//! Cursor-addressable buffer and diff emitter
//!
//! Models the emulated screen as far as downstream viewers need it: a cursor,
//! the furthest position ever flushed (the high-water mark), and whatever has
//! been written since the last flush. Text written at or after the high-water
//! mark is flushed as a plain append; text that lands on already flushed
//! territory is collected per line, coalesced, and flushed with explicit
//! positions.
//!
//! Flushed runs are queued and picked up with [`ScreenBuffer::take_flushed`].

use std::collections::BTreeMap;
use std::mem;

use super::output::CursorPosition;

/// Buffered text on one line, waiting to be flushed
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineChunk {
    text: String,
    x_start: usize,
    x_end: usize,
    y: usize,
}

impl LineChunk {
    fn new(text: String, x_start: usize, y: usize) -> Self {
        let x_end = x_start + text.chars().count();
        Self { text, x_start, x_end, y }
    }

    fn start(&self) -> CursorPosition {
        CursorPosition::new(self.x_start, self.y)
    }

    fn end(&self) -> CursorPosition {
        CursorPosition::new(self.x_end, self.y)
    }

    fn is_empty(&self) -> bool {
        self.x_start == self.x_end
    }

    /// Whether `newer` has to be merged with this chunk when inserted
    fn intersects(&self, newer: &LineChunk) -> bool {
        if self.is_empty() {
            return newer.x_start <= self.x_start && self.x_start <= newer.x_end;
        }
        self.x_start < newer.x_end && newer.x_start < self.x_end
    }

    /// Lay `newer` over this chunk; the newer text wins where they overlap
    fn overlay(&self, newer: LineChunk) -> LineChunk {
        let head: String = if self.x_start < newer.x_start {
            self.text.chars().take(newer.x_start - self.x_start).collect()
        } else {
            String::new()
        };
        let tail: String = if self.x_end > newer.x_end {
            self.text.chars().skip(newer.x_end - self.x_start).collect()
        } else {
            String::new()
        };

        LineChunk {
            text: head + &newer.text + &tail,
            x_start: self.x_start.min(newer.x_start),
            x_end: self.x_end.max(newer.x_end),
            y: self.y,
        }
    }
}

/// Chunks per line, each line kept sorted and free of overlaps
type ModifiedLines = BTreeMap<usize, Vec<LineChunk>>;

/// What has been written since the last flush
#[derive(Debug, Default)]
enum Pending {
    #[default]
    Idle,
    /// Text continuing the output from `origin`
    Appending { origin: CursorPosition, text: String },
    /// Text overwriting flushed output. `tail` holds what was written at the
    /// cursor since it last moved.
    Overwriting { lines: ModifiedLines, tail: String },
}

/// A run of text ready to be emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flushed {
    pub text: String,
    /// `None` for a plain append
    pub position: Option<CursorPosition>,
}

/// Emulated screen with lazy, minimal flushing
#[derive(Debug, Default)]
pub struct ScreenBuffer {
    cursor: CursorPosition,
    max_cursor: CursorPosition,
    pending: Pending,
    flushed: Vec<Flushed>,
}

impl ScreenBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cursor(&self) -> CursorPosition {
        self.cursor
    }

    /// Furthest position flushed so far
    pub fn max_cursor(&self) -> CursorPosition {
        self.max_cursor
    }

    /// Whether anything written is still waiting for a flush
    pub fn has_pending(&self) -> bool {
        !matches!(self.pending, Pending::Idle)
    }

    /// Take the runs flushed since the last call, in emission order
    pub fn take_flushed(&mut self) -> Vec<Flushed> {
        mem::take(&mut self.flushed)
    }

    /// Write literal text, interpreting `\r` and `\n`
    pub fn write(&mut self, text: &str) {
        let mut rest = text;
        while let Some(idx) = rest.find(|c| c == '\r' || c == '\n') {
            self.append(&rest[..idx]);
            if rest.as_bytes()[idx] == b'\r' {
                self.carriage_return();
            } else {
                self.line_feed();
            }
            rest = &rest[idx + 1..];
        }
        self.append(rest);
    }

    pub fn carriage_return(&mut self) {
        self.move_cursor(CursorPosition::new(0, self.cursor.y));
    }

    pub fn line_feed(&mut self) {
        self.move_cursor(CursorPosition::new(0, self.cursor.y + 1));
    }

    /// Write text at the cursor and advance it
    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        match &mut self.pending {
            Pending::Appending { text: buffer, .. } => buffer.push_str(text),
            Pending::Overwriting { tail, .. } => tail.push_str(text),
            pending @ Pending::Idle => {
                *pending = Pending::Appending {
                    origin: self.cursor,
                    text: text.to_string(),
                };
            }
        }
        self.cursor.x += text.chars().count();
    }

    pub fn move_cursor(&mut self, target: CursorPosition) {
        self.promote_single_chunk(target);

        let append_origin = match &self.pending {
            Pending::Idle => Some(self.cursor),
            Pending::Appending { origin, .. } => Some(*origin),
            Pending::Overwriting { .. } => None,
        };

        if let Some(origin) = append_origin {
            // Forward move past everything flushed: keep appending
            if origin >= self.max_cursor && target >= self.cursor {
                let gap = gap_text(self.cursor, target);
                if !gap.is_empty() {
                    self.append_gap(origin, gap);
                }
                self.cursor = target;
                return;
            }

            // A multi-line append cannot be repositioned
            let multi_line = matches!(
                &self.pending,
                Pending::Appending { text, .. } if text.contains('\n')
            );
            if multi_line {
                tracing::trace!("flushing multi-line append before moving back");
                self.flush();
                self.move_cursor(target);
                return;
            }
        }

        let lines = self.take_modified_lines();
        self.pending = Pending::Overwriting {
            lines,
            tail: String::new(),
        };

        let from = self.cursor;
        self.cursor = target;
        if target.y > self.max_cursor.y {
            self.reserve_lines(from, target);
        }

        // Nothing was overwritten after all
        let untouched = matches!(
            &self.pending,
            Pending::Overwriting { lines, tail } if lines.is_empty() && tail.is_empty()
        );
        if untouched {
            self.pending = Pending::Idle;
        }
    }

    /// Emit everything pending
    pub fn flush(&mut self) {
        let max_before = self.max_cursor;
        let mut furthest = self.cursor;

        match mem::take(&mut self.pending) {
            Pending::Idle => return,
            Pending::Appending { mut origin, text } => {
                let mut text = text.as_str();
                // A newline from a line that already exists lands on the next
                // existing line; write the rest there instead. `move_cursor`
                // turns such moves into placeholder lines first, so only an
                // append state built by hand reaches this loop.
                while origin.y < max_before.y {
                    match text.strip_prefix('\n') {
                        Some(rest) => {
                            text = rest;
                            origin = CursorPosition::new(0, origin.y + 1);
                        }
                        None => break,
                    }
                }
                if !text.is_empty() {
                    let position = (origin < max_before).then_some(origin);
                    self.emit(text.to_string(), position);
                }
            }
            Pending::Overwriting { mut lines, tail } => {
                if !tail.is_empty() {
                    let chunk = self.tail_chunk(tail);
                    add_modified_chunk(&mut lines, chunk);
                }
                furthest = furthest.max(self.emit_lines(lines, max_before));
            }
        }

        self.max_cursor = self.max_cursor.max(furthest);
    }

    /// Chunk for text just written on the cursor's line, ending at the cursor
    fn tail_chunk(&self, text: String) -> LineChunk {
        let len = text.chars().count();
        LineChunk::new(text, self.cursor.x.saturating_sub(len), self.cursor.y)
    }

    fn append_gap(&mut self, origin: CursorPosition, gap: String) {
        match &mut self.pending {
            Pending::Appending { text, .. } => text.push_str(&gap),
            Pending::Overwriting { .. } => unreachable!("gap appended while overwriting"),
            pending @ Pending::Idle => *pending = Pending::Appending { origin, text: gap },
        }
    }

    /// Turn a single pending chunk that the cursor moves past back into a
    /// plain append. It only looked like an overwrite because of a `\r`.
    fn promote_single_chunk(&mut self, target: CursorPosition) {
        let Pending::Overwriting { lines, tail } = &mut self.pending else {
            return;
        };
        if !tail.is_empty() || lines.len() != 1 {
            return;
        }
        let Some(chunks) = lines.values().next() else {
            return;
        };
        let [chunk] = chunks.as_slice() else {
            return;
        };
        if chunk.is_empty() || chunk.start() > self.max_cursor || target < chunk.end() {
            return;
        }

        let origin = chunk.start();
        let end = chunk.end();
        let text = chunk.text.clone();
        tracing::trace!("promoting chunk at {:?} back to append", origin);

        self.pending = Pending::Appending { origin, text };
        self.cursor = end;
    }

    /// Collect everything pending as line chunks
    fn take_modified_lines(&mut self) -> ModifiedLines {
        match mem::take(&mut self.pending) {
            Pending::Idle => ModifiedLines::new(),
            Pending::Appending { origin, text } => {
                let mut lines = ModifiedLines::new();
                add_modified_chunk(&mut lines, LineChunk::new(text, origin.x, origin.y));
                lines
            }
            Pending::Overwriting { mut lines, tail } => {
                if !tail.is_empty() {
                    let chunk = self.tail_chunk(tail);
                    add_modified_chunk(&mut lines, chunk);
                }
                lines
            }
        }
    }

    /// Keep a chunk on every line between the high-water mark and `to`, so
    /// flushing can join them with newlines.
    fn reserve_lines(&mut self, from: CursorPosition, to: CursorPosition) {
        let max = self.max_cursor;
        let Pending::Overwriting { lines, .. } = &mut self.pending else {
            return;
        };

        add_placeholder(lines, max);
        for y in (from.y.max(max.y) + 1)..=to.y {
            add_placeholder(lines, CursorPosition::new(0, y));
        }
    }

    /// Emit modified lines top to bottom, coalescing contiguous text.
    /// Returns the furthest position written.
    fn emit_lines(&mut self, lines: ModifiedLines, max_before: CursorPosition) -> CursorPosition {
        let mut furthest = max_before;
        let mut run: Option<(CursorPosition, String, CursorPosition)> = None;

        for chunk in lines.into_values().flatten() {
            let start = chunk.start();
            let end = chunk.end();

            if let Some((_, text, run_end)) = run.as_mut() {
                if *run_end == start {
                    text.push_str(&chunk.text);
                    *run_end = end;
                    continue;
                }
                // Lines at or past the high-water mark are new; continue onto
                // them with newlines instead of positioning.
                if run_end.y >= max_before.y && start.y > run_end.y {
                    text.push_str(&"\n".repeat(start.y - run_end.y));
                    text.push_str(&" ".repeat(start.x));
                    text.push_str(&chunk.text);
                    *run_end = end;
                    continue;
                }
            }

            if let Some((run_start, text, run_end)) = run.take() {
                furthest = furthest.max(run_end);
                self.emit_run(run_start, text, max_before);
            }
            run = Some((start, chunk.text, end));
        }

        if let Some((run_start, text, run_end)) = run {
            furthest = furthest.max(run_end);
            self.emit_run(run_start, text, max_before);
        }
        furthest
    }

    fn emit_run(&mut self, start: CursorPosition, text: String, max_before: CursorPosition) {
        if text.is_empty() {
            return;
        }
        let position = (start < max_before).then_some(start);
        self.emit(text, position);
    }

    fn emit(&mut self, text: String, position: Option<CursorPosition>) {
        tracing::trace!("flush {:?} at {:?}", text, position);
        self.flushed.push(Flushed { text, position });
    }
}

/// Insert `chunk` into its line, merging every chunk it intersects
fn add_modified_chunk(lines: &mut ModifiedLines, chunk: LineChunk) {
    let line = lines.entry(chunk.y).or_default();

    let mut merged = chunk;
    let mut kept = Vec::with_capacity(line.len() + 1);
    for existing in line.drain(..) {
        if existing.intersects(&merged) {
            merged = existing.overlay(merged);
        } else {
            kept.push(existing);
        }
    }

    let idx = kept.partition_point(|c| (c.x_start, c.x_end) < (merged.x_start, merged.x_end));
    kept.insert(idx, merged);
    *line = kept;
}

/// Mark `position` as written, unless text already covers it
fn add_placeholder(lines: &mut ModifiedLines, position: CursorPosition) {
    let line = lines.entry(position.y).or_default();
    if line
        .iter()
        .any(|c| c.x_start <= position.x && position.x <= c.x_end)
    {
        return;
    }
    let idx = line.partition_point(|c| c.x_start < position.x);
    line.insert(idx, LineChunk::new(String::new(), position.x, position.y));
}

/// Text that moves a terminal cursor from `from` to `to`
fn gap_text(from: CursorPosition, to: CursorPosition) -> String {
    if to.y > from.y {
        "\n".repeat(to.y - from.y) + &" ".repeat(to.x)
    } else {
        " ".repeat(to.x.saturating_sub(from.x))
    }
}
