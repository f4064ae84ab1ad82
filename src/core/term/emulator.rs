//! Terminal output emulator
//!
//! Wires the escape parser, the graphics state and the screen buffer
//! together. Text goes in through [`TerminalEmulator::feed`], styled and
//! positioned updates come out through the [`OutputSink`].

use tracing::{debug, trace, warn};

use super::graphics::GraphicsState;
use super::output::{FormattedText, OutputSink, TerminalOutputChunk};
use super::parser::{Command, EscapeParser, Perform};
use super::screen::ScreenBuffer;

/// Converts a raw output stream into [`TerminalOutputChunk`]s
pub struct TerminalEmulator<S: OutputSink> {
    parser: EscapeParser,
    graphics: GraphicsState,
    screen: ScreenBuffer,
    sink: S,
    closed: bool,
}

impl<S: OutputSink> TerminalEmulator<S> {
    pub fn new(sink: S) -> Self {
        Self {
            parser: EscapeParser::new(),
            graphics: GraphicsState::default(),
            screen: ScreenBuffer::new(),
            sink,
            closed: false,
        }
    }

    /// Feed the next chunk of output. Chunk boundaries may fall anywhere,
    /// including inside an escape sequence.
    pub fn feed(&mut self, chunk: &str) {
        if self.closed {
            warn!("feed after close ignored ({} bytes)", chunk.len());
            return;
        }

        let mut stages = Stages {
            graphics: &mut self.graphics,
            screen: &mut self.screen,
            sink: &mut self.sink,
        };
        self.parser.feed(chunk, &mut stages);

        // Hold back while a command is half read; it may still change the style
        if !self.parser.is_pending() {
            stages.flush();
        }
    }

    /// Emit everything still buffered, including an unfinished escape
    /// sequence as literal text. The emulator accepts no input afterwards.
    pub fn flush_remaining(&mut self) {
        if self.closed {
            return;
        }

        let mut stages = Stages {
            graphics: &mut self.graphics,
            screen: &mut self.screen,
            sink: &mut self.sink,
        };
        self.parser.finish(&mut stages);
        stages.flush();

        self.closed = true;
        debug!("emulator closed at {:?}", self.screen.max_cursor());
    }

    /// Drain, close the sink and hand it back
    pub fn finish(mut self) -> S {
        self.flush_remaining();
        self.sink.close();
        self.sink
    }

    pub fn graphics(&self) -> &GraphicsState {
        &self.graphics
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Borrowed view of the emulator the parser drives
struct Stages<'a, S> {
    graphics: &'a mut GraphicsState,
    screen: &'a mut ScreenBuffer,
    sink: &'a mut S,
}

impl<S: OutputSink> Stages<'_, S> {
    fn flush(&mut self) {
        self.screen.flush();
        self.drain();
    }

    /// Forward flushed runs, styled with the current graphics state
    fn drain(&mut self) {
        for flushed in self.screen.take_flushed() {
            self.sink.push(TerminalOutputChunk {
                formatted_text: FormattedText::new(flushed.text, &*self.graphics),
                custom_position: flushed.position,
            });
        }
    }
}

impl<S: OutputSink> Perform for Stages<'_, S> {
    fn print(&mut self, text: &str) {
        self.screen.write(text);
        // Runs flushed while moving the cursor
        self.drain();
    }

    fn command(&mut self, command: Command) {
        match command {
            Command::SelectGraphicRendition(args) => {
                let next = self.graphics.apply_sgr(&args);
                if next != *self.graphics {
                    // Text written so far keeps the old style
                    self.flush();
                    *self.graphics = next;
                }
            }
            other => trace!("consumed {:?}", other),
        }
    }
}
