//! JSON lines output
//!
//! Each chunk becomes one line:
//!
//! ```text
//! {"formatted_text":{"text":"50%","text_color":"green","background_color":null,"styles":["bold"]},"custom_position":{"x":0,"y":3}}
//! ```

use std::io::Write;

use tracing::warn;

use super::SinkError;
use crate::core::term::{OutputSink, TerminalOutputChunk};

pub struct JsonLinesSink<W: Write> {
    writer: W,
    written: usize,
    /// First failure; later chunks are dropped
    error: Option<SinkError>,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            written: 0,
            error: None,
        }
    }

    /// Number of chunks written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the writer, or the first error hit while writing
    pub fn finish(mut self) -> Result<W, SinkError> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_chunk(&mut self, chunk: &TerminalOutputChunk) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, chunk)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> OutputSink for JsonLinesSink<W> {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        if self.error.is_some() {
            return;
        }
        match self.write_chunk(&chunk) {
            Ok(()) => self.written += 1,
            Err(e) => {
                warn!("json output failed: {}", e);
                self.error = Some(e);
            }
        }
    }

    fn close(&mut self) {
        if self.error.is_none() {
            if let Err(e) = self.writer.flush() {
                self.error = Some(e.into());
            }
        }
    }
}
