//! Plain text log of the final output

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use super::{SinkError, Transcript};
use crate::core::term::{OutputSink, TerminalOutputChunk};

/// Keeps a [`Transcript`] and writes its text to `path` when closed
pub struct LogFileSink {
    path: PathBuf,
    transcript: Transcript,
    error: Option<SinkError>,
}

impl LogFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            transcript: Transcript::new(),
            error: None,
        }
    }

    pub fn finish(mut self) -> Result<Transcript, SinkError> {
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(self.transcript),
        }
    }
}

impl OutputSink for LogFileSink {
    fn push(&mut self, chunk: TerminalOutputChunk) {
        self.transcript.apply(&chunk);
    }

    fn close(&mut self) {
        let text = self.transcript.text();
        match fs::write(&self.path, &text) {
            Ok(()) => info!("wrote {} bytes to {}", text.len(), self.path.display()),
            Err(source) => {
                warn!("failed to write {}: {}", self.path.display(), source);
                self.error = Some(SinkError::File {
                    path: self.path.clone(),
                    source,
                });
            }
        }
    }
}
