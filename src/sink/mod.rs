//! Downstream consumers of emulator output
//!
//! - **transcript**: replays chunks into the final visible text
//! - **json**: one JSON object per chunk
//! - **log_file**: writes the transcript to a file on close
//! - **preview**: renders chunks live on a terminal

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub mod json;
pub mod log_file;
pub mod preview;
pub mod transcript;

pub use json::JsonLinesSink;
pub use log_file::LogFileSink;
pub use preview::PreviewSink;
pub use transcript::Transcript;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),

    #[error("failed to encode chunk: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
