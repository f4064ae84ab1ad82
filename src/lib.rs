//! scriptterm - terminal output emulation for script runners
//!
//! Turns the raw output of a process (escape sequences, carriage returns,
//! arbitrary chunking) into a stream of minimal, styled, positioned updates
//! that a remote viewer can apply incrementally.
//!
//! ```
//! use scriptterm::{CursorPosition, TerminalEmulator, TerminalOutputChunk};
//!
//! let mut emulator = TerminalEmulator::new(Vec::<TerminalOutputChunk>::new());
//! emulator.feed("some text\r");
//! emulator.feed("123");
//! let chunks = emulator.finish();
//!
//! assert_eq!(chunks[0].text(), "some text");
//! assert_eq!(chunks[1].custom_position, Some(CursorPosition::new(0, 0)));
//! ```

pub mod config;
pub mod core;
pub mod sink;

pub use crate::core::session::{Session, SessionError, SessionEvent, Utf8ChunkDecoder};
pub use crate::core::term::{
    CursorPosition, FormattedText, GraphicsState, OutputSink, TerminalEmulator,
    TerminalOutputChunk, TextColor, TextStyles,
};
