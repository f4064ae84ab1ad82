//! Core output emulation components.
//!
//! - **term**: escape parsing, graphics state and the diffing screen buffer
//! - **session**: child process plumbing feeding an emulator
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── reader threads (stdout, stderr) ──> SessionEvent channel
//! └── Utf8ChunkDecoder
//!     └── TerminalEmulator
//!         ├── EscapeParser
//!         ├── GraphicsState
//!         └── ScreenBuffer ──> OutputSink
//! ```

pub mod session;
pub mod term;
