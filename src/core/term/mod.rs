//! Terminal output emulation
//!
//! - **parser**: `ESC [ args final` recognition, tolerant of split input
//! - **graphics**: SGR colors and styles
//! - **screen**: cursor model and diff emission
//! - **output**: emitted events and sinks
//! - **emulator**: ties the stages together

pub mod emulator;
pub mod graphics;
pub mod output;
pub mod parser;
pub mod screen;

pub use emulator::TerminalEmulator;
pub use graphics::{GraphicsState, TextColor, TextStyles};
pub use output::{CursorPosition, FormattedText, OutputSink, TerminalOutputChunk};
pub use parser::{Command, EscapeParser, Perform};
pub use screen::ScreenBuffer;
