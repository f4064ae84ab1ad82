//! Escape sequence parser
//!
//! Splits a text stream into literal runs and recognized `ESC [ args final`
//! commands. Sequences may be split across any number of `feed` calls; the
//! partially read bytes are kept until the sequence completes or fails.
//! A sequence that fails to match is handed back as literal text, byte for
//! byte.

const ESC: char = '\x1b';

/// A recognized command. Each variant only accepts its own argument shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SGR - `ESC [ n;n;... m`
    SelectGraphicRendition(Vec<u16>),
    /// EL - `ESC [ n K`
    EraseLine(u16),
    /// CUP/HVP - `ESC [ row;col H` or `f`
    CursorPosition { row: u16, col: u16 },
    /// CUU - `ESC [ n A`
    CursorUp(u16),
    /// CUD - `ESC [ n B`
    CursorDown(u16),
    /// CUF - `ESC [ n C`
    CursorForward(u16),
    /// CUB - `ESC [ n D`
    CursorBack(u16),
}

impl Command {
    fn is_final_byte(ch: char) -> bool {
        matches!(ch, 'm' | 'K' | 'H' | 'f' | 'A' | 'B' | 'C' | 'D')
    }

    /// Build a command from its final byte and raw argument string.
    ///
    /// Empty arguments count as `0`. Returns `None` when an argument is not
    /// purely digits or the argument count does not fit the command.
    pub fn parse(final_byte: char, params: &str) -> Option<Command> {
        let args = parse_params(params)?;

        match (final_byte, args.as_slice()) {
            ('m', _) => Some(Command::SelectGraphicRendition(args)),
            ('K', &[mode]) => Some(Command::EraseLine(mode)),
            ('H' | 'f', &[row]) => Some(Command::CursorPosition { row, col: 0 }),
            ('H' | 'f', &[row, col]) => Some(Command::CursorPosition { row, col }),
            ('A', &[n]) => Some(Command::CursorUp(n)),
            ('B', &[n]) => Some(Command::CursorDown(n)),
            ('C', &[n]) => Some(Command::CursorForward(n)),
            ('D', &[n]) => Some(Command::CursorBack(n)),
            _ => None,
        }
    }
}

fn parse_params(params: &str) -> Option<Vec<u16>> {
    params
        .split(';')
        .map(|arg| {
            if !arg.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            Some(arg.bytes().fold(0u16, |acc, b| {
                acc.saturating_mul(10).saturating_add((b - b'0') as u16)
            }))
        })
        .collect()
}

/// Receives the parser's output
pub trait Perform {
    /// Literal text, including demoted escape sequences
    fn print(&mut self, text: &str);

    /// A fully recognized command
    fn command(&mut self, command: Command);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ParserState {
    #[default]
    Ground,
    /// Got ESC, expecting `[`
    Escape,
    /// Inside `ESC [`, collecting digits and `;`
    CsiParam,
}

/// Outcome of handing one character to a pending command
enum Advance {
    /// Character consumed, command still incomplete
    Pending,
    /// Character consumed, command finished (or demoted including it)
    Done,
    /// Command demoted; the character was not consumed
    Rejected,
}

/// Streaming escape sequence parser
#[derive(Debug, Default)]
pub struct EscapeParser {
    state: ParserState,
    /// Raw text of the command read so far, starting with ESC
    pending: String,
}

impl EscapeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a command prefix is buffered
    pub fn is_pending(&self) -> bool {
        self.state != ParserState::Ground
    }

    /// Feed a chunk of text
    pub fn feed<P: Perform>(&mut self, chunk: &str, performer: &mut P) {
        // Start of the literal run not yet handed to the performer
        let mut literal_start = 0;

        for (idx, ch) in chunk.char_indices() {
            if self.state != ParserState::Ground {
                match self.advance(ch, performer) {
                    Advance::Pending => continue,
                    Advance::Done => {
                        literal_start = idx + ch.len_utf8();
                        continue;
                    }
                    Advance::Rejected => literal_start = idx,
                }
            }

            if ch == ESC {
                if literal_start < idx {
                    performer.print(&chunk[literal_start..idx]);
                }
                self.pending.push(ch);
                self.state = ParserState::Escape;
                literal_start = idx + ch.len_utf8();
            }
        }

        if self.state == ParserState::Ground && literal_start < chunk.len() {
            performer.print(&chunk[literal_start..]);
        }
    }

    /// Hand any buffered command prefix back as literal text
    pub fn finish<P: Perform>(&mut self, performer: &mut P) {
        if self.is_pending() {
            self.demote(performer);
        }
    }

    fn advance<P: Perform>(&mut self, ch: char, performer: &mut P) -> Advance {
        match self.state {
            ParserState::Ground => Advance::Rejected,
            ParserState::Escape => {
                if ch == '[' {
                    self.pending.push(ch);
                    self.state = ParserState::CsiParam;
                    Advance::Pending
                } else {
                    self.demote(performer);
                    Advance::Rejected
                }
            }
            ParserState::CsiParam => match ch {
                '0'..='9' | ';' => {
                    self.pending.push(ch);
                    Advance::Pending
                }
                _ if Command::is_final_byte(ch) => {
                    match Command::parse(ch, &self.pending[2..]) {
                        Some(command) => {
                            self.pending.clear();
                            self.state = ParserState::Ground;
                            performer.command(command);
                        }
                        None => {
                            tracing::debug!(
                                "Rejected CSI: args={:?}, final={:?}",
                                &self.pending[2..],
                                ch
                            );
                            self.pending.push(ch);
                            self.demote(performer);
                        }
                    }
                    Advance::Done
                }
                _ => {
                    self.demote(performer);
                    Advance::Rejected
                }
            },
        }
    }

    fn demote<P: Perform>(&mut self, performer: &mut P) {
        tracing::debug!("Demoting escape prefix {:?} to text", self.pending);
        performer.print(&self.pending);
        self.pending.clear();
        self.state = ParserState::Ground;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Event {
        Text(String),
        Command(Command),
    }

    #[derive(Default)]
    struct Recorder(Vec<Event>);

    impl Perform for Recorder {
        fn print(&mut self, text: &str) {
            // Merge adjacent runs so chunking does not show up in assertions
            if let Some(Event::Text(last)) = self.0.last_mut() {
                last.push_str(text);
            } else {
                self.0.push(Event::Text(text.to_string()));
            }
        }

        fn command(&mut self, command: Command) {
            self.0.push(Event::Command(command));
        }
    }

    fn parse_chunks(chunks: &[&str]) -> Vec<Event> {
        let mut parser = EscapeParser::new();
        let mut recorder = Recorder::default();
        for chunk in chunks {
            parser.feed(chunk, &mut recorder);
        }
        parser.finish(&mut recorder);
        recorder.0
    }

    fn text(s: &str) -> Event {
        Event::Text(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_chunks(&["hello world"]), vec![text("hello world")]);
    }

    #[test]
    fn test_sgr_colors() {
        assert_eq!(
            parse_chunks(&["a\x1b[31mb"]),
            vec![
                text("a"),
                Event::Command(Command::SelectGraphicRendition(vec![31])),
                text("b"),
            ]
        );
    }

    #[test]
    fn test_empty_args_default_to_zero() {
        assert_eq!(
            parse_chunks(&["\x1b[m\x1b[;1m"]),
            vec![
                Event::Command(Command::SelectGraphicRendition(vec![0])),
                Event::Command(Command::SelectGraphicRendition(vec![0, 1])),
            ]
        );
    }

    #[test]
    fn test_split_across_chunks() {
        let whole = parse_chunks(&["x\x1b[0;1;42;97my"]);
        assert_eq!(parse_chunks(&["x\x1b", "[0;1", ";42;9", "7my"]), whole);
        assert_eq!(parse_chunks(&["x", "\x1b", "[", "0", ";1;42;97", "m", "y"]), whole);
    }

    #[test]
    fn test_cursor_commands_consumed() {
        assert_eq!(
            parse_chunks(&["\x1b[2K\x1b[5;10H\x1b[3A\x1b[f\x1b[D"]),
            vec![
                Event::Command(Command::EraseLine(2)),
                Event::Command(Command::CursorPosition { row: 5, col: 10 }),
                Event::Command(Command::CursorUp(3)),
                Event::Command(Command::CursorPosition { row: 0, col: 0 }),
                Event::Command(Command::CursorBack(0)),
            ]
        );
    }

    #[test]
    fn test_missing_bracket_is_demoted() {
        // The demoted ESC is not re-read; the next char is handled normally
        assert_eq!(parse_chunks(&["a\x1bXb"]), vec![text("a\x1bXb")]);
        assert_eq!(
            parse_chunks(&["\x1b\x1b[1m!"]),
            vec![
                text("\x1b"),
                Event::Command(Command::SelectGraphicRendition(vec![1])),
                text("!"),
            ]
        );
    }

    #[test]
    fn test_unexpected_char_is_demoted() {
        assert_eq!(parse_chunks(&["\x1b[?25h"]), vec![text("\x1b[?25h")]);
        assert_eq!(parse_chunks(&["\x1b[1", "2x"]), vec![text("\x1b[12x")]);
    }

    #[test]
    fn test_bad_argument_count_keeps_bytes() {
        assert_eq!(parse_chunks(&["\x1b[1;2K."]), vec![text("\x1b[1;2K.")]);
        assert_eq!(parse_chunks(&["\x1b[1;2;3H"]), vec![text("\x1b[1;2;3H")]);
    }

    #[test]
    fn test_truncated_prefix_flushed_on_finish() {
        let mut parser = EscapeParser::new();
        let mut recorder = Recorder::default();

        parser.feed("done\x1b[3", &mut recorder);
        assert!(parser.is_pending());
        assert_eq!(recorder.0, vec![text("done")]);

        parser.finish(&mut recorder);
        assert!(!parser.is_pending());
        assert_eq!(recorder.0, vec![text("done\x1b[3")]);
    }

    #[test]
    fn test_multibyte_text_around_commands() {
        assert_eq!(
            parse_chunks(&["größe \x1b[1m✓\x1b[0m"]),
            vec![
                text("größe "),
                Event::Command(Command::SelectGraphicRendition(vec![1])),
                text("✓"),
                Event::Command(Command::SelectGraphicRendition(vec![0])),
            ]
        );
    }

    #[test]
    fn test_huge_argument_saturates() {
        assert_eq!(
            Command::parse('m', "99999999"),
            Some(Command::SelectGraphicRendition(vec![u16::MAX]))
        );
        assert_eq!(Command::parse('m', "1a"), None);
    }
}
