//! End-to-end behavior of the terminal output emulator.
//!
//! Scenario tests pin the exact chunks emitted for common output patterns;
//! the property tests replay random output streams, cut at random points,
//! and compare the replayed text with a naive screen model.

use std::sync::mpsc;

use proptest::prelude::*;
use scriptterm::sink::Transcript;
use scriptterm::{
    CursorPosition, GraphicsState, TerminalEmulator, TerminalOutputChunk, TextColor, TextStyles,
};

fn emulate<S: AsRef<str>>(chunks: impl IntoIterator<Item = S>) -> Vec<TerminalOutputChunk> {
    let mut emulator = TerminalEmulator::new(Vec::<TerminalOutputChunk>::new());
    for chunk in chunks {
        emulator.feed(chunk.as_ref());
    }
    emulator.finish()
}

fn replay(chunks: &[TerminalOutputChunk]) -> Transcript {
    let mut transcript = Transcript::new();
    for chunk in chunks {
        transcript.apply(chunk);
    }
    transcript
}

fn at(x: usize, y: usize) -> Option<CursorPosition> {
    Some(CursorPosition::new(x, y))
}

// ═════════════════════════════════════════════════════════════════════════
// Scenarios
// ═════════════════════════════════════════════════════════════════════════

#[test]
fn plain_text_is_one_append() {
    let out = emulate(["some text"]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text(), "some text");
    assert_eq!(out[0].formatted_text.text_color, None);
    assert!(out[0].formatted_text.styles.is_empty());
    assert_eq!(out[0].custom_position, None);
}

#[test]
fn colored_text() {
    let out = emulate(["\x1b[31msome text"]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text(), "some text");
    assert_eq!(out[0].formatted_text.text_color, Some(TextColor::Red));
}

#[test]
fn carriage_return_then_text_overwrites() {
    let out = emulate(["some text\r", "123"]);
    assert_eq!(out.len(), 2);
    assert_eq!((out[0].text(), out[0].custom_position), ("some text", None));
    assert_eq!((out[1].text(), out[1].custom_position), ("123", at(0, 0)));
}

#[test]
fn crlf_continues_the_append() {
    let out = emulate(["some text\r\n123"]);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].text(), "some text\n123");
    assert_eq!(out[0].custom_position, None);
}

#[test]
fn separately_fed_lines_are_appends() {
    let out = emulate(["line1\r\n", "line2\r\n", "line3\r\n"]);
    let texts: Vec<_> = out.iter().map(|c| (c.text(), c.custom_position)).collect();
    assert_eq!(
        texts,
        vec![("line1\n", None), ("line2\n", None), ("line3\n", None)]
    );
}

#[test]
fn style_fed_before_text() {
    let out = emulate(["\x1b[0;1;42;97m", "some text"]);
    assert_eq!(out.len(), 1);
    let text = &out[0].formatted_text;
    assert_eq!(text.text, "some text");
    assert_eq!(text.styles, TextStyles::BOLD);
    assert_eq!(text.text_color, Some(TextColor::White));
    assert_eq!(text.background_color, Some(TextColor::Green));
}

#[test]
fn progress_bar_then_log_lines() {
    let out = emulate([
        "build\n",
        "[    ] 0%\r",
        "[##  ] 50%\r",
        "[####] 100%\r\n",
        "done\n",
    ]);
    let texts: Vec<_> = out.iter().map(|c| (c.text(), c.custom_position)).collect();
    assert_eq!(
        texts,
        vec![
            ("build\n", None),
            ("[    ] 0%", None),
            ("[##  ] 50%", at(0, 1)),
            ("[####] 100%\n", at(0, 1)),
            ("done\n", None),
        ]
    );
    assert_eq!(replay(&out).text(), "build\n[####] 100%\ndone\n");
}

#[test]
fn shorter_redraw_keeps_the_rest_of_the_line() {
    let out = emulate(["abcdef", "\rXY\ng"]);
    let texts: Vec<_> = out.iter().map(|c| (c.text(), c.custom_position)).collect();
    assert_eq!(
        texts,
        vec![("abcdef", None), ("XY", at(0, 0)), ("\ng", None)]
    );
    assert_eq!(replay(&out).text(), "XYcdef\ng");
}

#[test]
fn chunks_reach_a_channel_sink() {
    let (tx, rx) = mpsc::channel::<TerminalOutputChunk>();
    let mut emulator = TerminalEmulator::new(tx);
    emulator.feed("one\r\n");
    emulator.feed("two");
    drop(emulator.finish());

    let texts: Vec<String> = rx.iter().map(|c| c.text().to_string()).collect();
    assert_eq!(texts, vec!["one\n", "two"]);
}

#[test]
fn closure_sink_sees_chunks_in_order() {
    let mut seen = Vec::new();
    {
        let mut emulator = TerminalEmulator::new(|chunk: TerminalOutputChunk| {
            seen.push(chunk.text().to_string())
        });
        emulator.feed("a\x1b[1mb\x1b[0mc");
        emulator.flush_remaining();
    }
    assert_eq!(seen, vec!["a", "b", "c"]);
}

#[test]
fn escape_split_at_every_position() {
    let input = "pre\x1b[0;1;42;97mpost";
    let whole = emulate([input]);

    // From just before ESC to just after the final byte
    for cut in 3..=15 {
        let out = emulate([&input[..cut], &input[cut..]]);
        assert_eq!(out, whole, "cut at {}", cut);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Random output streams
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Token {
    Text(String),
    CarriageReturn,
    LineFeed,
    Sgr(Vec<u16>),
    EraseLine,
    /// Malformed sequence that must come out as literal text
    Garbage(&'static str),
}

impl Token {
    fn raw(&self) -> String {
        match self {
            Token::Text(text) => text.clone(),
            Token::CarriageReturn => "\r".to_string(),
            Token::LineFeed => "\n".to_string(),
            Token::Sgr(args) => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                format!("\x1b[{}m", args.join(";"))
            }
            Token::EraseLine => "\x1b[2K".to_string(),
            Token::Garbage(raw) => raw.to_string(),
        }
    }

    /// What ends up on screen
    fn visible(&self) -> &str {
        match self {
            Token::Text(text) => text,
            Token::CarriageReturn => "\r",
            Token::LineFeed => "\n",
            Token::Sgr(_) | Token::EraseLine => "",
            Token::Garbage(raw) => raw,
        }
    }
}

fn token_strategy() -> impl Strategy<Value = Token> {
    let sgr_code = prop::sample::select(vec![
        0u16, 1, 2, 4, 8, 21, 22, 24, 28, 31, 32, 39, 42, 49, 97, 104, 7,
    ]);
    prop_oneof![
        4 => "[a-z0-9 %#]{1,8}".prop_map(Token::Text),
        2 => Just(Token::CarriageReturn),
        2 => Just(Token::LineFeed),
        1 => Just(Token::Text("größe ✓".to_string())),
        2 => prop::collection::vec(sgr_code, 1..4).prop_map(Token::Sgr),
        1 => Just(Token::EraseLine),
        1 => prop::sample::select(vec!["\x1bX", "\x1b[?", "\x1b[1;2K", "\x1b[5x"])
            .prop_map(Token::Garbage),
    ]
}

/// Screen model that just writes characters at a cursor
fn naive_screen(visible: &str) -> String {
    let mut lines: Vec<Vec<char>> = vec![Vec::new()];
    let (mut x, mut y) = (0usize, 0usize);

    for ch in visible.chars() {
        match ch {
            '\r' => x = 0,
            '\n' => {
                x = 0;
                y += 1;
                if lines.len() <= y {
                    lines.push(Vec::new());
                }
            }
            _ => {
                let line = &mut lines[y];
                if x < line.len() {
                    line[x] = ch;
                } else {
                    line.push(ch);
                }
                x += 1;
            }
        }
    }

    lines
        .into_iter()
        .map(|line| line.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `input` at the given character offsets (taken modulo its length)
fn split_at_chars(input: &str, cuts: &[usize]) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let mut cuts: Vec<usize> = cuts.iter().map(|c| c % (chars.len() + 1)).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut pieces = Vec::with_capacity(cuts.len() + 1);
    let mut last = 0;
    for cut in cuts {
        pieces.push(chars[last..cut].iter().collect());
        last = cut;
    }
    pieces.push(chars[last..].iter().collect());
    pieces
}

proptest! {
    #[test]
    fn replayed_output_matches_screen(
        tokens in prop::collection::vec(token_strategy(), 0..40),
        cuts in prop::collection::vec(any::<usize>(), 0..10),
    ) {
        let input: String = tokens.iter().map(Token::raw).collect();
        let visible: String = tokens.iter().map(Token::visible).collect();

        let out = emulate(split_at_chars(&input, &cuts));
        prop_assert_eq!(replay(&out).text(), naive_screen(&visible));
    }

    #[test]
    fn chunking_does_not_change_visible_text(
        tokens in prop::collection::vec(token_strategy(), 0..40),
        cuts in prop::collection::vec(any::<usize>(), 1..10),
    ) {
        let input: String = tokens.iter().map(Token::raw).collect();

        let whole = emulate([input.as_str()]);
        let chunked = emulate(split_at_chars(&input, &cuts));
        prop_assert_eq!(replay(&chunked).text(), replay(&whole).text());
    }

    #[test]
    fn positions_only_point_into_flushed_output(
        tokens in prop::collection::vec(token_strategy(), 0..40),
        cuts in prop::collection::vec(any::<usize>(), 0..10),
    ) {
        let input: String = tokens.iter().map(Token::raw).collect();
        let out = emulate(split_at_chars(&input, &cuts));

        let mut transcript = Transcript::new();
        for chunk in &out {
            prop_assert!(!chunk.text().is_empty());
            if let Some(position) = chunk.custom_position {
                prop_assert!(position < transcript.end(), "{:?} at {:?}", chunk, transcript.end());
            }
            transcript.apply(chunk);
        }
    }

    #[test]
    fn split_escape_sequence_emits_same_chunks(
        prefix in "[a-z\r\n]{0,6}",
        args in prop::collection::vec(0u16..110, 1..5),
        suffix in "[a-z\r\n]{0,6}",
        cuts in prop::collection::vec(any::<usize>(), 1..6),
    ) {
        let sequence = Token::Sgr(args).raw();
        let input = format!("{}{}{}", prefix, sequence, suffix);
        let whole = emulate([input.as_str()]);

        // Only cut inside the sequence
        let inner: Vec<usize> = cuts
            .iter()
            .map(|c| prefix.len() + 1 + c % (sequence.len() - 1))
            .collect();
        let chunked = emulate(split_at_chars(&input, &inner));
        prop_assert_eq!(chunked, whole);
    }

    #[test]
    fn reset_restores_default_graphics(
        codes in prop::collection::vec(0u16..110, 0..12),
    ) {
        let mut emulator = TerminalEmulator::new(Vec::<TerminalOutputChunk>::new());
        let args: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        emulator.feed(&format!("\x1b[{}mtext", args.join(";")));
        emulator.feed("\x1b[0m");

        prop_assert_eq!(emulator.graphics(), &GraphicsState::default());
    }
}
