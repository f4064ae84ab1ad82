//! Graphics state tracking
//!
//! Holds the colors and style flags selected by SGR (`ESC [ ... m`) commands.
//! Code lookups go through static tables; the only mutable state is the
//! per-emulator [`GraphicsState`].

use bitflags::bitflags;
use serde::{Serialize, Serializer};

/// Named terminal colors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    LightGray,
    DarkGray,
    LightRed,
    LightGreen,
    LightYellow,
    LightBlue,
    LightMagenta,
    LightCyan,
    White,
}

/// Standard colors first, bright colors after
const PALETTE: [TextColor; 16] = [
    TextColor::Black,
    TextColor::Red,
    TextColor::Green,
    TextColor::Yellow,
    TextColor::Blue,
    TextColor::Magenta,
    TextColor::Cyan,
    TextColor::LightGray,
    TextColor::DarkGray,
    TextColor::LightRed,
    TextColor::LightGreen,
    TextColor::LightYellow,
    TextColor::LightBlue,
    TextColor::LightMagenta,
    TextColor::LightCyan,
    TextColor::White,
];

impl TextColor {
    /// Foreground color for SGR codes 30-37 and 90-97
    pub fn from_foreground_code(code: u16) -> Option<Self> {
        match code {
            30..=37 => Some(PALETTE[(code - 30) as usize]),
            90..=97 => Some(PALETTE[(code - 90 + 8) as usize]),
            _ => None,
        }
    }

    /// Background color for SGR codes 40-47 and 100-107
    pub fn from_background_code(code: u16) -> Option<Self> {
        match code {
            40..=47 => Some(PALETTE[(code - 40) as usize]),
            100..=107 => Some(PALETTE[(code - 100 + 8) as usize]),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct TextStyles: u8 {
        const BOLD       = 0b0001;
        const DIM        = 0b0010;
        const UNDERLINED = 0b0100;
        const HIDDEN     = 0b1000;
    }
}

const STYLE_NAMES: [(TextStyles, &str); 4] = [
    (TextStyles::BOLD, "bold"),
    (TextStyles::DIM, "dim"),
    (TextStyles::UNDERLINED, "underlined"),
    (TextStyles::HIDDEN, "hidden"),
];

impl TextStyles {
    /// Names of the active styles, in a fixed order
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        STYLE_NAMES
            .iter()
            .filter(move |(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
    }

    /// Style set (`true`) or cleared (`false`) by an SGR code
    fn from_code(code: u16) -> Option<(TextStyles, bool)> {
        match code {
            1 => Some((TextStyles::BOLD, true)),
            2 => Some((TextStyles::DIM, true)),
            4 => Some((TextStyles::UNDERLINED, true)),
            8 => Some((TextStyles::HIDDEN, true)),
            21 => Some((TextStyles::BOLD, false)),
            22 => Some((TextStyles::DIM, false)),
            24 => Some((TextStyles::UNDERLINED, false)),
            28 => Some((TextStyles::HIDDEN, false)),
            _ => None,
        }
    }
}

impl Serialize for TextStyles {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}

/// Colors and styles applied to text as it is written
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GraphicsState {
    pub text_color: Option<TextColor>,
    pub background_color: Option<TextColor>,
    pub styles: TextStyles,
}

impl GraphicsState {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// State after applying the SGR arguments `args` in order.
    ///
    /// `0` resets everything, `39`/`49` clear the foreground/background,
    /// unknown codes are ignored.
    pub fn apply_sgr(&self, args: &[u16]) -> GraphicsState {
        let mut next = self.clone();

        for &code in args {
            match code {
                0 => next = GraphicsState::default(),
                39 => next.text_color = None,
                49 => next.background_color = None,
                _ => {
                    if let Some(color) = TextColor::from_foreground_code(code) {
                        next.text_color = Some(color);
                    } else if let Some(color) = TextColor::from_background_code(code) {
                        next.background_color = Some(color);
                    } else if let Some((style, enable)) = TextStyles::from_code(code) {
                        next.styles.set(style, enable);
                    }
                }
            }
        }

        next
    }
}
