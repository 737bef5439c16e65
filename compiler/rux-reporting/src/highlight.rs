//! ANSI highlighting for terminal diagnostics.
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Colour {
    Red,
    Yellow,
    Blue,
    Cyan,
}

impl Colour {
    fn code(&self) -> &'static str {
        match self {
            Colour::Red => "31",
            Colour::Yellow => "33",
            Colour::Blue => "34",
            Colour::Cyan => "36",
        }
    }
}

/// A message fragment wrapped in colour codes when colours are
/// enabled.
pub struct Highlighted<'m> {
    colour: Option<Colour>,
    bold: bool,
    message: &'m str,
}

impl fmt::Display for Highlighted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.colour {
            Some(colour) => {
                if self.bold {
                    write!(f, "\x1b[{};1m{}\x1b[0m", colour.code(), self.message)
                } else {
                    write!(f, "\x1b[{}m{}\x1b[0m", colour.code(), self.message)
                }
            }
            None => write!(f, "{}", self.message),
        }
    }
}

/// Wrap `message` in the given colour; pass `None` to disable
/// colouring (e.g. when stderr is not a terminal).
pub fn highlight(colour: Option<Colour>, bold: bool, message: &str) -> Highlighted<'_> {
    Highlighted { colour, bold, message }
}
