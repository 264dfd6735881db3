//! Decoder progress parsing.
//!
//! The decoder redraws a console progress line rather than printing
//! structured output. The only structure relied upon is an integer
//! percentage token matching `(\d{1,3})%`; when a scanned chunk contains
//! several, the last one wins.

use std::sync::OnceLock;

use regex::Regex;

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d{1,3})%").unwrap())
}

/// Extracts the last percentage token from a chunk of decoder output.
///
/// Values above 100 (possible with three-digit noise) are clamped.
/// Returns `None` when the chunk carries no token at all.
pub fn parse_percent(chunk: &str) -> Option<u8> {
    percent_re()
        .captures_iter(chunk)
        .last()
        .and_then(|captures| captures.get(1))
        .and_then(|token| token.as_str().parse::<u16>().ok())
        .map(|value| value.min(100) as u8)
}

/// Drops regressing progress values.
///
/// The decoder's redraw output can repeat or go backwards; values accepted
/// here are non-decreasing. Duplicates pass through.
#[derive(Debug, Default)]
pub struct MonotonicPercent {
    last: Option<u8>,
}

impl MonotonicPercent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `value` if it is not below the last accepted value.
    pub fn accept(&mut self, value: u8) -> Option<u8> {
        match self.last {
            Some(prev) if value < prev => None,
            _ => {
                self.last = Some(value);
                Some(value)
            }
        }
    }
}
