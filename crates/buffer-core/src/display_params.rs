//! Display layer configuration.
//!
//! [`DisplayLayerParams`] is a plain struct with a `Default`. Everything except the two
//! strategy callbacks is serializable; the strategies fall back to their defaults when
//! deserialized.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use unicode_width::UnicodeWidthChar;

/// On-screen width of a character, relative to a normal cell.
#[derive(Clone, Default)]
pub enum CharacterWidth {
    /// Every character is one cell wide.
    #[default]
    Fixed,
    /// East Asian Width (UAX #11) via `unicode-width`; zero-width characters take no space.
    UnicodeWidth,
    /// Caller-supplied ratio.
    Custom(Arc<dyn Fn(char) -> f64 + Send + Sync>),
}

impl CharacterWidth {
    /// Width ratio of `ch`.
    pub fn ratio(&self, ch: char) -> f64 {
        match self {
            CharacterWidth::Fixed => 1.0,
            CharacterWidth::UnicodeWidth => UnicodeWidthChar::width(ch).unwrap_or(1) as f64,
            CharacterWidth::Custom(ratio) => ratio(ch),
        }
    }
}

impl fmt::Debug for CharacterWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharacterWidth::Fixed => f.write_str("Fixed"),
            CharacterWidth::UnicodeWidth => f.write_str("UnicodeWidth"),
            CharacterWidth::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Where a soft wrap may be inserted, given the previous and current character.
#[derive(Clone, Default)]
pub enum WrapBoundary {
    /// Before the first non-whitespace character following a space or tab.
    #[default]
    WordStart,
    /// Caller-supplied predicate.
    Custom(Arc<dyn Fn(char, char) -> bool + Send + Sync>),
}

impl WrapBoundary {
    /// Whether a wrap may be inserted between `previous` and `current`.
    pub fn is_boundary(&self, previous: char, current: char) -> bool {
        match self {
            WrapBoundary::WordStart => {
                is_inline_whitespace(previous) && !is_inline_whitespace(current)
            }
            WrapBoundary::Custom(predicate) => predicate(previous, current),
        }
    }
}

impl fmt::Debug for WrapBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapBoundary::WordStart => f.write_str("WordStart"),
            WrapBoundary::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

pub(crate) fn is_inline_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Substitutes rendered for otherwise invisible characters. `None` renders nothing special.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invisibles {
    /// Shown at the end of rows terminated by a line ending.
    pub eol: Option<char>,
    /// Replaces leading and trailing spaces.
    pub space: Option<char>,
    /// Replaces the first column of an expanded hard tab.
    pub tab: Option<char>,
    /// Shown before `eol` for CRLF line endings.
    pub cr: Option<char>,
}

impl Invisibles {
    /// The conventional glyphs: `¬`, `·`, `»`, `¤`.
    pub fn standard() -> Self {
        Self {
            eol: Some('\u{00ac}'),
            space: Some('\u{00b7}'),
            tab: Some('\u{00bb}'),
            cr: Some('\u{00a4}'),
        }
    }

    pub(crate) fn for_line_ending(&self, ending: crate::text::LineEnding) -> String {
        use crate::text::LineEnding;
        let mut text = String::new();
        match ending {
            LineEnding::None => {}
            LineEnding::Lf => text.extend(self.eol),
            LineEnding::CrLf => {
                text.extend(self.cr);
                text.extend(self.eol);
            }
        }
        text
    }
}

/// Layout parameters of a display layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayLayerParams {
    /// Hard tab stop interval. Values below 1 are treated as 1.
    pub tab_length: usize,
    /// Maximum on-screen width of a line; `None` disables soft wrapping. Values below 1 are
    /// treated as 1.
    pub soft_wrap_column: Option<usize>,
    /// Extra indentation for continuation lines.
    pub soft_wrap_hanging_indent: usize,
    /// Emit indent guide tags in leading whitespace and on blank lines.
    pub show_indent_guides: bool,
    /// Invisible character substitutes.
    pub invisibles: Invisibles,
    /// Treat tab-aligned runs of leading spaces as a single unit.
    pub atomic_soft_tabs: bool,
    /// Character shown in place of a fold.
    pub fold_character: char,
    /// Character width strategy.
    #[serde(skip)]
    pub ratio_for_character: CharacterWidth,
    /// Soft wrap boundary strategy.
    #[serde(skip)]
    pub is_wrap_boundary: WrapBoundary,
}

impl DisplayLayerParams {
    /// Default parameters: tab length 4, no soft wrap, `⋯` folds.
    pub fn new() -> Self {
        Self {
            tab_length: 4,
            soft_wrap_column: None,
            soft_wrap_hanging_indent: 0,
            show_indent_guides: false,
            invisibles: Invisibles::default(),
            atomic_soft_tabs: true,
            fold_character: '\u{22ef}',
            ratio_for_character: CharacterWidth::default(),
            is_wrap_boundary: WrapBoundary::default(),
        }
    }

    /// Set the tab length.
    pub fn with_tab_length(mut self, tab_length: usize) -> Self {
        self.tab_length = tab_length;
        self
    }

    /// Enable soft wrapping. Zero and negative columns wrap after every character.
    pub fn with_soft_wrap_column(mut self, column: isize) -> Self {
        self.soft_wrap_column = Some(column.max(1) as usize);
        self
    }

    /// Set the hanging indent for continuation lines.
    pub fn with_soft_wrap_hanging_indent(mut self, indent: usize) -> Self {
        self.soft_wrap_hanging_indent = indent;
        self
    }

    /// Toggle indent guides.
    pub fn with_indent_guides(mut self, show: bool) -> Self {
        self.show_indent_guides = show;
        self
    }

    /// Set invisible substitutes.
    pub fn with_invisibles(mut self, invisibles: Invisibles) -> Self {
        self.invisibles = invisibles;
        self
    }

    /// Toggle atomic soft tabs.
    pub fn with_atomic_soft_tabs(mut self, atomic: bool) -> Self {
        self.atomic_soft_tabs = atomic;
        self
    }

    /// Set the fold placeholder.
    pub fn with_fold_character(mut self, ch: char) -> Self {
        self.fold_character = ch;
        self
    }

    /// Set the character width strategy.
    pub fn with_character_width(mut self, width: CharacterWidth) -> Self {
        self.ratio_for_character = width;
        self
    }

    /// Set the wrap boundary strategy.
    pub fn with_wrap_boundary(mut self, boundary: WrapBoundary) -> Self {
        self.is_wrap_boundary = boundary;
        self
    }

    pub(crate) fn tab_length(&self) -> usize {
        self.tab_length.max(1)
    }

    pub(crate) fn soft_wrap_width(&self) -> f64 {
        self.soft_wrap_column
            .map(|column| column.max(1) as f64)
            .unwrap_or(f64::INFINITY)
    }

    pub(crate) fn soft_wrap_column_limit(&self) -> usize {
        self.soft_wrap_column.map(|column| column.max(1)).unwrap_or(usize::MAX)
    }

    pub(crate) fn ratio(&self, ch: char) -> f64 {
        self.ratio_for_character.ratio(ch)
    }
}

impl Default for DisplayLayerParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::LineEnding;

    #[test]
    fn test_soft_wrap_column_is_at_least_one() {
        assert_eq!(DisplayLayerParams::new().with_soft_wrap_column(0).soft_wrap_width(), 1.0);
        assert_eq!(DisplayLayerParams::new().with_soft_wrap_column(-5).soft_wrap_width(), 1.0);
        assert!(DisplayLayerParams::new().soft_wrap_width().is_infinite());
    }

    #[test]
    fn test_character_width_strategies() {
        assert_eq!(CharacterWidth::Fixed.ratio('中'), 1.0);
        assert_eq!(CharacterWidth::UnicodeWidth.ratio('中'), 2.0);
        assert_eq!(CharacterWidth::UnicodeWidth.ratio('\u{0301}'), 0.0);
        let half = CharacterWidth::Custom(Arc::new(|_| 0.5));
        assert_eq!(half.ratio('x'), 0.5);
    }

    #[test]
    fn test_default_wrap_boundary() {
        let boundary = WrapBoundary::default();
        assert!(boundary.is_boundary(' ', 'a'));
        assert!(boundary.is_boundary('\t', 'a'));
        assert!(!boundary.is_boundary('a', 'b'));
        assert!(!boundary.is_boundary(' ', ' '));
    }

    #[test]
    fn test_eol_invisibles_follow_line_ending() {
        let invisibles = Invisibles::standard();
        assert_eq!(invisibles.for_line_ending(LineEnding::Lf), "\u{00ac}");
        assert_eq!(invisibles.for_line_ending(LineEnding::CrLf), "\u{00a4}\u{00ac}");
        assert_eq!(invisibles.for_line_ending(LineEnding::None), "");
    }

    #[test]
    fn test_params_serialize_without_strategies() {
        let params = DisplayLayerParams::new()
            .with_soft_wrap_column(40)
            .with_character_width(CharacterWidth::UnicodeWidth);
        let json = serde_json::to_string(&params).unwrap();
        let restored: DisplayLayerParams = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.soft_wrap_column, Some(40));
        assert!(matches!(restored.ratio_for_character, CharacterWidth::Fixed));
    }
}
