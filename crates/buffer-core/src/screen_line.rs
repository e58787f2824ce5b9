//! Rendered screen lines and their tag stream.
//!
//! In memory a line's tags are [`TagCode`]s. The compact signed-integer form (positive: text
//! run length, odd negative: open, even negative: close) exists only at the encoding boundary,
//! via [`ScreenLine::encoded_tags`] and [`TagCode::decode`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Classification of a run of screen text produced by the display layer itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    pub struct BuiltInFlags: u8 {
        /// A substituted invisible character.
        const INVISIBLE_CHARACTER = 1 << 0;
        /// An expanded hard tab.
        const HARD_TAB = 1 << 1;
        /// Whitespace before the first non-whitespace character.
        const LEADING_WHITESPACE = 1 << 2;
        /// Whitespace after the last non-whitespace character.
        const TRAILING_WHITESPACE = 1 << 3;
        /// The end-of-line invisible.
        const LINE_ENDING = 1 << 4;
        /// An indent guide segment.
        const INDENT_GUIDE = 1 << 5;
        /// The placeholder of a fold.
        const FOLD = 1 << 6;
    }
}

impl BuiltInFlags {
    /// Space-separated CSS-style class names, in flag order.
    pub fn class_names(self) -> String {
        const NAMES: [(BuiltInFlags, &str); 7] = [
            (BuiltInFlags::INVISIBLE_CHARACTER, "invisible-character"),
            (BuiltInFlags::HARD_TAB, "hard-tab"),
            (BuiltInFlags::LEADING_WHITESPACE, "leading-whitespace"),
            (BuiltInFlags::TRAILING_WHITESPACE, "trailing-whitespace"),
            (BuiltInFlags::LINE_ENDING, "eol"),
            (BuiltInFlags::INDENT_GUIDE, "indent-guide"),
            (BuiltInFlags::FOLD, "fold-marker"),
        ];
        NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Identifier of a decoration scope, owned by the decoration layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// What an open or close tag refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagId {
    /// A display-layer classification.
    BuiltIn(BuiltInFlags),
    /// A decoration scope.
    Scope(ScopeId),
}

const SCOPE_ID_OFFSET: i64 = 256;

impl TagId {
    fn numeric(self) -> i64 {
        match self {
            TagId::BuiltIn(flags) => i64::from(flags.bits()),
            TagId::Scope(ScopeId(scope)) => SCOPE_ID_OFFSET + i64::from(scope),
        }
    }

    fn from_numeric(id: i64) -> Self {
        if id < SCOPE_ID_OFFSET {
            TagId::BuiltIn(BuiltInFlags::from_bits_retain(id as u8))
        } else {
            TagId::Scope(ScopeId((id - SCOPE_ID_OFFSET) as u32))
        }
    }
}

/// One entry of a screen line's tag stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagCode {
    /// A run of this many characters of `line_text`.
    Text(usize),
    /// Open a tag.
    Open(TagId),
    /// Close the innermost open tag with this id.
    Close(TagId),
}

impl TagCode {
    /// Signed-integer form.
    pub fn encode(self) -> i64 {
        match self {
            TagCode::Text(length) => length as i64,
            TagCode::Open(id) => -(2 * id.numeric() + 1),
            TagCode::Close(id) => -(2 * id.numeric() + 2),
        }
    }

    /// Inverse of [`TagCode::encode`].
    pub fn decode(code: i64) -> Self {
        if code >= 0 {
            return TagCode::Text(code as usize);
        }
        let magnitude = -code;
        if magnitude % 2 == 1 {
            TagCode::Open(TagId::from_numeric((magnitude - 1) / 2))
        } else {
            TagCode::Close(TagId::from_numeric((magnitude - 2) / 2))
        }
    }
}

/// Identifier of a rendered screen line; stable while the row's content is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScreenLineId(pub u64);

/// A rendered screen row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenLine {
    /// Line id.
    pub id: ScreenLineId,
    /// Rendered text: expanded tabs, substituted invisibles, fold placeholders.
    pub line_text: String,
    /// Properly nested tags whose text runs cover `line_text` exactly.
    pub tags: Vec<TagCode>,
}

impl ScreenLine {
    /// Tags in their signed-integer form.
    pub fn encoded_tags(&self) -> Vec<i64> {
        self.tags.iter().map(|tag| tag.encode()).collect()
    }

    /// Text runs paired with the tags open over them, outermost first.
    pub fn tokens(&self) -> Vec<(String, Vec<TagId>)> {
        let mut tokens = Vec::new();
        let mut open = Vec::new();
        let mut chars = self.line_text.chars();
        for tag in &self.tags {
            match *tag {
                TagCode::Open(id) => open.push(id),
                TagCode::Close(id) => {
                    if let Some(index) = open.iter().rposition(|candidate| *candidate == id) {
                        open.remove(index);
                    }
                }
                TagCode::Text(length) => {
                    let text: String = chars.by_ref().take(length).collect();
                    tokens.push((text, open.clone()));
                }
            }
        }
        tokens
    }
}
