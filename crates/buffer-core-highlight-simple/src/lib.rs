//! `buffer-core-highlight-simple` - Simple (regex-based) decoration layers for `buffer-core`.
//!
//! This crate is intended for lightweight formats (JSON/INI/etc.) where full parsing is
//! unnecessary. Matches become decoration scopes named after the rule's class name.

use buffer_core::{
    DecorationIterator, DecorationLayer, Range, ScopeId, SpanDecorationLayer, TextChange,
    TextStorage,
};
use regex::Regex;

/// A single regex highlighting rule.
#[derive(Debug, Clone)]
pub struct RegexRule {
    regex: Regex,
    class_name: String,
    capture_group: Option<usize>,
}

impl RegexRule {
    /// Compile `pattern`; matches are decorated with `class_name`.
    pub fn new(pattern: &str, class_name: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            class_name: class_name.into(),
            capture_group: None,
        })
    }

    /// Highlight only a capture group of each match.
    ///
    /// Example (INI key):
    /// - pattern: `^\\s*([^=\\s]+)\\s*=`
    /// - capture_group: `1` (the key)
    pub fn with_capture_group(mut self, group: usize) -> Self {
        self.capture_group = Some(group);
        self
    }

    /// Class name applied to matches.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

/// A simple regex-based syntax highlighter.
///
/// Rules run line by line in order; a match overlapping an earlier match on the same line is
/// skipped, so the produced spans never cross.
#[derive(Debug, Clone)]
pub struct RegexHighlighter {
    rules: Vec<RegexRule>,
}

impl RegexHighlighter {
    /// Highlighter applying `rules` in priority order.
    pub fn new(rules: Vec<RegexRule>) -> Self {
        Self { rules }
    }

    /// The rules, in priority order.
    pub fn rules(&self) -> &[RegexRule] {
        &self.rules
    }

    /// Highlight every row of `storage`.
    pub fn highlight(&self, storage: &dyn TextStorage) -> Vec<(Range, &str)> {
        self.highlight_rows(storage, 0, storage.line_count())
    }

    /// Highlight rows `start_row..end_row`, returning buffer ranges in row order.
    pub fn highlight_rows(&self, storage: &dyn TextStorage, start_row: usize, end_row: usize) -> Vec<(Range, &str)> {
        let mut highlights = Vec::new();
        for row in start_row..end_row.min(storage.line_count()) {
            let line_text = storage.line_for_row(row);
            let mut taken: Vec<(usize, usize, &str)> = Vec::new();

            for rule in &self.rules {
                let mut accept = |start_byte: usize, end_byte: usize| {
                    let Some((start, end)) = columns_for_match(&line_text, start_byte, end_byte) else {
                        return;
                    };
                    if taken.iter().any(|&(s, e, _)| start < e && s < end) {
                        return;
                    }
                    taken.push((start, end, rule.class_name.as_str()));
                };
                if let Some(group) = rule.capture_group {
                    for caps in rule.regex.captures_iter(&line_text) {
                        if let Some(m) = caps.get(group) {
                            accept(m.start(), m.end());
                        }
                    }
                } else {
                    for m in rule.regex.find_iter(&line_text) {
                        accept(m.start(), m.end());
                    }
                }
            }

            taken.sort_by_key(|&(start, _, _)| start);
            highlights.extend(
                taken
                    .into_iter()
                    .map(|(start, end, class_name)| (Range::from_coords(row, start, row, end), class_name)),
            );
        }
        highlights
    }

    /// A small default JSON grammar (strings, numbers, booleans, null).
    pub fn json_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            // JSON string (single-line, handles escapes)
            RegexRule::new(r#""(?:\\.|[^"\\])*""#, SIMPLE_CLASS_STRING)?,
            RegexRule::new(r#"-?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?"#, SIMPLE_CLASS_NUMBER)?,
            RegexRule::new(r#"\b(?:true|false)\b"#, SIMPLE_CLASS_BOOLEAN)?,
            RegexRule::new(r#"\bnull\b"#, SIMPLE_CLASS_NULL)?,
        ]))
    }

    /// A small default INI grammar (section, key, comment).
    pub fn ini_default() -> Result<Self, regex::Error> {
        Ok(Self::new(vec![
            RegexRule::new(r#"^\s*[;#].*$"#, SIMPLE_CLASS_COMMENT)?,
            // Section header: [section]
            RegexRule::new(r#"^\s*\[([^\]]+)\]\s*$"#, SIMPLE_CLASS_SECTION)?.with_capture_group(1),
            // Key: key = value
            RegexRule::new(r#"^\s*([^=\s]+)\s*="#, SIMPLE_CLASS_KEY)?.with_capture_group(1),
        ]))
    }
}

/// A [`DecorationLayer`] that keeps regex highlights current as the buffer is edited.
///
/// Edited rows are re-highlighted; spans elsewhere move with the text.
#[derive(Debug, Clone)]
pub struct RegexDecorationLayer {
    highlighter: RegexHighlighter,
    spans: SpanDecorationLayer,
}

impl RegexDecorationLayer {
    /// Highlight all of `storage` with `highlighter`.
    pub fn new(highlighter: RegexHighlighter, storage: &dyn TextStorage) -> Self {
        let mut layer = Self {
            highlighter,
            spans: SpanDecorationLayer::new(),
        };
        // Register class names up front so scope ids follow rule order.
        for rule in layer.highlighter.rules() {
            layer.spans.scope_for_class_name(&rule.class_name);
        }
        layer.rehighlight_rows(storage, 0, storage.line_count());
        layer
    }

    /// The highlighter.
    pub fn highlighter(&self) -> &RegexHighlighter {
        &self.highlighter
    }

    /// Current spans.
    pub fn spans(&self) -> &SpanDecorationLayer {
        &self.spans
    }

    fn rehighlight_rows(&mut self, storage: &dyn TextStorage, start_row: usize, end_row: usize) {
        self.spans.clear_rows(start_row, end_row);
        for (range, class_name) in self.highlighter.highlight_rows(storage, start_row, end_row) {
            self.spans.add_span(range, class_name);
        }
    }
}

impl DecorationLayer for RegexDecorationLayer {
    fn build_iterator<'a>(&'a self, storage: &'a dyn TextStorage) -> Box<dyn DecorationIterator + 'a> {
        self.spans.build_iterator(storage)
    }

    fn class_name_for_scope_id(&self, scope: ScopeId) -> Option<String> {
        self.spans.class_name_for_scope_id(scope)
    }

    fn buffer_did_change(&mut self, storage: &dyn TextStorage, change: &TextChange) -> Vec<Range> {
        self.spans.buffer_did_change(storage, change);
        let start_row = change.new_range.start.row;
        let end_row = change.new_range.end.row + 1;
        self.rehighlight_rows(storage, start_row, end_row);
        Vec::new()
    }
}

/// Default class names for [`RegexHighlighter`] grammars.
///
/// These are only identifiers. The theme layer is expected to map them to actual colors.
pub const SIMPLE_CLASS_STRING: &str = "syntax--string";
/// Numbers.
pub const SIMPLE_CLASS_NUMBER: &str = "syntax--number";
/// `true` / `false`.
pub const SIMPLE_CLASS_BOOLEAN: &str = "syntax--boolean";
/// `null`.
pub const SIMPLE_CLASS_NULL: &str = "syntax--null";
/// INI section names.
pub const SIMPLE_CLASS_SECTION: &str = "syntax--section";
/// INI keys.
pub const SIMPLE_CLASS_KEY: &str = "syntax--key";
/// INI comments.
pub const SIMPLE_CLASS_COMMENT: &str = "syntax--comment";

fn columns_for_match(line_text: &str, match_start_byte: usize, match_end_byte: usize) -> Option<(usize, usize)> {
    if match_start_byte >= match_end_byte || match_end_byte > line_text.len() {
        return None;
    }

    let start_col = line_text[..match_start_byte].chars().count();
    let end_col = line_text[..match_end_byte].chars().count();
    if start_col >= end_col {
        return None;
    }
    Some((start_col, end_col))
}

#[cfg(test)]
mod tests {
    use super::*;
    use buffer_core::{DisplayLayer, DisplayLayerId, DisplayLayerParams, TagId, Text};
    use pretty_assertions::assert_eq;

    fn class_names(layer: &DisplayLayer, tags: &[TagId]) -> Vec<String> {
        tags.iter()
            .filter_map(|tag| match tag {
                TagId::Scope(_) => layer.class_name_for_tag(*tag),
                TagId::BuiltIn(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_regex_highlighter_json_strings() {
        let text = Text::from_text(r#"{ "key": "值", "n": 12, "ok": true, "x": null }"#);
        let highlighter = RegexHighlighter::json_default().unwrap();
        let highlights = highlighter.highlight(&text);

        // Four quoted keys, one quoted value, a number and two keywords.
        assert_eq!(highlights.len(), 8);
        assert_eq!(highlights[0], (Range::from_coords(0, 2, 0, 7), SIMPLE_CLASS_STRING));
        assert_eq!(highlights[3], (Range::from_coords(0, 19, 0, 21), SIMPLE_CLASS_NUMBER));
        assert!(highlights.iter().any(|(_, class)| *class == SIMPLE_CLASS_BOOLEAN));
    }

    #[test]
    fn test_numbers_inside_strings_are_not_highlighted() {
        let text = Text::from_text(r#"["a12"]"#);
        let highlighter = RegexHighlighter::json_default().unwrap();
        assert_eq!(
            highlighter.highlight(&text),
            vec![(Range::from_coords(0, 1, 0, 6), SIMPLE_CLASS_STRING)]
        );
    }

    #[test]
    fn test_regex_highlighter_ini_capture_groups() {
        let text = Text::from_text("[core]\nname = buffer-core\n;comment\n");
        let highlighter = RegexHighlighter::ini_default().unwrap();
        let highlights = highlighter.highlight(&text);

        assert_eq!(
            highlights,
            vec![
                (Range::from_coords(0, 1, 0, 5), SIMPLE_CLASS_SECTION),
                (Range::from_coords(1, 0, 1, 4), SIMPLE_CLASS_KEY),
                (Range::from_coords(2, 0, 2, 8), SIMPLE_CLASS_COMMENT),
            ]
        );
    }

    #[test]
    fn test_decoration_layer_feeds_screen_lines() {
        let text = Text::from_text(r#"{"a": 1}"#);
        let decorations = RegexDecorationLayer::new(RegexHighlighter::json_default().unwrap(), &text);
        let mut layer = DisplayLayer::new(DisplayLayerId(0), DisplayLayerParams::new());
        layer.set_decoration_layer(Box::new(decorations));

        let line = layer.screen_line(&text, 0).unwrap();
        let tokens: Vec<(String, Vec<String>)> = line
            .tokens()
            .into_iter()
            .map(|(text, tags)| (text, class_names(&layer, &tags)))
            .collect();
        assert_eq!(
            tokens,
            vec![
                ("{".to_string(), vec![]),
                ("\"a\"".to_string(), vec![SIMPLE_CLASS_STRING.to_string()]),
                (": ".to_string(), vec![]),
                ("1".to_string(), vec![SIMPLE_CLASS_NUMBER.to_string()]),
                ("}".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn test_edits_rehighlight_changed_rows() {
        let mut text = Text::from_text("x = 1\ny = 2");
        let highlighter = RegexHighlighter::new(vec![RegexRule::new(r"\d+", "digits").unwrap()]);
        let mut layer = RegexDecorationLayer::new(highlighter, &text);

        let change = text.set_text_in_range(Range::from_coords(1, 4, 1, 5), "345");
        layer.buffer_did_change(&text, &change);

        let ranges: Vec<Range> = layer.spans().spans().iter().map(|span| span.range).collect();
        assert_eq!(
            ranges,
            vec![Range::from_coords(0, 4, 0, 5), Range::from_coords(1, 4, 1, 7)]
        );
    }
}
