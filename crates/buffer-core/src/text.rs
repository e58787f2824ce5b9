//! Text storage contract and the rope-backed [`Text`] implementation.
//!
//! Only `'\n'` separates rows. A `'\r'` immediately preceding it belongs to the line ending and
//! is not part of the row's content or column space.

use crate::point::{Point, Range};
use ropey::Rope;
use serde::{Deserialize, Serialize};

/// Line terminator of a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineEnding {
    /// The final row has no terminator.
    None,
    /// Unix-style LF (`'\n'`).
    Lf,
    /// Windows-style CRLF (`"\r\n"`).
    CrLf,
}

impl LineEnding {
    /// The literal terminator text.
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::None => "",
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Read access to stored text, as consumed by marker and display layers.
///
/// Positions outside the text are never errors; implementations clip them.
pub trait TextStorage {
    /// Content of `row` without its line ending. Rows past the end yield an empty string.
    fn line_for_row(&self, row: usize) -> String;

    /// Length of `row` in characters, excluding the line ending.
    fn line_length_for_row(&self, row: usize) -> usize;

    /// Terminator of `row`.
    fn line_ending_for_row(&self, row: usize) -> LineEnding;

    /// Number of rows. Always at least one.
    fn line_count(&self) -> usize;

    /// Character offset of a (clipped) position from the start of the text.
    fn character_index_for_position(&self, position: Point) -> usize;

    /// Position of a (clipped) character offset.
    fn position_for_character_index(&self, index: usize) -> Point;

    /// Text covered by a (clipped) range, line endings included.
    fn text_in_range(&self, range: Range) -> String;

    /// Content of `row` as characters.
    fn line_chars(&self, row: usize) -> Vec<char> {
        self.line_for_row(row).chars().collect()
    }

    /// Index of the last row.
    fn last_row(&self) -> usize {
        self.line_count().saturating_sub(1)
    }

    /// End of the last row.
    fn max_position(&self) -> Point {
        let row = self.last_row();
        Point::new(row, self.line_length_for_row(row))
    }

    /// Nearest valid position.
    fn clip_position(&self, position: Point) -> Point {
        let last_row = self.last_row();
        if position.row > last_row {
            return Point::new(last_row, self.line_length_for_row(last_row));
        }
        let length = self.line_length_for_row(position.row);
        Point::new(position.row, position.column.min(length))
    }

    /// Range with both endpoints clipped.
    fn clip_range(&self, range: Range) -> Range {
        Range::new(
            self.clip_position(range.start),
            self.clip_position(range.end),
        )
    }
}

/// An applied replacement, expressed in both pre-edit and post-edit coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChange {
    /// Replaced range in pre-edit coordinates.
    pub old_range: Range,
    /// Inserted range in post-edit coordinates.
    pub new_range: Range,
    /// Text that was removed.
    pub old_text: String,
    /// Text that was inserted.
    pub new_text: String,
}

impl TextChange {
    /// Where the change starts (identical in both coordinate spaces).
    pub fn start(&self) -> Point {
        self.old_range.start
    }

    /// Extent of the removed text.
    pub fn old_extent(&self) -> Point {
        self.old_range.extent()
    }

    /// Extent of the inserted text.
    pub fn new_extent(&self) -> Point {
        self.new_range.extent()
    }

    /// The change that undoes this one.
    pub fn invert(&self) -> TextChange {
        TextChange {
            old_range: self.new_range,
            new_range: self.old_range,
            old_text: self.new_text.clone(),
            new_text: self.old_text.clone(),
        }
    }
}

/// Extent of `text` when inserted at the origin.
pub fn extent_for_text(text: &str) -> Point {
    let mut row = 0;
    let mut column = 0;
    for ch in text.chars() {
        if ch == '\n' {
            row += 1;
            column = 0;
        } else {
            column += 1;
        }
    }
    Point::new(row, column)
}

/// Rope-backed text storage.
#[derive(Debug, Clone, Default)]
pub struct Text {
    rope: Rope,
}

impl Text {
    /// Create an empty text.
    pub fn new() -> Self {
        Self { rope: Rope::new() }
    }

    /// Build storage from a string.
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Total characters, line endings included.
    pub fn char_count(&self) -> usize {
        self.rope.len_chars()
    }

    /// Replace `range` (clipped) with `text` and describe the applied change.
    pub fn set_text_in_range(&mut self, range: Range, text: &str) -> TextChange {
        let old_range = self.clip_range(range);
        let start_index = self.character_index_for_position(old_range.start);
        let end_index = self.character_index_for_position(old_range.end);
        let old_text = self.rope.slice(start_index..end_index).to_string();

        self.rope.remove(start_index..end_index);
        self.rope.insert(start_index, text);

        let new_end = self.clip_position(old_range.start.traverse(extent_for_text(text)));
        TextChange {
            old_range,
            new_range: Range::new(old_range.start, new_end),
            old_text,
            new_text: text.to_string(),
        }
    }

    fn raw_line_bounds(&self, row: usize) -> Option<(usize, usize)> {
        if row >= self.rope.len_lines() {
            return None;
        }
        let start = self.rope.line_to_char(row);
        let end = if row + 1 < self.rope.len_lines() {
            self.rope.line_to_char(row + 1)
        } else {
            self.rope.len_chars()
        };
        Some((start, end))
    }
}

impl TextStorage for Text {
    fn line_for_row(&self, row: usize) -> String {
        if row >= self.rope.len_lines() {
            return String::new();
        }
        let mut line = self.rope.line(row).to_string();
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        line
    }

    fn line_length_for_row(&self, row: usize) -> usize {
        let Some((start, end)) = self.raw_line_bounds(row) else {
            return 0;
        };
        let mut length = end - start;
        if length > 0 && self.rope.char(end - 1) == '\n' {
            length -= 1;
            if length > 0 && self.rope.char(end - 2) == '\r' {
                length -= 1;
            }
        }
        length
    }

    fn line_ending_for_row(&self, row: usize) -> LineEnding {
        let Some((start, end)) = self.raw_line_bounds(row) else {
            return LineEnding::None;
        };
        if end == start || self.rope.char(end - 1) != '\n' {
            LineEnding::None
        } else if end - start >= 2 && self.rope.char(end - 2) == '\r' {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        }
    }

    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn character_index_for_position(&self, position: Point) -> usize {
        let position = self.clip_position(position);
        self.rope.line_to_char(position.row) + position.column
    }

    fn position_for_character_index(&self, index: usize) -> Point {
        let index = index.min(self.rope.len_chars());
        let row = self.rope.char_to_line(index);
        let column = index - self.rope.line_to_char(row);
        self.clip_position(Point::new(row, column))
    }

    fn text_in_range(&self, range: Range) -> String {
        let range = self.clip_range(range);
        let start = self.character_index_for_position(range.start);
        let end = self.character_index_for_position(range.end);
        self.rope.slice(start..end).to_string()
    }

    fn line_chars(&self, row: usize) -> Vec<char> {
        let length = self.line_length_for_row(row);
        match self.raw_line_bounds(row) {
            Some((start, _)) => self.rope.slice(start..start + length).chars().collect(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_and_endings() {
        let text = Text::from_text("abc\r\ndef\nghi");
        assert_eq!(text.line_count(), 3);
        assert_eq!(text.line_for_row(0), "abc");
        assert_eq!(text.line_length_for_row(0), 3);
        assert_eq!(text.line_ending_for_row(0), LineEnding::CrLf);
        assert_eq!(text.line_ending_for_row(1), LineEnding::Lf);
        assert_eq!(text.line_ending_for_row(2), LineEnding::None);
        assert_eq!(text.line_for_row(7), "");
    }

    #[test]
    fn test_trailing_newline_creates_empty_row() {
        let text = Text::from_text("abc\n");
        assert_eq!(text.line_count(), 2);
        assert_eq!(text.line_length_for_row(1), 0);
        assert_eq!(text.max_position(), Point::new(1, 0));
    }

    #[test]
    fn test_clip_position() {
        let text = Text::from_text("abc\nde");
        assert_eq!(text.clip_position(Point::new(0, 10)), Point::new(0, 3));
        assert_eq!(text.clip_position(Point::new(9, 0)), Point::new(1, 2));
    }

    #[test]
    fn test_character_index_round_trip() {
        let text = Text::from_text("ab\r\ncd\nef");
        assert_eq!(text.character_index_for_position(Point::new(1, 1)), 5);
        assert_eq!(text.position_for_character_index(5), Point::new(1, 1));
        // The '\r' is not addressable as a column.
        assert_eq!(text.position_for_character_index(2), Point::new(0, 2));
        assert_eq!(text.position_for_character_index(3), Point::new(0, 2));
    }

    #[test]
    fn test_set_text_in_range() {
        let mut text = Text::from_text("hello world");
        let change = text.set_text_in_range(Range::from_coords(0, 5, 0, 6), "\nnew ");
        assert_eq!(text.text(), "hello\nnew world");
        assert_eq!(change.old_range, Range::from_coords(0, 5, 0, 6));
        assert_eq!(change.new_range, Range::from_coords(0, 5, 1, 4));
        assert_eq!(change.old_text, " ");

        let inverse = change.invert();
        text.set_text_in_range(inverse.old_range, &inverse.new_text);
        assert_eq!(text.text(), "hello world");
    }

    #[test]
    fn test_text_in_range() {
        let text = Text::from_text("one\ntwo\nthree");
        assert_eq!(text.text_in_range(Range::from_coords(0, 1, 2, 2)), "ne\ntwo\nth");
    }
}
