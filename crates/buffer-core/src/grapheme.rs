//! Grapheme cluster boundaries in character columns.

use unicode_segmentation::UnicodeSegmentation;

/// Which character columns of a line start a grapheme cluster.
///
/// ASCII lines (the common case) skip segmentation: every column is a boundary.
#[derive(Debug, Clone, Default)]
pub(crate) struct GraphemeBoundaries {
    starts: Option<Vec<bool>>,
}

impl GraphemeBoundaries {
    pub(crate) fn new(line: &[char]) -> Self {
        if line.iter().all(char::is_ascii) {
            return Self { starts: None };
        }
        let text: String = line.iter().collect();
        let mut starts = vec![false; line.len() + 1];
        let mut column = 0;
        for grapheme in text.graphemes(true) {
            starts[column] = true;
            column += grapheme.chars().count();
        }
        starts[column] = true;
        Self {
            starts: Some(starts),
        }
    }

    /// Columns at or past the end count as boundaries.
    pub(crate) fn is_boundary(&self, column: usize) -> bool {
        match &self.starts {
            None => true,
            Some(starts) => starts.get(column).copied().unwrap_or(true),
        }
    }

    pub(crate) fn previous_boundary(&self, column: usize) -> usize {
        (0..=column)
            .rev()
            .find(|&candidate| self.is_boundary(candidate))
            .unwrap_or(0)
    }

    pub(crate) fn next_boundary(&self, column: usize) -> usize {
        (column..)
            .find(|&candidate| self.is_boundary(candidate))
            .unwrap_or(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn test_ascii_is_all_boundaries() {
        let boundaries = GraphemeBoundaries::new(&chars("abc"));
        assert!((0..=5).all(|column| boundaries.is_boundary(column)));
    }

    #[test]
    fn test_combining_mark_is_atomic() {
        // "e\u{301}x": the accent joins the preceding 'e'.
        let boundaries = GraphemeBoundaries::new(&chars("e\u{301}x"));
        assert!(boundaries.is_boundary(0));
        assert!(!boundaries.is_boundary(1));
        assert!(boundaries.is_boundary(2));
        assert_eq!(boundaries.previous_boundary(1), 0);
        assert_eq!(boundaries.next_boundary(1), 2);
    }

    #[test]
    fn test_emoji_sequence_is_atomic() {
        // Woman + ZWJ + laptop.
        let boundaries = GraphemeBoundaries::new(&chars("\u{1F469}\u{200D}\u{1F4BB}!"));
        assert!(!boundaries.is_boundary(1));
        assert!(!boundaries.is_boundary(2));
        assert!(boundaries.is_boundary(3));
    }
}
