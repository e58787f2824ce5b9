//! Spatial index: the hunks where buffer ("old") and screen ("new") coordinates diverge.
//!
//! Between hunks the mapping is the identity, offset by the preceding hunk. Two hunk shapes
//! exist: folds (non-empty old extent collapsed to one screen column) and soft wraps (empty old
//! extent expanding to a line break plus indentation). Hard tabs are not represented here.
//!
//! Hunks are kept in a sorted `Vec`; lookups are binary searches.

use crate::point::Point;
use serde::{Deserialize, Serialize};

/// One region where buffer and screen coordinates diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    /// Buffer start.
    pub old_start: Point,
    /// Buffer end.
    pub old_end: Point,
    /// Screen start (tabs unexpanded).
    pub new_start: Point,
    /// Screen end (tabs unexpanded).
    pub new_end: Point,
}

impl Hunk {
    /// Soft wraps occupy no buffer text.
    pub fn is_soft_wrap(&self) -> bool {
        self.old_start == self.old_end
    }

    /// Buffer extent.
    pub fn old_extent(&self) -> Point {
        self.old_end.traversal(self.old_start)
    }

    /// Screen extent.
    pub fn new_extent(&self) -> Point {
        self.new_end.traversal(self.new_start)
    }
}

/// Ordered, non-overlapping hunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpatialIndex {
    hunks: Vec<Hunk>,
}

impl SpatialIndex {
    /// An identity mapping.
    pub fn new() -> Self {
        Self { hunks: Vec::new() }
    }

    /// All hunks in order.
    pub fn hunks(&self) -> &[Hunk] {
        &self.hunks
    }

    /// Number of hunks.
    pub fn len(&self) -> usize {
        self.hunks.len()
    }

    /// Whether the mapping is the identity.
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// Drop every hunk.
    pub fn clear(&mut self) {
        self.hunks.clear();
    }

    /// The last hunk starting at or before `position` in buffer coordinates.
    pub fn hunk_for_old_position(&self, position: Point) -> Option<Hunk> {
        let index = self.hunks.partition_point(|hunk| hunk.old_start <= position);
        index.checked_sub(1).map(|index| self.hunks[index])
    }

    /// The last hunk starting at or before `position` in screen coordinates.
    pub fn hunk_for_new_position(&self, position: Point) -> Option<Hunk> {
        let index = self.hunks.partition_point(|hunk| hunk.new_start <= position);
        index.checked_sub(1).map(|index| self.hunks[index])
    }

    /// Hunks whose screen span overlaps `[start, end)`, plus any hunk ending exactly at `start`.
    pub fn hunks_in_new_range(&self, start: Point, end: Point) -> Vec<Hunk> {
        let first = self.hunks.partition_point(|hunk| hunk.new_end < start);
        self.hunks[first..]
            .iter()
            .take_while(|hunk| hunk.new_start < end)
            .copied()
            .collect()
    }

    /// Buffer position of a screen position lying outside every hunk.
    pub fn translate_new_to_old(&self, position: Point) -> Point {
        match self.hunk_for_new_position(position) {
            Some(hunk) if position < hunk.new_end => hunk.old_start,
            Some(hunk) => hunk.old_end.traverse(position.traversal(hunk.new_end)),
            None => position,
        }
    }

    /// Screen position of a buffer position lying outside every hunk.
    pub fn translate_old_to_new(&self, position: Point) -> Point {
        match self.hunk_for_old_position(position) {
            Some(hunk) if position < hunk.old_end => hunk.new_start,
            Some(hunk) => hunk.new_end.traverse(position.traversal(hunk.old_end)),
            None => position,
        }
    }

    /// Replace the screen region `[new_start, new_start + old_extent)` with `new_extent`.
    ///
    /// Hunks intersecting the region merge into a single hunk; hunks after it shift. Hunks that
    /// merely touch the region stay separate.
    pub fn splice(&mut self, new_start: Point, old_extent: Point, new_extent: Point) {
        let region_end = new_start.traverse(old_extent);
        let replacement_end = new_start.traverse(new_extent);
        let shift = |position: Point| replacement_end.traverse(position.traversal(region_end));

        let first = self.hunks.partition_point(|hunk| hunk.new_end <= new_start);
        let last = self.hunks.partition_point(|hunk| hunk.new_start < region_end).max(first);
        let overlapping = &self.hunks[first..last];

        let (merged_new_start, old_start) = match overlapping.first() {
            Some(hunk) if hunk.new_start <= new_start => (hunk.new_start, hunk.old_start),
            _ => (new_start, self.old_for_new_before(first, new_start)),
        };
        let (merged_new_end, old_end) = match overlapping.last() {
            Some(hunk) if hunk.new_end >= region_end => (hunk.new_end, hunk.old_end),
            Some(hunk) => (
                region_end,
                hunk.old_end.traverse(region_end.traversal(hunk.new_end)),
            ),
            None => (region_end, self.old_for_new_before(first, region_end)),
        };

        let merged = Hunk {
            old_start,
            old_end,
            new_start: merged_new_start,
            new_end: shift(merged_new_end),
        };

        let mut tail: Vec<Hunk> = self.hunks.drain(first..).skip(last - first).collect();
        for hunk in &mut tail {
            hunk.new_start = shift(hunk.new_start);
            hunk.new_end = shift(hunk.new_end);
        }
        if merged.old_start != merged.old_end || merged.new_start != merged.new_end {
            self.hunks.push(merged);
        }
        self.hunks.extend(tail);
    }

    /// Map a screen position through the identity region following `hunks[..index]`.
    fn old_for_new_before(&self, index: usize, position: Point) -> Point {
        match index.checked_sub(1).map(|index| self.hunks[index]) {
            Some(hunk) => hunk.old_end.traverse(position.traversal(hunk.new_end)),
            None => position,
        }
    }

    /// Buffer edit: replace `[old_start, old_start + old_extent)` with `new_extent`.
    ///
    /// Hunks inside the region are discarded, leaving it as an identity mapping; later hunks
    /// shift in both coordinate spaces. Callers pass row-aligned regions that do not cut
    /// through a hunk.
    pub fn splice_old(&mut self, old_start: Point, old_extent: Point, new_extent: Point) {
        let old_end = old_start.traverse(old_extent);
        let replacement_end = old_start.traverse(new_extent);

        let first = self.hunks.partition_point(|hunk| hunk.old_end <= old_start);
        let last = self
            .hunks
            .partition_point(|hunk| hunk.old_start < old_end)
            .max(first);

        let new_start = self.translate_old_to_new(old_start);
        let new_end_before = self.translate_old_to_new(old_end);
        let new_replacement_end = new_start.traverse(new_extent);

        let mut tail: Vec<Hunk> = self.hunks.drain(first..).skip(last - first).collect();
        for hunk in &mut tail {
            hunk.old_start = replacement_end.traverse(hunk.old_start.traversal(old_end));
            hunk.old_end = replacement_end.traverse(hunk.old_end.traversal(old_end));
            hunk.new_start = new_replacement_end.traverse(hunk.new_start.traversal(new_end_before));
            hunk.new_end = new_replacement_end.traverse(hunk.new_end.traversal(new_end_before));
        }
        self.hunks.extend(tail);
    }

    /// Release spare capacity once the whole buffer has been indexed.
    pub fn rebalance(&mut self) {
        self.hunks.shrink_to_fit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(row: usize, column: usize) -> Point {
        Point::new(row, column)
    }

    #[test]
    fn test_fold_hunk_lookup() {
        let mut index = SpatialIndex::new();
        // Fold buffer (0,1)..(1,2) into one screen column at (0,1).
        index.splice(p(0, 1), p(1, 2), p(0, 1));
        let hunk = index.hunk_for_old_position(p(0, 2)).unwrap();
        assert_eq!(hunk.old_start, p(0, 1));
        assert_eq!(hunk.old_end, p(1, 2));
        assert_eq!(hunk.new_start, p(0, 1));
        assert_eq!(hunk.new_end, p(0, 2));
        assert_eq!(index.translate_old_to_new(p(1, 3)), p(0, 3));
        assert_eq!(index.translate_new_to_old(p(0, 3)), p(1, 3));
        assert!(index.hunk_for_old_position(p(0, 0)).is_none());
    }

    #[test]
    fn test_soft_wrap_hunks_shift_later_hunks() {
        let mut index = SpatialIndex::new();
        index.splice(p(0, 8), Point::ZERO, p(1, 2));
        let wrap = index.hunks()[0];
        assert!(wrap.is_soft_wrap());
        assert_eq!(wrap.new_end, p(1, 2));
        assert_eq!(index.translate_old_to_new(p(0, 10)), p(1, 4));

        // A fold on the next buffer row lands one screen row further down.
        index.splice(p(2, 0), p(0, 3), p(0, 1));
        let fold = index.hunks()[1];
        assert_eq!(fold.old_start, p(1, 0));
        assert_eq!(fold.old_end, p(1, 3));
        assert_eq!(fold.new_start, p(2, 0));

        // A wrap inserted before both shifts them.
        index.splice(p(0, 4), Point::ZERO, p(1, 0));
        assert_eq!(index.len(), 3);
        assert_eq!(index.hunks()[1].new_start, p(1, 4));
        assert_eq!(index.hunks()[2].new_start, p(3, 0));
    }

    #[test]
    fn test_adjacent_hunks_stay_separate() {
        let mut index = SpatialIndex::new();
        index.splice(p(0, 4), Point::ZERO, p(1, 0));
        index.splice(p(1, 0), p(0, 3), p(0, 1));
        assert_eq!(index.len(), 2);
        assert!(index.hunks()[0].is_soft_wrap());
        assert!(!index.hunks()[1].is_soft_wrap());
    }

    #[test]
    fn test_splice_old_clears_region_and_shifts() {
        let mut index = SpatialIndex::new();
        index.splice(p(0, 1), p(0, 2), p(0, 1)); // fold on row 0
        index.splice(p(2, 1), p(1, 0), p(0, 1)); // fold rows 2..3
        index.splice(p(4, 0), p(0, 1), p(0, 1)); // fold on row 5 (screen row 4)

        // Buffer rows 2..4 are replaced by three rows.
        index.splice_old(p(2, 0), p(2, 0), p(3, 0));
        assert_eq!(index.len(), 2);
        let last = index.hunks()[1];
        assert_eq!(last.old_start, p(6, 0));
        assert_eq!(last.new_start, p(6, 0));
    }

    #[test]
    fn test_hunks_in_new_range() {
        let mut index = SpatialIndex::new();
        index.splice(p(0, 5), Point::ZERO, p(1, 0));
        index.splice(p(1, 2), p(0, 2), p(0, 1));
        index.splice(p(3, 0), p(0, 2), p(0, 1));

        let hunks = index.hunks_in_new_range(p(1, 0), p(2, 0));
        assert_eq!(hunks.len(), 2);
        assert!(hunks[0].is_soft_wrap());
        assert_eq!(index.hunks_in_new_range(p(2, 0), p(3, 0)).len(), 0);
    }
}
