//! Points and ranges shared by buffer space and screen space.
//!
//! Both coordinate spaces use the same zero-based `(row, column)` representation. Columns count
//! `char`s within a line.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Zero-based `(row, column)` coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Zero-based row index.
    pub row: usize,
    /// Zero-based column in characters within the row.
    pub column: usize,
}

impl Point {
    /// The origin.
    pub const ZERO: Point = Point { row: 0, column: 0 };

    /// A point greater than any real position. Used for unbounded queries.
    pub const MAX: Point = Point {
        row: usize::MAX,
        column: usize::MAX,
    };

    /// Create a new point.
    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Build a point from floating point coordinates.
    ///
    /// Non-finite coordinates are rejected, negative coordinates clip to zero and fractional
    /// parts are truncated.
    pub fn from_f64(row: f64, column: f64) -> Result<Self> {
        if !row.is_finite() || !column.is_finite() {
            return Err(Error::InvalidPosition { row, column });
        }
        Ok(Self {
            row: row.max(0.0) as usize,
            column: column.max(0.0) as usize,
        })
    }

    /// Whether this is the origin.
    pub fn is_zero(&self) -> bool {
        self.row == 0 && self.column == 0
    }

    /// Advance by `delta`.
    ///
    /// A delta with a zero row moves along the current row; otherwise the result lands on
    /// `row + delta.row` at exactly `delta.column`.
    pub fn traverse(self, delta: Point) -> Point {
        if delta.row == 0 {
            Point::new(self.row, self.column.saturating_add(delta.column))
        } else {
            Point::new(self.row.saturating_add(delta.row), delta.column)
        }
    }

    /// The delta that, traversed from `start`, lands on `self`. Inverse of [`Point::traverse`].
    pub fn traversal(self, start: Point) -> Point {
        if self.row == start.row {
            Point::new(0, self.column.saturating_sub(start.column))
        } else {
            Point::new(self.row.saturating_sub(start.row), self.column)
        }
    }

    /// Return the smaller of two points.
    pub fn min(self, other: Point) -> Point {
        if other < self { other } else { self }
    }

    /// Return the larger of two points.
    pub fn max(self, other: Point) -> Point {
        if other > self { other } else { self }
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row
            .cmp(&other.row)
            .then_with(|| self.column.cmp(&other.column))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

impl From<(usize, usize)> for Point {
    fn from((row, column): (usize, usize)) -> Self {
        Point::new(row, column)
    }
}

/// Half-open span between two points with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    /// Start position (inclusive).
    pub start: Point,
    /// End position.
    pub end: Point,
}

impl Range {
    /// Create a range; the endpoints are ordered so that `start <= end`.
    pub fn new(a: Point, b: Point) -> Self {
        if b < a {
            Self { start: b, end: a }
        } else {
            Self { start: a, end: b }
        }
    }

    /// Empty range at `point`.
    pub fn empty(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    /// Convenience constructor from raw coordinates.
    pub fn from_coords(start_row: usize, start_column: usize, end_row: usize, end_column: usize) -> Self {
        Self::new(
            Point::new(start_row, start_column),
            Point::new(end_row, end_column),
        )
    }

    /// Whether `start == end`.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the range spans exactly one row.
    pub fn is_single_line(&self) -> bool {
        self.start.row == self.end.row
    }

    /// The traversal from start to end.
    pub fn extent(&self) -> Point {
        self.end.traversal(self.start)
    }

    /// Number of rows touched by the range.
    pub fn row_count(&self) -> usize {
        self.end.row - self.start.row + 1
    }

    /// Whether `point` lies within the range, endpoints included.
    pub fn contains_point(&self, point: Point) -> bool {
        self.start <= point && point <= self.end
    }

    /// Whether `point` lies strictly inside the range.
    pub fn contains_point_exclusive(&self, point: Point) -> bool {
        self.start < point && point < self.end
    }

    /// Whether `other` is entirely covered by this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether the ranges share at least one point, endpoints included.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Whether the range touches `row`.
    pub fn intersects_row(&self, row: usize) -> bool {
        self.start.row <= row && row <= self.end.row
    }

    /// Whether the range touches any row in `start_row..=end_row`.
    pub fn intersects_row_range(&self, start_row: usize, end_row: usize) -> bool {
        self.start.row <= end_row && start_row <= self.end.row
    }

    /// The overlapping portion, if any.
    pub fn intersection(&self, other: &Range) -> Option<Range> {
        if !self.intersects(other) {
            return None;
        }
        Some(Range {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// The smallest range covering both.
    pub fn union(&self, other: &Range) -> Range {
        Range {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Move both endpoints by `delta`.
    pub fn traverse(&self, delta: Point) -> Range {
        Range {
            start: self.start.traverse(delta),
            end: self.end.traverse(delta),
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} - {}]", self.start, self.end)
    }
}

/// Tie-break policy when a position falls inside an atomic on-screen unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClipDirection {
    /// Snap to the start of the unit.
    Backward,
    /// Snap to the end of the unit.
    Forward,
    /// Snap to whichever end is nearer.
    #[default]
    Closest,
}

/// Conversion from caller-supplied coordinates into a [`Point`].
pub trait IntoPoint {
    /// Convert, failing with [`Error::InvalidPosition`] on non-finite input.
    fn into_point(self) -> Result<Point>;
}

impl IntoPoint for Point {
    fn into_point(self) -> Result<Point> {
        Ok(self)
    }
}

impl IntoPoint for (usize, usize) {
    fn into_point(self) -> Result<Point> {
        Ok(Point::new(self.0, self.1))
    }
}

impl IntoPoint for [usize; 2] {
    fn into_point(self) -> Result<Point> {
        Ok(Point::new(self[0], self[1]))
    }
}

impl IntoPoint for (f64, f64) {
    fn into_point(self) -> Result<Point> {
        Point::from_f64(self.0, self.1)
    }
}

impl IntoPoint for [f64; 2] {
    fn into_point(self) -> Result<Point> {
        Point::from_f64(self[0], self[1])
    }
}

/// Conversion from caller-supplied coordinates into a [`Range`].
pub trait IntoRange {
    /// Convert, failing with [`Error::InvalidPosition`] on non-finite input.
    fn into_range(self) -> Result<Range>;
}

impl IntoRange for Range {
    fn into_range(self) -> Result<Range> {
        Ok(self)
    }
}

impl<A: IntoPoint, B: IntoPoint> IntoRange for (A, B) {
    fn into_range(self) -> Result<Range> {
        let start = self.0.into_point()?;
        let end = self.1.into_point()?;
        Ok(Range::new(start, end))
    }
}

impl<P: IntoPoint> IntoRange for [P; 2] {
    fn into_range(self) -> Result<Range> {
        let [start, end] = self;
        Ok(Range::new(start.into_point()?, end.into_point()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ordering() {
        assert!(Point::new(0, 5) < Point::new(1, 0));
        assert!(Point::new(2, 1) > Point::new(2, 0));
        assert_eq!(Point::new(3, 3).cmp(&Point::new(3, 3)), Ordering::Equal);
        assert_eq!(Point::new(1, 9).max(Point::new(2, 0)), Point::new(2, 0));
    }

    #[test]
    fn test_traverse_and_traversal() {
        let p = Point::new(2, 3);
        assert_eq!(p.traverse(Point::new(0, 4)), Point::new(2, 7));
        assert_eq!(p.traverse(Point::new(1, 4)), Point::new(3, 4));
        assert_eq!(Point::new(2, 7).traversal(p), Point::new(0, 4));
        assert_eq!(Point::new(5, 1).traversal(p), Point::new(3, 1));
        assert_eq!(p.traverse(Point::new(5, 1).traversal(p)), Point::new(5, 1));
    }

    #[test]
    fn test_range_new_orders_endpoints() {
        let range = Range::new(Point::new(4, 0), Point::new(1, 2));
        assert_eq!(range.start, Point::new(1, 2));
        assert_eq!(range.end, Point::new(4, 0));
        assert_eq!(range.extent(), Point::new(3, 0));
    }

    #[test]
    fn test_range_set_operations() {
        let a = Range::from_coords(0, 2, 0, 8);
        let b = Range::from_coords(0, 5, 1, 0);
        assert!(a.intersects(&b));
        assert_eq!(a.intersection(&b), Some(Range::from_coords(0, 5, 0, 8)));
        assert_eq!(a.union(&b), Range::from_coords(0, 2, 1, 0));
        assert!(a.contains_range(&Range::from_coords(0, 3, 0, 4)));
        assert!(!a.contains_point_exclusive(Point::new(0, 8)));
        assert!(a.contains_point(Point::new(0, 8)));
        assert_eq!(a.intersection(&Range::from_coords(2, 0, 3, 0)), None);
    }

    #[test]
    fn test_f64_coordinates() {
        assert_eq!(Point::from_f64(-3.0, 2.7).unwrap(), Point::new(0, 2));
        assert!(matches!(
            Point::from_f64(f64::NAN, 1.0),
            Err(Error::InvalidPosition { .. })
        ));
        assert!((Point::ZERO, (f64::INFINITY, 0.0)).into_range().is_err());
        assert_eq!(
            [[1usize, 2], [0, 4]].into_range().unwrap(),
            Range::from_coords(0, 4, 1, 2)
        );
    }
}
