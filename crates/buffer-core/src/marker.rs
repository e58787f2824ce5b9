//! Markers: head/tail anchored ranges that follow edits.

use crate::point::{Point, Range};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arbitrary JSON-compatible metadata attached to a marker.
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// Marker identifier, unique within its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When an edit turns a marker invalid. Variants are ordered from least to most fragile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvalidationStrategy {
    /// Never invalidated.
    Never,
    /// Invalidated when a change covers the whole marker.
    Surround,
    /// Invalidated when a change intersects the marker's interior.
    #[default]
    Overlap,
    /// Like `Overlap`, plus insertions at a boundary that grow the marker.
    Inside,
    /// Invalidated by any change touching the marker, adjacency included.
    Touch,
}

/// Options for `mark_range` / `mark_position`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerOptions {
    /// Place the head at the start of the range.
    pub reversed: bool,
    /// Create the marker without a tail.
    pub tailless: bool,
    /// Invalidation strategy.
    pub invalidate: InvalidationStrategy,
    /// Keep insertions at the boundaries outside the marker. Defaults to `true` for the
    /// `Inside` strategy and for tail-less markers, `false` otherwise.
    pub exclusive: Option<bool>,
    /// Initial properties.
    pub properties: Properties,
}

impl MarkerOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the invalidation strategy.
    pub fn invalidate(mut self, strategy: InvalidationStrategy) -> Self {
        self.invalidate = strategy;
        self
    }

    /// Set exclusivity explicitly.
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = Some(exclusive);
        self
    }

    /// Put the head before the tail.
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    /// Create a marker with no tail.
    pub fn tailless(mut self) -> Self {
        self.tailless = true;
        self
    }

    /// Attach a property.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub(crate) fn resolved_exclusive(&self) -> bool {
        self.exclusive
            .unwrap_or(self.invalidate == InvalidationStrategy::Inside || self.tailless)
    }
}

/// A logical range over buffer coordinates.
///
/// `range` always has `start <= end`; `reversed` tells which end is the head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    id: MarkerId,
    range: Range,
    reversed: bool,
    has_tail: bool,
    invalidate: InvalidationStrategy,
    exclusive: bool,
    properties: Properties,
    valid: bool,
}

impl Marker {
    pub(crate) fn new(id: MarkerId, range: Range, options: MarkerOptions) -> Self {
        let exclusive = options.resolved_exclusive();
        let has_tail = !options.tailless;
        let range = if has_tail { range } else { Range::empty(range.end) };
        Self {
            id,
            range,
            reversed: has_tail && options.reversed && !range.is_empty(),
            has_tail,
            invalidate: options.invalidate,
            exclusive,
            properties: options.properties,
            valid: true,
        }
    }

    /// Identifier within the owning layer.
    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Covered range.
    pub fn range(&self) -> Range {
        self.range
    }

    /// Start of the range.
    pub fn start(&self) -> Point {
        self.range.start
    }

    /// End of the range.
    pub fn end(&self) -> Point {
        self.range.end
    }

    /// The moving end.
    pub fn head(&self) -> Point {
        if self.reversed {
            self.range.start
        } else {
            self.range.end
        }
    }

    /// The anchored end. Equal to the head for tail-less markers.
    pub fn tail(&self) -> Point {
        if self.reversed {
            self.range.end
        } else {
            self.range.start
        }
    }

    /// Whether the head precedes the tail.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// Whether the marker tracks a tail.
    pub fn has_tail(&self) -> bool {
        self.has_tail
    }

    /// Whether no edit has invalidated the marker.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether boundary insertions stay outside the marker.
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Invalidation strategy.
    pub fn invalidation_strategy(&self) -> InvalidationStrategy {
        self.invalidate
    }

    /// Attached properties.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub(crate) fn state(&self) -> MarkerState {
        MarkerState {
            head: self.head(),
            tail: self.tail(),
            has_tail: self.has_tail,
            valid: self.valid,
            properties: self.properties.clone(),
        }
    }

    /// Move head and tail; the range is derived from them.
    pub(crate) fn set_head_and_tail(&mut self, head: Point, tail: Point) {
        self.reversed = head < tail;
        self.range = Range::new(head, tail);
    }

    pub(crate) fn set_range(&mut self, range: Range, reversed: bool) {
        self.range = range;
        self.reversed = reversed && !range.is_empty();
    }

    pub(crate) fn set_has_tail(&mut self, has_tail: bool) {
        self.has_tail = has_tail;
    }

    pub(crate) fn set_valid(&mut self, valid: bool) {
        self.valid = valid;
    }

    pub(crate) fn set_exclusive(&mut self, exclusive: bool) {
        self.exclusive = exclusive;
    }

    pub(crate) fn set_invalidation_strategy(&mut self, strategy: InvalidationStrategy) {
        self.invalidate = strategy;
    }

    pub(crate) fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// Whether replacing `[change_start, change_end)` invalidates this marker under its strategy.
    pub(crate) fn is_invalidated_by(&self, change_start: Point, change_end: Point) -> bool {
        let (start, end) = (self.range.start, self.range.end);
        let interior = change_start < end && change_end > start;
        let insertion = change_start == change_end;
        match self.invalidate {
            InvalidationStrategy::Never => false,
            InvalidationStrategy::Surround => {
                change_start <= start
                    && end <= change_end
                    && !insertion
                    && (start < end || (change_start < start && end < change_end))
            }
            InvalidationStrategy::Overlap => interior,
            InvalidationStrategy::Inside => {
                let at_boundary = insertion && (change_start == start || change_start == end);
                interior || (at_boundary && !self.exclusive)
            }
            InvalidationStrategy::Touch => {
                interior || change_end == start || change_start == end
            }
        }
    }

    /// Apply a buffer edit. Returns whether the edit invalidated the marker.
    pub(crate) fn splice(&mut self, start: Point, old_extent: Point, new_extent: Point) -> bool {
        let change_end = start.traverse(old_extent);
        let new_end = start.traverse(new_extent);
        let invalidated = self.valid && self.is_invalidated_by(start, change_end);

        let empty = self.range.is_empty();
        let shifted_start = shift_position(self.range.start, start, change_end, new_end, self.exclusive);
        let shifted_end = shift_position(
            self.range.end,
            start,
            change_end,
            new_end,
            !self.exclusive || empty,
        );
        self.range = Range {
            start: shifted_start,
            end: shifted_end.max(shifted_start),
        };
        if self.range.is_empty() {
            self.reversed = false;
        }
        if invalidated {
            self.valid = false;
        }
        invalidated
    }
}

/// Where `position` lands after `[change_start, change_end)` is replaced by text ending at
/// `new_end`. `moves_on_insertion` decides the outcome for an insertion exactly at `position`.
pub(crate) fn shift_position(
    position: Point,
    change_start: Point,
    change_end: Point,
    new_end: Point,
    moves_on_insertion: bool,
) -> Point {
    if position < change_start {
        return position;
    }
    if change_start == change_end {
        if position == change_start && !moves_on_insertion {
            return position;
        }
        return new_end.traverse(position.traversal(change_end));
    }
    if position == change_start {
        position
    } else if position < change_end {
        new_end
    } else {
        new_end.traverse(position.traversal(change_end))
    }
}

/// Observable state of a marker, used to diff before/after an operation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarkerState {
    pub head: Point,
    pub tail: Point,
    pub has_tail: bool,
    pub valid: bool,
    pub properties: Properties,
}

/// Payload of a marker change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerChangeEvent {
    /// The marker that changed.
    pub marker_id: MarkerId,
    /// Head before the change.
    pub old_head: Point,
    /// Head after the change.
    pub new_head: Point,
    /// Tail before the change.
    pub old_tail: Point,
    /// Tail after the change.
    pub new_tail: Point,
    /// Whether a tail existed before.
    pub had_tail: bool,
    /// Whether a tail exists now.
    pub has_tail: bool,
    /// Validity before.
    pub was_valid: bool,
    /// Validity now.
    pub is_valid: bool,
    /// Properties before.
    pub old_properties: Properties,
    /// Properties now.
    pub new_properties: Properties,
    /// Whether a text edit caused the change.
    pub text_changed: bool,
}

impl MarkerChangeEvent {
    pub(crate) fn between(marker_id: MarkerId, old: MarkerState, new: MarkerState, text_changed: bool) -> Self {
        Self {
            marker_id,
            old_head: old.head,
            new_head: new.head,
            old_tail: old.tail,
            new_tail: new.tail,
            had_tail: old.has_tail,
            has_tail: new.has_tail,
            was_valid: old.valid,
            is_valid: new.valid,
            old_properties: old.properties,
            new_properties: new.properties,
            text_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(range: Range, strategy: InvalidationStrategy) -> Marker {
        Marker::new(MarkerId(1), range, MarkerOptions::new().invalidate(strategy))
    }

    fn invalidated(strategy: InvalidationStrategy, change: Range) -> bool {
        let marker = marker(Range::from_coords(0, 3, 0, 6), strategy);
        marker.is_invalidated_by(change.start, change.end)
    }

    #[test]
    fn test_invalidation_table() {
        use InvalidationStrategy::*;

        let inside_edit = Range::from_coords(0, 4, 0, 5);
        let insert_at_start = Range::from_coords(0, 3, 0, 3);
        let ending_at_start = Range::from_coords(0, 1, 0, 3);
        let covering = Range::from_coords(0, 2, 0, 7);
        let before = Range::from_coords(0, 0, 0, 1);

        assert!(!invalidated(Never, covering));

        assert!(invalidated(Surround, covering));
        assert!(!invalidated(Surround, inside_edit));

        assert!(invalidated(Overlap, inside_edit));
        assert!(!invalidated(Overlap, insert_at_start));
        assert!(!invalidated(Overlap, ending_at_start));

        assert!(invalidated(Inside, inside_edit));
        assert!(!invalidated(Inside, ending_at_start));

        assert!(invalidated(Touch, insert_at_start));
        assert!(invalidated(Touch, ending_at_start));
        assert!(!invalidated(Touch, before));
    }

    #[test]
    fn test_inside_boundary_insertions_depend_on_exclusivity() {
        let inclusive = Marker::new(
            MarkerId(1),
            Range::from_coords(0, 3, 0, 6),
            MarkerOptions::new()
                .invalidate(InvalidationStrategy::Inside)
                .exclusive(false),
        );
        assert!(inclusive.is_invalidated_by(Point::new(0, 6), Point::new(0, 6)));

        let exclusive = marker(Range::from_coords(0, 3, 0, 6), InvalidationStrategy::Inside);
        assert!(exclusive.is_exclusive());
        assert!(!exclusive.is_invalidated_by(Point::new(0, 6), Point::new(0, 6)));
    }

    #[test]
    fn test_splice_shifts_following_positions() {
        let mut m = marker(Range::from_coords(1, 2, 1, 5), InvalidationStrategy::Overlap);
        // Insert a newline and two characters before the marker on the same row.
        m.splice(Point::new(1, 0), Point::ZERO, Point::new(1, 2));
        assert_eq!(m.range(), Range::from_coords(2, 4, 2, 7));
        assert!(m.is_valid());
    }

    #[test]
    fn test_insertion_at_endpoints() {
        let mut inclusive = marker(Range::from_coords(0, 2, 0, 4), InvalidationStrategy::Never);
        inclusive.splice(Point::new(0, 4), Point::ZERO, Point::new(0, 3));
        assert_eq!(inclusive.range(), Range::from_coords(0, 2, 0, 7));
        inclusive.splice(Point::new(0, 2), Point::ZERO, Point::new(0, 1));
        assert_eq!(inclusive.range(), Range::from_coords(0, 2, 0, 8));

        let mut exclusive = Marker::new(
            MarkerId(2),
            Range::from_coords(0, 2, 0, 4),
            MarkerOptions::new().exclusive(true),
        );
        exclusive.splice(Point::new(0, 4), Point::ZERO, Point::new(0, 3));
        exclusive.splice(Point::new(0, 2), Point::ZERO, Point::new(0, 1));
        assert_eq!(exclusive.range(), Range::from_coords(0, 3, 0, 5));
    }

    #[test]
    fn test_tailless_marker_moves_forward_on_insertion() {
        let mut m = Marker::new(
            MarkerId(3),
            Range::empty(Point::new(0, 2)),
            MarkerOptions::new().tailless(),
        );
        assert!(m.is_exclusive());
        m.splice(Point::new(0, 2), Point::ZERO, Point::new(0, 2));
        assert_eq!(m.head(), Point::new(0, 4));
        assert_eq!(m.tail(), Point::new(0, 4));
    }

    #[test]
    fn test_deletion_collapses_inner_positions() {
        let mut m = marker(Range::from_coords(0, 2, 0, 8), InvalidationStrategy::Never);
        m.splice(Point::new(0, 5), Point::new(0, 5), Point::ZERO);
        assert_eq!(m.range(), Range::from_coords(0, 2, 0, 5));
    }
}
