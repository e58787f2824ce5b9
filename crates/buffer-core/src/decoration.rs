//! Decoration layers: externally supplied scopes merged into screen lines.
//!
//! A [`DecorationLayer`] hands out a [`DecorationIterator`] walking scope boundaries in buffer
//! order. The screen line builder seeks it to the first rendered buffer position and then
//! advances in lockstep with the text.

use crate::marker::shift_position;
use crate::point::{Point, Range};
use crate::screen_line::ScopeId;
use crate::text::{TextChange, TextStorage};
use std::collections::BTreeMap;

/// Walks scope boundaries of a decoration layer in buffer order.
pub trait DecorationIterator {
    /// Position at the first boundary at or after `position` and return the scopes open
    /// across it (outermost first).
    fn seek(&mut self, position: Point) -> Vec<ScopeId>;

    /// Advance to the next boundary. Returns `false` once exhausted.
    fn move_to_successor(&mut self) -> bool;

    /// Current boundary, or [`Point::MAX`] when exhausted.
    fn position(&self) -> Point;

    /// Scopes opening at the current boundary, outermost first.
    fn open_scope_ids(&self) -> Vec<ScopeId>;

    /// Scopes closing at the current boundary, innermost first.
    fn close_scope_ids(&self) -> Vec<ScopeId>;
}

/// Source of decoration scopes for a display layer.
pub trait DecorationLayer {
    /// Iterator over the current scope boundaries.
    fn build_iterator<'a>(&'a self, storage: &'a dyn TextStorage) -> Box<dyn DecorationIterator + 'a>;

    /// Class name for a scope id.
    fn class_name_for_scope_id(&self, scope: ScopeId) -> Option<String>;

    /// React to a buffer edit. Returns buffer ranges (post-edit) whose decorations changed
    /// beyond the edited rows.
    fn buffer_did_change(&mut self, _storage: &dyn TextStorage, _change: &TextChange) -> Vec<Range> {
        Vec::new()
    }
}

/// A decoration layer without scopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDecorationLayer;

struct EmptyIterator;

impl DecorationIterator for EmptyIterator {
    fn seek(&mut self, _position: Point) -> Vec<ScopeId> {
        Vec::new()
    }

    fn move_to_successor(&mut self) -> bool {
        false
    }

    fn position(&self) -> Point {
        Point::MAX
    }

    fn open_scope_ids(&self) -> Vec<ScopeId> {
        Vec::new()
    }

    fn close_scope_ids(&self) -> Vec<ScopeId> {
        Vec::new()
    }
}

impl DecorationLayer for NullDecorationLayer {
    fn build_iterator<'a>(&'a self, _storage: &'a dyn TextStorage) -> Box<dyn DecorationIterator + 'a> {
        Box::new(EmptyIterator)
    }

    fn class_name_for_scope_id(&self, _scope: ScopeId) -> Option<String> {
        None
    }
}

/// A scope applied to a buffer range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecorationSpan {
    /// Decorated buffer range. Empty spans are ignored.
    pub range: Range,
    /// Scope applied over the range.
    pub scope: ScopeId,
}

/// A decoration layer backed by an explicit list of properly nested spans.
///
/// Edits shift spans after the change and drop spans overlapping it.
#[derive(Debug, Clone, Default)]
pub struct SpanDecorationLayer {
    class_names: Vec<String>,
    spans: Vec<DecorationSpan>,
}

impl SpanDecorationLayer {
    /// An empty layer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class name, returning its scope id. Registering a name twice returns the
    /// same id.
    pub fn scope_for_class_name(&mut self, class_name: &str) -> ScopeId {
        if let Some(index) = self.class_names.iter().position(|name| name == class_name) {
            return ScopeId(index as u32);
        }
        self.class_names.push(class_name.to_string());
        ScopeId((self.class_names.len() - 1) as u32)
    }

    /// Decorate `range` with `class_name`.
    pub fn add_span(&mut self, range: Range, class_name: &str) -> ScopeId {
        let scope = self.scope_for_class_name(class_name);
        if !range.is_empty() {
            self.spans.push(DecorationSpan { range, scope });
        }
        scope
    }

    /// Replace every span.
    pub fn set_spans(&mut self, spans: Vec<DecorationSpan>) {
        self.spans = spans.into_iter().filter(|span| !span.range.is_empty()).collect();
    }

    /// Drop spans intersecting `rows` (inclusive start, exclusive end).
    pub fn clear_rows(&mut self, start_row: usize, end_row: usize) {
        self.spans
            .retain(|span| span.range.end.row < start_row || span.range.start.row >= end_row);
    }

    /// Current spans.
    pub fn spans(&self) -> &[DecorationSpan] {
        &self.spans
    }
}

impl DecorationLayer for SpanDecorationLayer {
    fn build_iterator<'a>(&'a self, _storage: &'a dyn TextStorage) -> Box<dyn DecorationIterator + 'a> {
        Box::new(SpanIterator::new(&self.spans))
    }

    fn class_name_for_scope_id(&self, scope: ScopeId) -> Option<String> {
        self.class_names.get(scope.0 as usize).cloned()
    }

    fn buffer_did_change(&mut self, _storage: &dyn TextStorage, change: &TextChange) -> Vec<Range> {
        let start = change.old_range.start;
        let old_end = change.old_range.end;
        let new_end = change.new_range.end;
        self.spans.retain_mut(|span| {
            if span.range.end <= start {
                return true;
            }
            if span.range.start >= old_end {
                span.range = Range {
                    start: shift_position(span.range.start, start, old_end, new_end, true),
                    end: shift_position(span.range.end, start, old_end, new_end, true),
                };
                return true;
            }
            false
        });
        Vec::new()
    }
}

struct Boundary {
    position: Point,
    opens: Vec<ScopeId>,
    closes: Vec<ScopeId>,
}

struct SpanIterator<'a> {
    spans: &'a [DecorationSpan],
    boundaries: Vec<Boundary>,
    index: usize,
}

impl<'a> SpanIterator<'a> {
    fn new(spans: &'a [DecorationSpan]) -> Self {
        let mut ordered: Vec<&DecorationSpan> = spans.iter().collect();
        // Outer spans first among those sharing a start.
        ordered.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| b.range.end.cmp(&a.range.end))
        });

        let mut by_position: BTreeMap<Point, (Vec<ScopeId>, Vec<(Point, ScopeId)>)> = BTreeMap::new();
        for span in &ordered {
            by_position.entry(span.range.start).or_default().0.push(span.scope);
            by_position
                .entry(span.range.end)
                .or_default()
                .1
                .push((span.range.start, span.scope));
        }

        let boundaries = by_position
            .into_iter()
            .map(|(position, (opens, mut closes))| {
                // Inner spans (later starts) close first.
                closes.sort_by(|a, b| b.0.cmp(&a.0));
                Boundary {
                    position,
                    opens,
                    closes: closes.into_iter().map(|(_, scope)| scope).collect(),
                }
            })
            .collect();

        Self {
            spans,
            boundaries,
            index: 0,
        }
    }
}

impl DecorationIterator for SpanIterator<'_> {
    fn seek(&mut self, position: Point) -> Vec<ScopeId> {
        self.index = self
            .boundaries
            .partition_point(|boundary| boundary.position < position);
        let mut containing: Vec<&DecorationSpan> = self
            .spans
            .iter()
            .filter(|span| span.range.start < position && position < span.range.end)
            .collect();
        containing.sort_by(|a, b| {
            a.range
                .start
                .cmp(&b.range.start)
                .then_with(|| b.range.end.cmp(&a.range.end))
        });
        containing.into_iter().map(|span| span.scope).collect()
    }

    fn move_to_successor(&mut self) -> bool {
        if self.index < self.boundaries.len() {
            self.index += 1;
        }
        self.index < self.boundaries.len()
    }

    fn position(&self) -> Point {
        self.boundaries
            .get(self.index)
            .map(|boundary| boundary.position)
            .unwrap_or(Point::MAX)
    }

    fn open_scope_ids(&self) -> Vec<ScopeId> {
        self.boundaries
            .get(self.index)
            .map(|boundary| boundary.opens.clone())
            .unwrap_or_default()
    }

    fn close_scope_ids(&self) -> Vec<ScopeId> {
        self.boundaries
            .get(self.index)
            .map(|boundary| boundary.closes.clone())
            .unwrap_or_default()
    }
}
