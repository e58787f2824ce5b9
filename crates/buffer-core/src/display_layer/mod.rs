//! Display layers: buffer to screen projection with folds, soft wraps and hard tabs.
//!
//! A [`DisplayLayer`] owns a [`SpatialIndex`] plus a marker layer holding its folds. It never
//! owns text: every operation that needs the buffer receives it as `&dyn TextStorage`.
//!
//! The index is built lazily from the top of the buffer. Queries extend it as far as they need
//! to, and [`DisplayLayer::do_background_work`] extends it in bounded slices.

mod changes;
mod indexing;
mod translation;

pub use changes::ScreenChange;
pub use translation::TranslateOptions;

use crate::decoration::{DecorationLayer, NullDecorationLayer};
use crate::deadline::Unbounded;
use crate::display_params::DisplayLayerParams;
use crate::emitter::{Emitter, SubscriptionId};
use crate::error::Result;
use crate::marker::{InvalidationStrategy, MarkerId, MarkerOptions};
use crate::marker_layer::{FindMarkersParams, MarkerLayer, MarkerLayerId, MarkerLayerOptions, MarkerLayerState};
use crate::point::{ClipDirection, IntoRange, Point, Range};
use crate::screen_line::{ScreenLine, ScreenLineId, TagId};
use crate::screen_line_builder::ScreenLineBuilder;
use crate::spatial_index::SpatialIndex;
use crate::text::{TextChange, TextStorage};
use changes::ChangeAccumulator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayLayerId(pub u64);

impl fmt::Display for DisplayLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Folds are markers in the layer's fold marker layer.
pub type FoldId = MarkerId;

/// How much of the buffer has been incorporated into the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexFrontier {
    /// Nothing indexed yet.
    #[default]
    Empty,
    /// Buffer rows `0..indexed_rows` are indexed.
    Partial {
        /// Number of indexed buffer rows.
        indexed_rows: usize,
    },
    /// Every buffer row is indexed.
    Full {
        /// Number of indexed buffer rows (the line count).
        indexed_rows: usize,
    },
}

impl IndexFrontier {
    /// Number of indexed buffer rows.
    pub fn indexed_rows(self) -> usize {
        match self {
            IndexFrontier::Empty => 0,
            IndexFrontier::Partial { indexed_rows } | IndexFrontier::Full { indexed_rows } => {
                indexed_rows
            }
        }
    }

    /// Whether every buffer row is indexed.
    pub fn is_full(self) -> bool {
        matches!(self, IndexFrontier::Full { .. })
    }

    fn at(indexed_rows: usize, line_count: usize) -> Self {
        if indexed_rows == 0 {
            IndexFrontier::Empty
        } else if indexed_rows >= line_count {
            IndexFrontier::Full { indexed_rows }
        } else {
            IndexFrontier::Partial { indexed_rows }
        }
    }
}

/// Notifications emitted by a [`DisplayLayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayLayerEvent {
    /// Screen rows changed; ordered, disjoint, coalesced per batch.
    Changed(Vec<ScreenChange>),
    /// Everything must be re-rendered (parameters or decoration layer replaced).
    Reset,
}

/// Serializable form of a display layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayLayerState {
    /// Layer id.
    pub id: DisplayLayerId,
    /// Layout parameters (strategies fall back to their defaults).
    pub params: DisplayLayerParams,
    /// Folds.
    pub fold_layer: MarkerLayerState,
    /// Index hunks.
    pub spatial_index: SpatialIndex,
    /// Expanded length of every indexed screen row.
    pub screen_line_lengths: Vec<usize>,
    /// Hard tab count of every indexed screen row.
    pub tab_counts: Vec<usize>,
    /// Indexing progress.
    pub frontier: IndexFrontier,
    /// Longest indexed screen row and its length.
    pub rightmost_screen_position: Option<Point>,
}

/// Projection of a buffer onto the screen.
pub struct DisplayLayer {
    id: DisplayLayerId,
    pub(crate) params: DisplayLayerParams,
    pub(crate) spatial_index: SpatialIndex,
    pub(crate) fold_layer: MarkerLayer,
    pub(crate) screen_line_lengths: Vec<usize>,
    pub(crate) tab_counts: Vec<usize>,
    cached_screen_lines: Vec<Option<ScreenLine>>,
    next_screen_line_id: u64,
    pub(crate) rightmost_screen_position: Option<Point>,
    pub(crate) frontier: IndexFrontier,
    pub(crate) decoration_layer: Box<dyn DecorationLayer + Send>,
    pending_changes: ChangeAccumulator,
    batch_depth: usize,
    emitter: Emitter<DisplayLayerEvent>,
}

impl DisplayLayer {
    /// Create a layer with nothing indexed.
    pub fn new(id: DisplayLayerId, params: DisplayLayerParams) -> Self {
        let fold_layer = MarkerLayer::new(
            MarkerLayerId::for_folds(id.0),
            MarkerLayerOptions {
                destroy_invalidated_markers: true,
                role: Some("folds".to_string()),
                ..MarkerLayerOptions::default()
            },
        );
        Self {
            id,
            params,
            spatial_index: SpatialIndex::new(),
            fold_layer,
            screen_line_lengths: Vec::new(),
            tab_counts: Vec::new(),
            cached_screen_lines: Vec::new(),
            next_screen_line_id: 0,
            rightmost_screen_position: None,
            frontier: IndexFrontier::Empty,
            decoration_layer: Box::new(NullDecorationLayer),
            pending_changes: ChangeAccumulator::default(),
            batch_depth: 0,
            emitter: Emitter::new(),
        }
    }

    /// Layer id.
    pub fn id(&self) -> DisplayLayerId {
        self.id
    }

    /// Current layout parameters.
    pub fn params(&self) -> &DisplayLayerParams {
        &self.params
    }

    /// Indexing progress.
    pub fn frontier(&self) -> IndexFrontier {
        self.frontier
    }

    /// The index itself.
    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial_index
    }

    /// The marker layer holding folds.
    pub fn fold_marker_layer(&self) -> &MarkerLayer {
        &self.fold_layer
    }

    /// Subscribe to change and reset notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&DisplayLayerEvent) + Send + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Replace the layout parameters, discard the index and emit [`DisplayLayerEvent::Reset`].
    pub fn reset(&mut self, params: DisplayLayerParams) {
        tracing::debug!(layer = self.id.0, "resetting display layer");
        self.params = params;
        self.clear_index();
        self.emitter.emit(&DisplayLayerEvent::Reset);
    }

    /// Replace the decoration layer and emit [`DisplayLayerEvent::Reset`].
    pub fn set_decoration_layer(&mut self, layer: Box<dyn DecorationLayer + Send>) {
        self.decoration_layer = layer;
        self.cached_screen_lines.iter_mut().for_each(|line| *line = None);
        self.emitter.emit(&DisplayLayerEvent::Reset);
    }

    /// The current decoration layer.
    pub fn decoration_layer(&self) -> &(dyn DecorationLayer + Send) {
        self.decoration_layer.as_ref()
    }

    /// Mutable access to the decoration layer. Report any visible effect through
    /// [`DisplayLayer::decoration_layer_did_invalidate_range`].
    pub fn decoration_layer_mut(&mut self) -> &mut (dyn DecorationLayer + Send) {
        self.decoration_layer.as_mut()
    }

    /// Class names for a tag of a screen line.
    pub fn class_name_for_tag(&self, tag: TagId) -> Option<String> {
        match tag {
            TagId::BuiltIn(flags) => Some(flags.class_names()),
            TagId::Scope(scope) => self.decoration_layer.class_name_for_scope_id(scope),
        }
    }

    fn clear_index(&mut self) {
        self.spatial_index.clear();
        self.screen_line_lengths.clear();
        self.tab_counts.clear();
        self.cached_screen_lines.clear();
        self.rightmost_screen_position = None;
        self.frontier = IndexFrontier::Empty;
        self.pending_changes = ChangeAccumulator::default();
    }

    // ---- batching and events -------------------------------------------------------------

    /// Defer change notifications until the matching [`DisplayLayer::end_batch`].
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
        self.fold_layer.begin_batch();
    }

    /// Close a batch; the outermost close emits the coalesced changes.
    pub fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        self.fold_layer.end_batch();
        if self.batch_depth == 0 {
            self.flush_events();
        }
    }

    /// Emit buffered fold notifications, then the coalesced screen changes.
    pub fn flush_events(&mut self) {
        self.fold_layer.flush_events();
        if !self.pending_changes.is_empty() {
            let changes = self.pending_changes.take();
            self.emitter.emit(&DisplayLayerEvent::Changed(changes));
        }
    }

    fn record_change(&mut self, change: Option<ScreenChange>) {
        if let Some(change) = change {
            self.pending_changes.push(change);
        }
        if self.batch_depth == 0 {
            self.flush_events();
        }
    }

    // ---- buffer and decoration changes ---------------------------------------------------

    /// Incorporate an edit already applied to `storage`. Notifications are buffered until
    /// [`DisplayLayer::flush_events`].
    pub fn buffer_did_change(&mut self, storage: &dyn TextStorage, change: &TextChange) {
        self.fold_layer
            .splice(change.start(), change.old_extent(), change.new_extent());
        let invalidated = self.decoration_layer.buffer_did_change(storage, change);

        let mut start_row = change.old_range.start.row;
        let mut old_end_row = change.old_range.end.row;
        let mut new_end_row = change.new_range.end.row;

        // Guides on blank rows depend on the indentation of their neighbours.
        if self.params.show_indent_guides {
            while start_row > 0 && storage.line_length_for_row(start_row - 1) == 0 {
                start_row -= 1;
            }
            while new_end_row < storage.last_row() && storage.line_length_for_row(new_end_row + 1) == 0 {
                old_end_row += 1;
                new_end_row += 1;
            }
        }

        let screen_change = self.reindex_buffer_rows(storage, start_row, old_end_row + 1, new_end_row + 1);
        if let Some(change) = screen_change {
            self.pending_changes.push(change);
        }
        for range in invalidated {
            let change = self.invalidate_buffer_range(storage, range);
            if let Some(change) = change {
                self.pending_changes.push(change);
            }
        }
    }

    /// Re-render the screen rows covering `range` (e.g. after re-highlighting).
    pub fn decoration_layer_did_invalidate_range(&mut self, storage: &dyn TextStorage, range: Range) {
        let change = self.invalidate_buffer_range(storage, range);
        self.record_change(change);
    }

    fn invalidate_buffer_range(&mut self, storage: &dyn TextStorage, range: Range) -> Option<ScreenChange> {
        let range = storage.clip_range(range);
        if range.start.row >= self.frontier.indexed_rows() {
            return None;
        }
        let start_row = self
            .translate_buffer_with_index(Point::new(range.start.row, 0), ClipDirection::Backward)
            .row;
        let end_row = self
            .translate_buffer_with_index(
                Point::new(range.end.row, storage.line_length_for_row(range.end.row)),
                ClipDirection::Forward,
            )
            .row
            + 1;
        let end_row = end_row.min(self.cached_screen_lines.len());
        if start_row >= end_row {
            return None;
        }
        for line in &mut self.cached_screen_lines[start_row..end_row] {
            *line = None;
        }
        Some(ScreenChange::rows(start_row, end_row - start_row, end_row - start_row))
    }

    /// Re-index buffer rows `start_row..old_end_row` (pre-edit) now spanning
    /// `start_row..new_end_row`. Rows beyond the frontier are left for lazy indexing.
    fn reindex_buffer_rows(
        &mut self,
        storage: &dyn TextStorage,
        start_row: usize,
        old_end_row: usize,
        new_end_row: usize,
    ) -> Option<ScreenChange> {
        let indexed = self.frontier.indexed_rows();
        if start_row >= indexed {
            return None;
        }
        let line_count = storage.line_count();
        let new_end_row = new_end_row.min(line_count);
        let (old_end_row, frontier) = if old_end_row <= indexed {
            (old_end_row, (indexed + new_end_row).saturating_sub(old_end_row))
        } else {
            (indexed, new_end_row)
        };
        self.frontier = IndexFrontier::at(frontier, line_count);

        tracing::trace!(
            layer = self.id.0,
            start_row,
            old_end_row,
            new_end_row,
            "re-indexing buffer rows"
        );
        let change = self.update_spatial_index(
            storage,
            start_row,
            old_end_row,
            new_end_row,
            usize::MAX,
            &Unbounded,
        );
        Some(change)
    }

    // ---- geometry ------------------------------------------------------------------------

    /// Number of screen rows. Indexes the whole buffer.
    pub fn screen_line_count(&mut self, storage: &dyn TextStorage) -> usize {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), usize::MAX);
        self.screen_line_lengths.len()
    }

    /// Index of the last screen row.
    pub fn last_screen_row(&mut self, storage: &dyn TextStorage) -> usize {
        self.screen_line_count(storage).saturating_sub(1)
    }

    /// Expanded length of a screen row; zero past the end.
    pub fn line_length_for_screen_row(&mut self, storage: &dyn TextStorage, screen_row: usize) -> usize {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), screen_row.saturating_add(1));
        self.screen_line_lengths.get(screen_row).copied().unwrap_or(0)
    }

    /// End of the longest screen row (the first one on ties). Indexes the whole buffer.
    pub fn rightmost_screen_position(&mut self, storage: &dyn TextStorage) -> Point {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), usize::MAX);
        self.rightmost_screen_position.unwrap_or(Point::ZERO)
    }

    /// Screen row count extrapolated from the indexed prefix. Does not index.
    pub fn approximate_screen_line_count(&self, storage: &dyn TextStorage) -> usize {
        let indexed = self.frontier.indexed_rows();
        let line_count = storage.line_count();
        if indexed == 0 {
            return line_count;
        }
        if self.frontier.is_full() {
            return self.screen_line_lengths.len();
        }
        self.screen_line_lengths.len() * line_count / indexed
    }

    /// Rightmost position within the indexed prefix. Does not index.
    pub fn approximate_rightmost_screen_position(&self) -> Point {
        self.rightmost_screen_position.unwrap_or(Point::ZERO)
    }

    /// First screen row displaying `buffer_row`.
    pub fn screen_row_for_buffer_row(&mut self, storage: &dyn TextStorage, buffer_row: usize) -> usize {
        self.translate_buffer_position(storage, Point::new(buffer_row, 0), ClipDirection::Backward)
            .row
    }

    /// Buffer row displayed at the start of `screen_row`.
    pub fn buffer_row_for_screen_row(&mut self, storage: &dyn TextStorage, screen_row: usize) -> usize {
        self.translate_screen_position(storage, Point::new(screen_row, 0), ClipDirection::Closest)
            .row
    }

    /// Buffer row displayed at the start of every screen row in `start_row..end_row`.
    pub fn buffer_rows_for_screen_rows(
        &mut self,
        storage: &dyn TextStorage,
        start_row: usize,
        end_row: usize,
    ) -> Vec<usize> {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), end_row);
        let end_row = end_row.min(self.screen_line_lengths.len());
        if start_row >= end_row {
            return Vec::new();
        }

        let mut rows = Vec::with_capacity(end_row - start_row);
        let mut screen_row = start_row;
        let mut buffer_row = self
            .translate_screen_with_index(
                Point::new(start_row, 0),
                ClipDirection::Backward,
                false,
            )
            .row;
        let hunks = self
            .spatial_index
            .hunks_in_new_range(Point::new(start_row, 0), Point::new(end_row, 0));
        for hunk in hunks {
            while screen_row <= hunk.new_start.row {
                rows.push(buffer_row);
                screen_row += 1;
                buffer_row += 1;
            }
            buffer_row = if hunk.is_soft_wrap() {
                hunk.old_end.row
            } else {
                hunk.old_end.row + 1
            };
        }
        while screen_row < end_row {
            rows.push(buffer_row);
            screen_row += 1;
            buffer_row += 1;
        }
        rows
    }

    /// Whether `screen_row` continues a soft-wrapped buffer row.
    pub fn is_soft_wrap_row(&mut self, storage: &dyn TextStorage, screen_row: usize) -> bool {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), screen_row.saturating_add(1));
        let row_start = Point::new(screen_row, 0);
        self.spatial_index
            .hunks_in_new_range(row_start, row_start)
            .first()
            .is_some_and(|hunk| hunk.is_soft_wrap() && hunk.new_end.row == screen_row)
    }

    // ---- folds ---------------------------------------------------------------------------

    /// Collapse `range` into a single fold character.
    ///
    /// A range already inside an existing fold creates the marker without re-indexing.
    pub fn fold_buffer_range(&mut self, storage: &dyn TextStorage, range: impl IntoRange) -> Result<FoldId> {
        let range = storage.clip_range(range.into_range()?);
        let enclosed = !self
            .fold_layer
            .find_markers(&FindMarkersParams::new().containing_range(range).valid(true))
            .is_empty();
        let id = self.fold_layer.mark_range(
            range,
            MarkerOptions::new()
                .invalidate(InvalidationStrategy::Overlap)
                .exclusive(true),
        )?;
        tracing::debug!(layer = self.id.0, fold = id.0, range = %range, enclosed, "created fold");
        if !enclosed {
            let change = self.reindex_buffer_rows(storage, range.start.row, range.end.row + 1, range.end.row + 1);
            self.record_change(change);
        }
        Ok(id)
    }

    /// Fold several ranges, emitting a single change.
    pub fn fold_buffer_ranges<R: IntoRange>(
        &mut self,
        storage: &dyn TextStorage,
        ranges: impl IntoIterator<Item = R>,
    ) -> Result<Vec<FoldId>> {
        self.begin_batch();
        let folded: Result<Vec<FoldId>> = ranges
            .into_iter()
            .map(|range| self.fold_buffer_range(storage, range))
            .collect();
        self.end_batch();
        folded
    }

    /// Folds intersecting `range`, ordered by start.
    pub fn folds_intersecting_buffer_range(&self, range: Range) -> Vec<(FoldId, Range)> {
        self.fold_layer
            .find_markers(&FindMarkersParams::new().intersecting_range(range))
            .into_iter()
            .map(|marker| (marker.id(), marker.range()))
            .collect()
    }

    /// Ranges of every fold, ordered by start.
    pub fn fold_ranges(&self) -> Vec<Range> {
        self.fold_layer
            .find_markers(&FindMarkersParams::new())
            .into_iter()
            .map(|marker| marker.range())
            .collect()
    }

    /// Number of folds.
    pub fn fold_count(&self) -> usize {
        self.fold_layer.marker_count()
    }

    /// Range of a fold.
    pub fn fold_range(&self, id: FoldId) -> Option<Range> {
        self.fold_layer.get_marker(id).map(|marker| marker.range())
    }

    /// Remove one fold. Returns its range if it existed.
    pub fn destroy_fold(&mut self, storage: &dyn TextStorage, id: FoldId) -> Option<Range> {
        let range = self.fold_range(id)?;
        self.destroy_folds(storage, vec![(id, range)]);
        Some(range)
    }

    /// Remove every fold.
    pub fn destroy_all_folds(&mut self, storage: &dyn TextStorage) -> Vec<Range> {
        let folds = self
            .fold_layer
            .find_markers(&FindMarkersParams::new())
            .into_iter()
            .map(|marker| (marker.id(), marker.range()))
            .collect();
        self.destroy_folds(storage, folds)
    }

    /// Remove folds intersecting `range`.
    pub fn destroy_folds_intersecting_buffer_range(
        &mut self,
        storage: &dyn TextStorage,
        range: impl IntoRange,
    ) -> Result<Vec<Range>> {
        let range = storage.clip_range(range.into_range()?);
        let folds = self.folds_intersecting_buffer_range(range);
        Ok(self.destroy_folds(storage, folds))
    }

    /// Remove folds containing any of `positions`. With `exclude_endpoints`, a position must
    /// lie strictly inside a fold.
    pub fn destroy_folds_containing_buffer_positions(
        &mut self,
        storage: &dyn TextStorage,
        positions: &[Point],
        exclude_endpoints: bool,
    ) -> Vec<Range> {
        let folds = self
            .fold_layer
            .find_markers(&FindMarkersParams::new())
            .into_iter()
            .filter(|marker| {
                let range = marker.range();
                positions.iter().any(|position| {
                    if exclude_endpoints {
                        range.contains_point_exclusive(*position)
                    } else {
                        range.contains_point(*position)
                    }
                })
            })
            .map(|marker| (marker.id(), marker.range()))
            .collect();
        self.destroy_folds(storage, folds)
    }

    fn destroy_folds(&mut self, storage: &dyn TextStorage, folds: Vec<(FoldId, Range)>) -> Vec<Range> {
        let Some(union) = folds
            .iter()
            .map(|(_, range)| *range)
            .reduce(|union, range| union.union(&range))
        else {
            return Vec::new();
        };
        tracing::debug!(layer = self.id.0, count = folds.len(), "destroying folds");
        self.fold_layer.begin_batch();
        for (id, _) in &folds {
            self.fold_layer.destroy_marker(*id);
        }
        self.fold_layer.end_batch();
        let change = self.reindex_buffer_rows(storage, union.start.row, union.end.row + 1, union.end.row + 1);
        self.record_change(change);
        folds.into_iter().map(|(_, range)| range).collect()
    }

    // ---- screen lines --------------------------------------------------------------------

    /// Render screen rows `start_row..end_row`, reusing cached lines.
    pub fn screen_lines(&mut self, storage: &dyn TextStorage, start_row: usize, end_row: usize) -> Vec<ScreenLine> {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), end_row);
        let end_row = end_row.min(self.screen_line_lengths.len());
        let mut lines = Vec::with_capacity(end_row.saturating_sub(start_row));
        let mut row = start_row;
        while row < end_row {
            if let Some(line) = &self.cached_screen_lines[row] {
                lines.push(line.clone());
                row += 1;
                continue;
            }
            let run_end = (row..end_row)
                .find(|candidate| self.cached_screen_lines[*candidate].is_some())
                .unwrap_or(end_row);
            let built = ScreenLineBuilder::new(self, storage).build(row, run_end);
            if built.is_empty() {
                break;
            }
            for (offset, (line_text, tags)) in built.into_iter().enumerate() {
                let line = ScreenLine {
                    id: ScreenLineId(self.next_screen_line_id),
                    line_text,
                    tags,
                };
                self.next_screen_line_id += 1;
                self.cached_screen_lines[row + offset] = Some(line.clone());
                lines.push(line);
            }
            row = start_row + lines.len();
        }
        lines
    }

    /// Render one screen row.
    pub fn screen_line(&mut self, storage: &dyn TextStorage, screen_row: usize) -> Option<ScreenLine> {
        self.screen_lines(storage, screen_row, screen_row + 1).pop()
    }

    // ---- persistence ---------------------------------------------------------------------

    /// Serializable copy of the layer (folds, parameters and index).
    pub fn serialize(&self) -> DisplayLayerState {
        DisplayLayerState {
            id: self.id,
            params: self.params.clone(),
            fold_layer: self.fold_layer.serialize(),
            spatial_index: self.spatial_index.clone(),
            screen_line_lengths: self.screen_line_lengths.clone(),
            tab_counts: self.tab_counts.clone(),
            frontier: self.frontier,
            rightmost_screen_position: self.rightmost_screen_position,
        }
    }

    /// Rebuild a layer from [`DisplayLayer::serialize`] output, without a decoration layer.
    pub fn deserialize(state: DisplayLayerState) -> Self {
        let mut layer = DisplayLayer::new(state.id, state.params);
        layer.fold_layer = MarkerLayer::deserialize(state.fold_layer);
        layer.cached_screen_lines = vec![None; state.screen_line_lengths.len()];
        layer.spatial_index = state.spatial_index;
        layer.screen_line_lengths = state.screen_line_lengths;
        layer.tab_counts = state.tab_counts;
        layer.frontier = state.frontier;
        layer.rightmost_screen_position = state.rightmost_screen_position;
        layer
    }

    /// Release everything; the layer stays usable but empty.
    pub fn destroy(&mut self) {
        tracing::debug!(layer = self.id.0, "destroying display layer");
        self.fold_layer.destroy();
        self.clear_index();
        self.emitter.clear();
    }
}

impl fmt::Debug for DisplayLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayLayer")
            .field("id", &self.id)
            .field("params", &self.params)
            .field("frontier", &self.frontier)
            .field("hunks", &self.spatial_index.len())
            .field("screen_rows", &self.screen_line_lengths.len())
            .field("folds", &self.fold_layer.marker_count())
            .finish()
    }
}
