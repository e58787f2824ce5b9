//! Building the spatial index: folds, soft wraps and per-row tab bookkeeping.

use super::{DisplayLayer, IndexFrontier, ScreenChange};
use crate::deadline::{Deadline, Unbounded, MIN_TIME_REMAINING};
use crate::display_params::is_inline_whitespace;
use crate::grapheme::GraphemeBoundaries;
use crate::marker_layer::FindMarkersParams;
use crate::point::{ClipDirection, Point, Range};
use crate::text::TextStorage;
use std::collections::BTreeMap;

/// Fold end positions keyed by start row, then start column.
type FoldMap = BTreeMap<usize, BTreeMap<usize, Point>>;

impl DisplayLayer {
    /// The first buffer row of the screen region containing `row`: walks back over folds
    /// ending on or after the start of `row`.
    pub(crate) fn find_boundary_preceding_buffer_row(&self, mut row: usize) -> usize {
        loop {
            if row == 0 {
                return 0;
            }
            let position = Point::new(row, 0);
            let hunks = self.spatial_index.hunks();
            let index = hunks.partition_point(|hunk| hunk.old_start < position);
            match index.checked_sub(1).map(|index| hunks[index]) {
                Some(hunk) if !hunk.is_soft_wrap() && hunk.old_end >= position => {
                    row = hunk.old_start.row;
                }
                _ => return row,
            }
        }
    }

    /// The first buffer row at or after `row` that starts a new screen region.
    pub(crate) fn find_boundary_following_buffer_row(&self, mut row: usize) -> usize {
        loop {
            let position = Point::new(row, 0);
            let hunks = self.spatial_index.hunks();
            let index = hunks.partition_point(|hunk| hunk.old_start < position);
            match index.checked_sub(1).map(|index| hunks[index]) {
                Some(hunk) if !hunk.is_soft_wrap() && hunk.old_end >= position => {
                    row = hunk.old_end.row + 1;
                }
                _ => return row,
            }
        }
    }

    /// Index buffer rows up to `end_buffer_row`, stopping early once `end_screen_row` screen
    /// rows exist. Emits nothing.
    pub(crate) fn populate_spatial_index_if_needed(
        &mut self,
        storage: &dyn TextStorage,
        end_buffer_row: usize,
        end_screen_row: usize,
    ) {
        let indexed = self.frontier.indexed_rows();
        let end_buffer_row = end_buffer_row.min(storage.line_count());
        if indexed < end_buffer_row && self.screen_line_lengths.len() < end_screen_row {
            self.update_spatial_index(storage, indexed, indexed, end_buffer_row, end_screen_row, &Unbounded);
        }
    }

    /// Extend the index until `deadline` runs short. At least one row is indexed per call.
    /// Returns whether unindexed rows remain.
    pub fn do_background_work(&mut self, storage: &dyn TextStorage, deadline: &dyn Deadline) -> bool {
        let indexed = self.frontier.indexed_rows();
        let line_count = storage.line_count();
        if indexed < line_count {
            self.update_spatial_index(storage, indexed, indexed, line_count, usize::MAX, deadline);
        }
        self.frontier.indexed_rows() < line_count
    }

    /// Merged, non-empty folds starting in `start_row..end_row`.
    fn compute_folds(&self, start_row: usize, end_row: usize) -> FoldMap {
        let mut folds = FoldMap::new();
        if end_row <= start_row {
            return folds;
        }
        let mut ranges: Vec<Range> = self
            .fold_layer
            .find_markers(
                &FindMarkersParams::new()
                    .intersecting_row_range(start_row, end_row - 1)
                    .valid(true),
            )
            .into_iter()
            .map(|marker| marker.range())
            .filter(|range| !range.is_empty())
            .collect();
        ranges.sort_by_key(|range| range.start);

        let mut ranges = ranges.into_iter().peekable();
        while let Some(range) = ranges.next() {
            let mut end = range.end;
            while let Some(next) = ranges.peek() {
                if next.start >= end {
                    break;
                }
                end = end.max(next.end);
                ranges.next();
            }
            folds
                .entry(range.start.row)
                .or_default()
                .insert(range.start.column, end);
        }
        folds
    }

    /// Re-index buffer rows `start_buffer_row..old_end_buffer_row`, which now span
    /// `start_buffer_row..new_end_buffer_row`. Both ends are widened to whole fold regions.
    pub(crate) fn update_spatial_index(
        &mut self,
        storage: &dyn TextStorage,
        start_buffer_row: usize,
        old_end_buffer_row: usize,
        new_end_buffer_row: usize,
        end_screen_row: usize,
        deadline: &dyn Deadline,
    ) -> ScreenChange {
        let requested_old_end = old_end_buffer_row;
        let start_buffer_row = self.find_boundary_preceding_buffer_row(start_buffer_row);
        let old_end_buffer_row = self.find_boundary_following_buffer_row(old_end_buffer_row);
        let new_end_buffer_row = new_end_buffer_row + (old_end_buffer_row - requested_old_end);

        let indexed_screen_rows = self.screen_line_lengths.len();
        let start_screen_row = self
            .translate_buffer_with_index(Point::new(start_buffer_row, 0), ClipDirection::Backward)
            .row
            .min(indexed_screen_rows);
        let old_end_screen_row = self
            .translate_buffer_with_index(Point::new(old_end_buffer_row, 0), ClipDirection::Backward)
            .row
            .clamp(start_screen_row, indexed_screen_rows);

        self.spatial_index.splice_old(
            Point::new(start_buffer_row, 0),
            Point::new(old_end_buffer_row - start_buffer_row, 0),
            Point::new(new_end_buffer_row - start_buffer_row, 0),
        );

        let folds = self.compute_folds(start_buffer_row, new_end_buffer_row);
        let line_count = storage.line_count();
        let tab_length = self.params.tab_length();
        let wrap_width = self.params.soft_wrap_width();
        let wrap_column = self.params.soft_wrap_column_limit();
        let hanging_indent = self.params.soft_wrap_hanging_indent;
        let space_ratio = self.params.ratio(' ');
        let fold_character = self.params.fold_character;

        let mut inserted_lengths = Vec::new();
        let mut inserted_tab_counts = Vec::new();
        let mut buffer_row = start_buffer_row;
        let mut screen_row = start_screen_row;

        while buffer_row < new_end_buffer_row && buffer_row < line_count {
            if screen_row >= end_screen_row {
                break;
            }
            if buffer_row > start_buffer_row && deadline.time_remaining() < MIN_TIME_REMAINING {
                break;
            }

            let mut line = storage.line_chars(buffer_row);
            let mut graphemes = GraphemeBoundaries::new(&line);
            let mut column = 0;
            let mut unexpanded = 0;
            let mut expanded = 0;
            let mut width = 0.0;
            let mut line_start = 0;
            let mut wrap_boundary: Option<(usize, usize)> = None;
            let mut first_non_whitespace: Option<usize> = None;
            let mut tab_columns: Vec<usize> = Vec::new();
            // Width of each unexpanded screen column on the current screen line. Tabs are
            // measured from their expanded column instead.
            let mut column_widths: Vec<f64> = Vec::new();

            loop {
                let fold_end = folds
                    .get(&buffer_row)
                    .and_then(|row| row.get(&column))
                    .copied();
                if fold_end.is_none() && column >= line.len() {
                    break;
                }
                let ch = match fold_end {
                    Some(_) => fold_character,
                    None => line[column],
                };
                let previous = column.checked_sub(1).and_then(|index| line.get(index)).copied();
                let is_tab = fold_end.is_none() && ch == '\t';

                if first_non_whitespace.is_none() && !is_inline_whitespace(ch) {
                    first_non_whitespace = Some(expanded);
                } else if let Some(previous) = previous {
                    if self.params.is_wrap_boundary.is_boundary(previous, ch) {
                        wrap_boundary = Some((unexpanded, expanded));
                    }
                }

                let character_width = |expanded: usize| {
                    if is_tab {
                        (tab_length - expanded % tab_length) as f64 * space_ratio
                    } else {
                        self.params.ratio(ch)
                    }
                };
                let mut char_width = character_width(expanded);

                if width > 0.0
                    && char_width > 0.0
                    && width + char_width > wrap_width
                    && graphemes.is_boundary(column)
                {
                    let (wrap_unexpanded, wrap_expanded) = match wrap_boundary {
                        Some(boundary) if boundary.0 > line_start => boundary,
                        _ => (unexpanded, expanded),
                    };
                    if wrap_unexpanded > line_start {
                        let mut indent = match first_non_whitespace {
                            Some(indent) if indent < wrap_column => indent,
                            _ => 0,
                        };
                        if indent + hanging_indent < wrap_column {
                            indent += hanging_indent;
                        }

                        self.spatial_index.splice(
                            Point::new(screen_row, wrap_unexpanded),
                            Point::ZERO,
                            Point::new(1, indent),
                        );
                        inserted_lengths.push(wrap_expanded);
                        inserted_tab_counts.push(
                            tab_columns
                                .iter()
                                .filter(|&&tab| tab < wrap_unexpanded)
                                .count(),
                        );
                        screen_row += 1;

                        tab_columns = tab_columns
                            .into_iter()
                            .filter(|&tab| tab >= wrap_unexpanded)
                            .map(|tab| tab - wrap_unexpanded + indent)
                            .collect();
                        let moved_widths = column_widths.split_off(wrap_unexpanded);
                        column_widths = vec![space_ratio; indent];
                        column_widths.extend(moved_widths);
                        unexpanded = unexpanded - wrap_unexpanded + indent;
                        expanded = indent;
                        width = indent as f64 * space_ratio;
                        for moved in indent..unexpanded {
                            if tab_columns.contains(&moved) {
                                let tab_width = tab_length - expanded % tab_length;
                                expanded += tab_width;
                                width += tab_width as f64 * space_ratio;
                            } else {
                                expanded += 1;
                                width += column_widths[moved];
                            }
                        }
                        line_start = indent;
                        wrap_boundary = None;
                        char_width = character_width(expanded);
                    }
                }

                if let Some(fold_end) = fold_end {
                    self.spatial_index.splice(
                        Point::new(screen_row, unexpanded),
                        fold_end.traversal(Point::new(buffer_row, column)),
                        Point::new(0, 1),
                    );
                    column_widths.push(char_width);
                    unexpanded += 1;
                    expanded += 1;
                    width += char_width;
                    if fold_end.row != buffer_row {
                        buffer_row = fold_end.row;
                        line = storage.line_chars(buffer_row);
                        graphemes = GraphemeBoundaries::new(&line);
                    }
                    column = fold_end.column;
                    continue;
                }

                if is_tab {
                    tab_columns.push(unexpanded);
                    expanded += tab_length - expanded % tab_length;
                } else {
                    expanded += 1;
                }
                column_widths.push(char_width);
                unexpanded += 1;
                column += 1;
                width += char_width;
            }

            inserted_lengths.push(expanded);
            inserted_tab_counts.push(tab_columns.len());
            buffer_row += 1;
            screen_row += 1;
        }

        let inserted = inserted_lengths.len();
        self.screen_line_lengths
            .splice(start_screen_row..old_end_screen_row, inserted_lengths.iter().copied());
        self.tab_counts
            .splice(start_screen_row..old_end_screen_row, inserted_tab_counts);
        self.cached_screen_lines
            .splice(start_screen_row..old_end_screen_row, (0..inserted).map(|_| None));
        self.update_rightmost_screen_position(start_screen_row, old_end_screen_row, &inserted_lengths);

        let indexed_rows = self.frontier.indexed_rows().max(buffer_row).min(line_count);
        self.frontier = IndexFrontier::at(indexed_rows, line_count);
        if self.frontier.is_full() {
            self.spatial_index.rebalance();
        }

        tracing::trace!(
            layer = self.id.0,
            start_buffer_row,
            end_buffer_row = buffer_row,
            start_screen_row,
            old_screen_rows = old_end_screen_row - start_screen_row,
            new_screen_rows = inserted,
            hunks = self.spatial_index.len(),
            "updated spatial index"
        );

        ScreenChange::rows(start_screen_row, old_end_screen_row - start_screen_row, inserted)
    }

    fn update_rightmost_screen_position(&mut self, start_row: usize, old_end_row: usize, inserted: &[usize]) {
        let delta = inserted.len() as isize - (old_end_row - start_row) as isize;
        match self.rightmost_screen_position {
            Some(rightmost) if rightmost.row >= old_end_row => {
                self.rightmost_screen_position = Some(Point::new(
                    rightmost.row.saturating_add_signed(delta),
                    rightmost.column,
                ));
            }
            Some(rightmost) if rightmost.row >= start_row => {
                let mut longest: Option<Point> = None;
                for (row, &length) in self.screen_line_lengths.iter().enumerate() {
                    if longest.is_none_or(|longest| length > longest.column) {
                        longest = Some(Point::new(row, length));
                    }
                }
                self.rightmost_screen_position = longest;
                return;
            }
            _ => {}
        }

        for (offset, &length) in inserted.iter().enumerate() {
            let row = start_row + offset;
            let replaces = match self.rightmost_screen_position {
                None => true,
                Some(rightmost) => {
                    length > rightmost.column || (length == rightmost.column && row < rightmost.row)
                }
            };
            if replaces {
                self.rightmost_screen_position = Some(Point::new(row, length));
            }
        }
    }
}
