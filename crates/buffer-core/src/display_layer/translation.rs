//! Buffer <-> screen position translation.
//!
//! The spatial index maps buffer positions to screen positions with hard tabs unexpanded.
//! Tab expansion and atomic-unit snapping are applied on top of it, re-walking the affected
//! line on demand.

use super::DisplayLayer;
use crate::grapheme::GraphemeBoundaries;
use crate::point::{ClipDirection, Point, Range};
use crate::text::TextStorage;

/// Options for [`DisplayLayer::translate_screen_position`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Tie-break inside atomic units.
    pub clip_direction: ClipDirection,
    /// Map positions inside soft-wrap indentation to the continuation's first character
    /// instead of the end of the previous screen row.
    pub skip_soft_wrap_indentation: bool,
}

impl TranslateOptions {
    /// Options with the given clip direction.
    pub fn new(clip_direction: ClipDirection) -> Self {
        Self {
            clip_direction,
            skip_soft_wrap_indentation: false,
        }
    }

    /// Builder: skip soft-wrap indentation.
    pub fn skip_soft_wrap_indentation(mut self, skip: bool) -> Self {
        self.skip_soft_wrap_indentation = skip;
        self
    }
}

impl From<ClipDirection> for TranslateOptions {
    fn from(clip_direction: ClipDirection) -> Self {
        Self::new(clip_direction)
    }
}

impl DisplayLayer {
    /// Screen position (tabs unexpanded) of a buffer position, using only indexed hunks.
    pub(crate) fn translate_buffer_with_index(&self, position: Point, clip_direction: ClipDirection) -> Point {
        let Some(hunk) = self.spatial_index.hunk_for_old_position(position) else {
            return position;
        };
        if position >= hunk.old_end {
            return hunk.new_end.traverse(position.traversal(hunk.old_end));
        }
        if position == hunk.old_start {
            return hunk.new_start;
        }
        match clip_direction {
            ClipDirection::Backward => hunk.new_start,
            ClipDirection::Forward => hunk.new_end,
            ClipDirection::Closest => {
                if position.traversal(hunk.old_start) <= hunk.old_end.traversal(position) {
                    hunk.new_start
                } else {
                    hunk.new_end
                }
            }
        }
    }

    /// Buffer position of a screen position (tabs unexpanded), using only indexed hunks.
    pub(crate) fn translate_screen_with_index(
        &self,
        position: Point,
        clip_direction: ClipDirection,
        skip_soft_wrap_indentation: bool,
    ) -> Point {
        let Some(hunk) = self.spatial_index.hunk_for_new_position(position) else {
            return position;
        };
        if position >= hunk.new_end {
            return hunk.old_end.traverse(position.traversal(hunk.new_end));
        }
        if !hunk.is_soft_wrap() {
            return hunk.old_start;
        }
        let walk_back = (clip_direction == ClipDirection::Backward && !skip_soft_wrap_indentation)
            || (clip_direction == ClipDirection::Closest && position == hunk.new_start);
        if walk_back && hunk.new_start.column > 0 {
            let previous = Point::new(hunk.new_start.row, hunk.new_start.column - 1);
            return self.translate_screen_with_index(previous, clip_direction, skip_soft_wrap_indentation);
        }
        hunk.old_start
    }

    /// Expanded screen column of `target` (unexpanded) on a row containing hard tabs.
    fn expand_hard_tabs(&self, storage: &dyn TextStorage, target: Point, mut tab_count: usize) -> Point {
        let row_start = Point::new(target.row, 0);
        let hunks = self.spatial_index.hunks_in_new_range(row_start, target);
        let tab_length = self.params.tab_length();
        let mut buffer = self.translate_screen_with_index(row_start, ClipDirection::Closest, false);
        let mut line = storage.line_chars(buffer.row);
        let mut hunk_index = 0;
        let mut unexpanded = 0;
        let mut expanded = 0;

        while tab_count > 0 && unexpanded < target.column {
            if let Some(hunk) = hunks.get(hunk_index).filter(|hunk| hunk.old_start == buffer) {
                if hunk.is_soft_wrap() {
                    assert!(hunk_index == 0, "unexpected soft wrap hunk inside screen row {}", target.row);
                    unexpanded = hunk.new_end.column;
                    expanded = unexpanded;
                } else {
                    buffer = hunk.old_end;
                    line = storage.line_chars(buffer.row);
                    unexpanded += 1;
                    expanded += 1;
                }
                hunk_index += 1;
                continue;
            }

            if line.get(buffer.column) == Some(&'\t') {
                expanded += tab_length - expanded % tab_length;
                tab_count -= 1;
            } else {
                expanded += 1;
            }
            unexpanded += 1;
            buffer.column += 1;
        }

        Point::new(target.row, expanded + target.column.saturating_sub(unexpanded))
    }

    /// Unexpanded screen column of `target` (expanded), snapping inside tabs per direction.
    fn collapse_hard_tabs(
        &self,
        storage: &dyn TextStorage,
        target: Point,
        clip_direction: ClipDirection,
        mut tab_count: usize,
    ) -> Point {
        let row_start = Point::new(target.row, 0);
        let hunks = self.spatial_index.hunks_in_new_range(row_start, target);
        let tab_length = self.params.tab_length();
        let mut buffer = self.translate_screen_with_index(row_start, ClipDirection::Closest, false);
        let mut line = storage.line_chars(buffer.row);
        let mut hunk_index = 0;
        let mut unexpanded = 0;
        let mut expanded = 0;

        while tab_count > 0 && expanded < target.column {
            if let Some(hunk) = hunks.get(hunk_index).filter(|hunk| hunk.old_start == buffer) {
                if hunk.is_soft_wrap() {
                    assert!(hunk_index == 0, "unexpected soft wrap hunk inside screen row {}", target.row);
                    unexpanded = target.column.min(hunk.new_end.column);
                    expanded = unexpanded;
                } else {
                    buffer = hunk.old_end;
                    line = storage.line_chars(buffer.row);
                    unexpanded += 1;
                    expanded += 1;
                }
                hunk_index += 1;
                continue;
            }

            if line.get(buffer.column) == Some(&'\t') {
                let next_tab_stop = expanded + tab_length - expanded % tab_length;
                if next_tab_stop > target.column {
                    let forward = match clip_direction {
                        ClipDirection::Backward => false,
                        ClipDirection::Forward => true,
                        ClipDirection::Closest => {
                            target.column - expanded >= next_tab_stop - target.column
                        }
                    };
                    return Point::new(target.row, unexpanded + usize::from(forward));
                }
                expanded = next_tab_stop;
                tab_count -= 1;
            } else {
                expanded += 1;
            }
            unexpanded += 1;
            buffer.column += 1;
        }

        Point::new(target.row, unexpanded + target.column.saturating_sub(expanded))
    }

    /// Column adjustment keeping `position` out of the middle of an atomic unit.
    pub(crate) fn clip_column_delta(
        &self,
        storage: &dyn TextStorage,
        position: Point,
        clip_direction: ClipDirection,
    ) -> isize {
        let line = storage.line_chars(position.row);
        let column = position.column;

        let graphemes = GraphemeBoundaries::new(&line);
        if !graphemes.is_boundary(column) {
            return match clip_direction {
                ClipDirection::Forward => (graphemes.next_boundary(column) - column) as isize,
                ClipDirection::Backward | ClipDirection::Closest => {
                    -((column - graphemes.previous_boundary(column)) as isize)
                }
            };
        }

        if !self.params.atomic_soft_tabs {
            return 0;
        }
        if column as f64 * self.params.ratio(' ') > self.params.soft_wrap_width() {
            return 0;
        }
        match line.get(..=column) {
            Some(prefix) if prefix.iter().all(|&ch| ch == ' ') => {}
            _ => return 0,
        }

        let tab_length = self.params.tab_length();
        let previous_tab_stop = column - column % tab_length;
        if column == previous_tab_stop {
            return 0;
        }
        let next_tab_stop = previous_tab_stop + tab_length;
        if (column..next_tab_stop).any(|index| line.get(index) != Some(&' ')) {
            return 0;
        }

        let snap_forward = match clip_direction {
            ClipDirection::Backward => false,
            ClipDirection::Forward => true,
            ClipDirection::Closest => (column - previous_tab_stop) * 2 > tab_length,
        };
        if snap_forward {
            (next_tab_stop - column) as isize
        } else {
            -((column - previous_tab_stop) as isize)
        }
    }

    /// Screen position of a buffer position. Out-of-range input is clipped.
    pub fn translate_buffer_position(
        &mut self,
        storage: &dyn TextStorage,
        position: impl Into<Point>,
        clip_direction: ClipDirection,
    ) -> Point {
        let mut position = storage.clip_position(position.into());
        self.populate_spatial_index_if_needed(storage, position.row + 1, usize::MAX);
        let delta = self.clip_column_delta(storage, position, clip_direction);
        position.column = position.column.saturating_add_signed(delta);

        let screen_position = self.translate_buffer_with_index(position, clip_direction);
        match self.tab_counts.get(screen_position.row) {
            Some(&tab_count) if tab_count > 0 => self.expand_hard_tabs(storage, screen_position, tab_count),
            _ => screen_position,
        }
    }

    /// Buffer position of a screen position. Out-of-range input is clipped.
    pub fn translate_screen_position(
        &mut self,
        storage: &dyn TextStorage,
        position: impl Into<Point>,
        options: impl Into<TranslateOptions>,
    ) -> Point {
        let options = options.into();
        let clip_direction = options.clip_direction;
        let mut screen_position = self.constrain_screen_position(storage, position.into(), clip_direction);
        if let Some(&tab_count) = self.tab_counts.get(screen_position.row) {
            if tab_count > 0 {
                screen_position = self.collapse_hard_tabs(storage, screen_position, clip_direction, tab_count);
            }
        }

        let buffer_position = storage.clip_position(self.translate_screen_with_index(
            screen_position,
            clip_direction,
            options.skip_soft_wrap_indentation,
        ));
        let delta = self.clip_column_delta(storage, buffer_position, clip_direction);
        Point::new(
            buffer_position.row,
            buffer_position.column.saturating_add_signed(delta),
        )
    }

    fn constrain_screen_position(
        &mut self,
        storage: &dyn TextStorage,
        position: Point,
        clip_direction: ClipDirection,
    ) -> Point {
        self.populate_spatial_index_if_needed(storage, storage.line_count(), position.row.saturating_add(1));
        let Some(max_row) = self.screen_line_lengths.len().checked_sub(1) else {
            return Point::ZERO;
        };
        if position.row > max_row {
            return Point::new(max_row, self.screen_line_lengths[max_row]);
        }
        let max_column = self.screen_line_lengths[position.row];
        if position.column > max_column {
            if clip_direction == ClipDirection::Forward && position.row < max_row {
                return Point::new(position.row + 1, 0);
            }
            return Point::new(position.row, max_column);
        }
        position
    }

    /// Screen range of a buffer range.
    pub fn translate_buffer_range(
        &mut self,
        storage: &dyn TextStorage,
        range: Range,
        clip_direction: ClipDirection,
    ) -> Range {
        Range::new(
            self.translate_buffer_position(storage, range.start, clip_direction),
            self.translate_buffer_position(storage, range.end, clip_direction),
        )
    }

    /// Buffer range of a screen range.
    pub fn translate_screen_range(
        &mut self,
        storage: &dyn TextStorage,
        range: Range,
        options: impl Into<TranslateOptions>,
    ) -> Range {
        let options = options.into();
        Range::new(
            self.translate_screen_position(storage, range.start, options),
            self.translate_screen_position(storage, range.end, options),
        )
    }

    /// Nearest screen position that corresponds to a buffer position.
    pub fn clip_screen_position(
        &mut self,
        storage: &dyn TextStorage,
        position: impl Into<Point>,
        options: impl Into<TranslateOptions>,
    ) -> Point {
        let options = options.into();
        let buffer_position = self.translate_screen_position(storage, position, options);
        self.translate_buffer_position(storage, buffer_position, options.clip_direction)
    }
}
