//! Renders indexed screen rows into text plus a nested tag stream.

use crate::decoration::DecorationIterator;
use crate::display_layer::DisplayLayer;
use crate::display_params::is_inline_whitespace;
use crate::point::{ClipDirection, Point};
use crate::screen_line::{BuiltInFlags, ScopeId, TagCode, TagId};
use crate::spatial_index::Hunk;
use crate::text::TextStorage;

/// Text and tags of one rendered row.
pub(crate) type BuiltLine = (String, Vec<TagCode>);

pub(crate) struct ScreenLineBuilder<'a> {
    layer: &'a DisplayLayer,
    storage: &'a dyn TextStorage,
    tab_length: usize,
    show_indent_guides: bool,

    start_screen_row: usize,
    screen_row: usize,
    screen_column: usize,
    line_text: String,
    tags: Vec<TagCode>,
    built_in: BuiltInFlags,
    open_scopes: Vec<ScopeId>,
    pending_scopes: Vec<ScopeId>,
    suppressed_scopes: Vec<ScopeId>,
    lines: Vec<BuiltLine>,
}

/// Whitespace classification of one buffer line.
struct LineShape {
    chars: Vec<char>,
    /// First non-whitespace column, or the length for whitespace-only lines.
    first_non_whitespace: usize,
    /// Column after the last non-whitespace character, or zero.
    trailing_start: usize,
}

impl LineShape {
    fn new(chars: Vec<char>) -> Self {
        let first_non_whitespace = chars
            .iter()
            .position(|&ch| !is_inline_whitespace(ch))
            .unwrap_or(chars.len());
        let trailing_start = chars
            .iter()
            .rposition(|&ch| !is_inline_whitespace(ch))
            .map_or(0, |index| index + 1);
        Self {
            chars,
            first_non_whitespace,
            trailing_start,
        }
    }
}

impl<'a> ScreenLineBuilder<'a> {
    pub(crate) fn new(layer: &'a DisplayLayer, storage: &'a dyn TextStorage) -> Self {
        Self {
            layer,
            storage,
            tab_length: layer.params.tab_length(),
            show_indent_guides: layer.params.show_indent_guides,
            start_screen_row: 0,
            screen_row: 0,
            screen_column: 0,
            line_text: String::new(),
            tags: Vec::new(),
            built_in: BuiltInFlags::empty(),
            open_scopes: Vec::new(),
            pending_scopes: Vec::new(),
            suppressed_scopes: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Render screen rows `start_screen_row..end_screen_row`, which must be indexed.
    pub(crate) fn build(mut self, start_screen_row: usize, end_screen_row: usize) -> Vec<BuiltLine> {
        let layer = self.layer;
        let storage = self.storage;
        let line_count = storage.line_count();

        let mut buffer_row = layer.find_boundary_preceding_buffer_row(
            layer
                .translate_screen_with_index(Point::new(start_screen_row, 0), ClipDirection::Closest, false)
                .row,
        );
        self.start_screen_row = start_screen_row;
        self.screen_row = layer
            .translate_buffer_with_index(Point::new(buffer_row, 0), ClipDirection::Backward)
            .row;

        let row_start = Point::new(buffer_row, 0);
        let hunks: Vec<Hunk> = layer
            .spatial_index
            .hunks_in_new_range(Point::new(self.screen_row, 0), Point::new(end_screen_row, 0))
            .into_iter()
            .filter(|hunk| hunk.old_start >= row_start)
            .collect();
        let mut hunk_index = 0;

        let mut decorations = layer.decoration_layer.build_iterator(storage);
        self.suppressed_scopes = self.scopes_truncated_before(decorations.as_mut(), row_start);
        self.pending_scopes = decorations.seek(row_start);
        for scope in &self.suppressed_scopes {
            if let Some(index) = self.pending_scopes.iter().position(|pending| pending == scope) {
                self.pending_scopes.remove(index);
            }
        }

        'rows: while self.screen_row < end_screen_row && buffer_row < line_count {
            let mut line = LineShape::new(storage.line_chars(buffer_row));
            let mut column = 0;
            let mut in_leading_whitespace = true;
            self.screen_column = 0;

            loop {
                let position = Point::new(buffer_row, column);
                while let Some(hunk) = hunks.get(hunk_index).filter(|hunk| hunk.old_start == position) {
                    hunk_index += 1;
                    if hunk.is_soft_wrap() {
                        self.finish_screen_line();
                        if self.screen_row >= end_screen_row {
                            break 'rows;
                        }
                        self.emit_indentation(hunk.new_end.column);
                    } else {
                        self.emit_fold();
                        self.suppressed_scopes = decorations.seek(hunk.old_end);
                        if hunk.old_end.row != buffer_row {
                            buffer_row = hunk.old_end.row;
                            line = LineShape::new(storage.line_chars(buffer_row));
                        }
                        column = hunk.old_end.column;
                        in_leading_whitespace = false;
                    }
                }

                let position = Point::new(buffer_row, column);
                while decorations.position() <= position {
                    for scope in decorations.close_scope_ids() {
                        self.close_scope(scope);
                    }
                    self.pending_scopes.extend(decorations.open_scope_ids());
                    if !decorations.move_to_successor() {
                        break;
                    }
                }

                let Some(&ch) = line.chars.get(column) else {
                    break;
                };
                let mut flags = BuiltInFlags::empty();
                let leading = in_leading_whitespace && column < line.first_non_whitespace;
                if leading {
                    flags |= BuiltInFlags::LEADING_WHITESPACE;
                }
                if column >= line.trailing_start {
                    flags |= BuiltInFlags::TRAILING_WHITESPACE;
                }
                let at_guide = self.show_indent_guides && leading && self.screen_column % self.tab_length == 0;
                if self.show_indent_guides && leading {
                    flags |= BuiltInFlags::INDENT_GUIDE;
                }

                let invisibles = &layer.params.invisibles;
                if ch == '\t' {
                    flags |= BuiltInFlags::HARD_TAB;
                    let width = self.tab_length - self.screen_column % self.tab_length;
                    let mut text = String::with_capacity(width);
                    match invisibles.tab {
                        Some(tab) => {
                            flags |= BuiltInFlags::INVISIBLE_CHARACTER;
                            text.push(tab);
                        }
                        None => text.push(' '),
                    }
                    text.push_str(&" ".repeat(width - 1));
                    // A hard tab is always its own token.
                    self.emit_text(&text, flags, true);
                } else if ch == ' ' && flags.intersects(BuiltInFlags::LEADING_WHITESPACE | BuiltInFlags::TRAILING_WHITESPACE) {
                    match invisibles.space {
                        Some(space) => {
                            flags |= BuiltInFlags::INVISIBLE_CHARACTER;
                            self.emit_char(space, flags, at_guide);
                        }
                        None => self.emit_char(' ', flags, at_guide),
                    }
                } else {
                    self.emit_char(ch, flags, at_guide);
                }
                column += 1;
            }

            let eol = layer
                .params
                .invisibles
                .for_line_ending(storage.line_ending_for_row(buffer_row));
            if !eol.is_empty() {
                self.emit_text(
                    &eol,
                    BuiltInFlags::INVISIBLE_CHARACTER | BuiltInFlags::LINE_ENDING,
                    false,
                );
            }
            if self.show_indent_guides && line.chars.is_empty() {
                let width = self.surrounding_indentation_width(buffer_row);
                self.emit_indentation(width);
            }

            self.finish_screen_line();
            buffer_row += 1;
        }

        self.lines
    }

    /// Scopes cut by the last fold ending at or before `row_start` that are still open there.
    fn scopes_truncated_before(
        &self,
        decorations: &mut (dyn DecorationIterator + '_),
        row_start: Point,
    ) -> Vec<ScopeId> {
        if self.layer.fold_count() == 0 {
            return Vec::new();
        }
        let hunks = self.layer.spatial_index.hunks();
        let before = hunks.partition_point(|hunk| hunk.old_start < row_start);
        let Some(fold) = hunks[..before].iter().rev().find(|hunk| !hunk.is_soft_wrap()) else {
            return Vec::new();
        };

        let mut truncated = decorations.seek(fold.old_end);
        let mut live: Vec<ScopeId> = Vec::new();
        while decorations.position() < row_start {
            for scope in decorations.close_scope_ids() {
                if let Some(index) = live.iter().rposition(|open| *open == scope) {
                    live.remove(index);
                } else if let Some(index) = truncated.iter().rposition(|open| *open == scope) {
                    truncated.remove(index);
                }
            }
            live.extend(decorations.open_scope_ids());
            if !decorations.move_to_successor() {
                break;
            }
        }
        truncated
    }

    fn emit_char(&mut self, ch: char, flags: BuiltInFlags, force_new_tag: bool) {
        let mut buffer = [0; 4];
        self.emit_text(ch.encode_utf8(&mut buffer), flags, force_new_tag);
    }

    /// Append text under `flags`, opening pending decoration scopes first.
    fn emit_text(&mut self, text: &str, flags: BuiltInFlags, force_new_tag: bool) {
        if !self.pending_scopes.is_empty() {
            self.close_built_in();
            for scope in std::mem::take(&mut self.pending_scopes) {
                self.tags.push(TagCode::Open(TagId::Scope(scope)));
                self.open_scopes.push(scope);
            }
        }
        if flags != self.built_in || (force_new_tag && !flags.is_empty()) {
            self.close_built_in();
            if !flags.is_empty() {
                self.tags.push(TagCode::Open(TagId::BuiltIn(flags)));
            }
            self.built_in = flags;
        }

        let length = text.chars().count();
        self.line_text.push_str(text);
        self.screen_column += length;
        match self.tags.last_mut() {
            Some(TagCode::Text(run)) => *run += length,
            _ => self.tags.push(TagCode::Text(length)),
        }
    }

    /// Spaces up to `end_column`, split into indent guide segments at tab stops.
    fn emit_indentation(&mut self, end_column: usize) {
        let mut in_guide = false;
        while self.screen_column < end_column {
            let at_stop = self.screen_column % self.tab_length == 0;
            in_guide |= self.show_indent_guides && at_stop;
            let flags = if in_guide {
                BuiltInFlags::INDENT_GUIDE
            } else {
                BuiltInFlags::empty()
            };
            self.emit_char(' ', flags, at_stop);
        }
    }

    /// Close every open scope for good and emit the fold placeholder.
    fn emit_fold(&mut self) {
        self.close_built_in();
        while let Some(scope) = self.open_scopes.pop() {
            self.tags.push(TagCode::Close(TagId::Scope(scope)));
        }
        self.pending_scopes.clear();
        let fold_character = self.layer.params.fold_character;
        self.emit_char(fold_character, BuiltInFlags::FOLD, true);
    }

    fn close_built_in(&mut self) {
        if !self.built_in.is_empty() {
            self.tags.push(TagCode::Close(TagId::BuiltIn(self.built_in)));
            self.built_in = BuiltInFlags::empty();
        }
    }

    fn close_scope(&mut self, scope: ScopeId) {
        if let Some(index) = self.open_scopes.iter().rposition(|open| *open == scope) {
            self.close_built_in();
            let above = self.open_scopes.split_off(index + 1);
            for inner in above.iter().rev() {
                self.tags.push(TagCode::Close(TagId::Scope(*inner)));
            }
            self.open_scopes.pop();
            self.tags.push(TagCode::Close(TagId::Scope(scope)));
            // Scopes closed out of order reopen before the next text.
            let mut reopened = above;
            reopened.append(&mut self.pending_scopes);
            self.pending_scopes = reopened;
        } else if let Some(index) = self.pending_scopes.iter().rposition(|pending| *pending == scope) {
            self.pending_scopes.remove(index);
        } else if let Some(index) = self.suppressed_scopes.iter().rposition(|suppressed| *suppressed == scope) {
            self.suppressed_scopes.remove(index);
        }
    }

    /// Close every open tag, keep open scopes for the next row and record the row.
    fn finish_screen_line(&mut self) {
        self.close_built_in();
        let mut carried = Vec::with_capacity(self.open_scopes.len() + self.pending_scopes.len());
        for scope in self.open_scopes.iter().rev() {
            self.tags.push(TagCode::Close(TagId::Scope(*scope)));
        }
        carried.append(&mut self.open_scopes);
        carried.append(&mut self.pending_scopes);
        self.pending_scopes = carried;

        let line_text = std::mem::take(&mut self.line_text);
        let mut tags = std::mem::take(&mut self.tags);
        if tags.is_empty() {
            tags.push(TagCode::Text(0));
        }
        if self.screen_row >= self.start_screen_row {
            self.lines.push((line_text, tags));
        }
        self.screen_row += 1;
        self.screen_column = 0;
    }

    /// Widest leading whitespace of the nearest non-empty rows above and below `row`.
    fn surrounding_indentation_width(&self, row: usize) -> usize {
        let storage = self.storage;
        let above = (0..row)
            .rev()
            .find(|&candidate| storage.line_length_for_row(candidate) > 0)
            .map_or(0, |candidate| self.leading_whitespace_width(candidate));
        let below = (row + 1..storage.line_count())
            .find(|&candidate| storage.line_length_for_row(candidate) > 0)
            .map_or(0, |candidate| self.leading_whitespace_width(candidate));
        above.max(below)
    }

    fn leading_whitespace_width(&self, row: usize) -> usize {
        let mut width = 0;
        for ch in self.storage.line_chars(row) {
            match ch {
                ' ' => width += 1,
                '\t' => width += self.tab_length - width % self.tab_length,
                _ => break,
            }
        }
        width
    }
}
