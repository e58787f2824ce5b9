//! Screen-space change notifications and their coalescing.

use crate::point::Point;
use serde::{Deserialize, Serialize};

/// Screen rows `[start.row, start.row + old_extent.row)` were replaced by
/// `new_extent.row` rows. Columns are always zero.
///
/// Within one notification, changes are ordered and disjoint; each `start` is expressed
/// after the preceding changes of the list have been applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenChange {
    /// First affected screen row.
    pub start: Point,
    /// Rows removed.
    pub old_extent: Point,
    /// Rows inserted in their place.
    pub new_extent: Point,
}

impl ScreenChange {
    /// A change replacing `old_rows` rows at `start_row` with `new_rows` rows.
    pub fn rows(start_row: usize, old_rows: usize, new_rows: usize) -> Self {
        Self {
            start: Point::new(start_row, 0),
            old_extent: Point::new(old_rows, 0),
            new_extent: Point::new(new_rows, 0),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    /// Start row before any change of the batch.
    old_start: usize,
    old_rows: usize,
    new_rows: usize,
}

/// Accumulates changes made during a batch and composes them into one ordered list.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChangeAccumulator {
    entries: Vec<Entry>,
}

impl ChangeAccumulator {
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compose a change expressed in current coordinates (after every change added so far).
    pub(crate) fn push(&mut self, change: ScreenChange) {
        let start = change.start.row;
        let old_rows = change.old_extent.row;
        let new_rows = change.new_extent.row;
        if old_rows == 0 && new_rows == 0 {
            return;
        }
        let end = start + old_rows;

        let mut delta: isize = 0;
        let mut first = self.entries.len();
        let mut last = self.entries.len();
        for (index, entry) in self.entries.iter().enumerate() {
            let entry_start = shifted(entry.old_start, delta);
            let entry_end = entry_start + entry.new_rows;
            if entry_end < start {
                delta += entry.new_rows as isize - entry.old_rows as isize;
                continue;
            }
            if entry_start > end {
                first = first.min(index);
                last = index;
                break;
            }
            first = first.min(index);
            last = index + 1;
        }

        if first == last {
            self.entries.insert(
                first,
                Entry {
                    old_start: shifted(start, -delta),
                    old_rows,
                    new_rows,
                },
            );
            return;
        }

        let overlapping = &self.entries[first..last];
        let region_start = start.min(shifted(overlapping[0].old_start, delta));
        let mut delta_after = delta;
        let mut region_end = end;
        for entry in overlapping {
            let entry_start = shifted(entry.old_start, delta_after);
            region_end = region_end.max(entry_start + entry.new_rows);
            delta_after += entry.new_rows as isize - entry.old_rows as isize;
        }
        let merged_old_start = shifted(region_start, -delta);
        let merged_old_end = shifted(region_end, -delta_after);
        let merged = Entry {
            old_start: merged_old_start,
            old_rows: merged_old_end - merged_old_start,
            new_rows: region_end - region_start - old_rows + new_rows,
        };
        self.entries.splice(first..last, [merged]);
    }

    /// The composed changes, each starting after the previous ones are applied.
    pub(crate) fn take(&mut self) -> Vec<ScreenChange> {
        let mut delta: isize = 0;
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|entry| {
                let change =
                    ScreenChange::rows(shifted(entry.old_start, delta), entry.old_rows, entry.new_rows);
                delta += entry.new_rows as isize - entry.old_rows as isize;
                change
            })
            .collect()
    }
}

fn shifted(row: usize, delta: isize) -> usize {
    row.saturating_add_signed(delta)
}
