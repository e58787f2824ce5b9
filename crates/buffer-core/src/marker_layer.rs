//! Marker layers: collections of markers with queries, batched notifications and snapshots.
//!
//! A layer reacts to buffer edits through [`MarkerLayer::splice`]. Change notifications caused
//! by edits are buffered until [`MarkerLayer::flush_events`] so that every layer is consistent
//! before any observer runs.

use crate::emitter::{Emitter, SubscriptionId};
use crate::error::{Error, Result};
use crate::marker::{
    InvalidationStrategy, Marker, MarkerChangeEvent, MarkerId, MarkerOptions, MarkerState,
    Properties,
};
use crate::point::{IntoPoint, IntoRange, Point, Range};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Marker layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerLayerId(pub u64);

impl MarkerLayerId {
    /// Start of the id range reserved for display layer fold layers.
    pub const FOLD_LAYER_BASE: u64 = 1 << 63;

    /// Id of the fold layer owned by display layer `display_layer`.
    pub fn for_folds(display_layer: u64) -> Self {
        Self(Self::FOLD_LAYER_BASE | display_layer)
    }

    /// Whether the id lies in the fold layer range.
    pub fn is_fold_layer(self) -> bool {
        self.0 & Self::FOLD_LAYER_BASE != 0
    }
}

impl fmt::Display for MarkerLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Layer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerLayerOptions {
    /// Include the layer in buffer marker snapshots (undo/redo checkpoints).
    pub maintain_history: bool,
    /// Include the layer in serialized buffer state.
    pub persistent: bool,
    /// Destroy markers as soon as an edit invalidates them.
    pub destroy_invalidated_markers: bool,
    /// Free-form tag such as `"selections"`.
    pub role: Option<String>,
}

/// Notifications emitted by a [`MarkerLayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerLayerEvent {
    /// A marker was created.
    MarkerCreated(Marker),
    /// A marker's head, tail, validity or properties changed.
    MarkerChanged(MarkerChangeEvent),
    /// A marker was destroyed.
    MarkerDestroyed(MarkerId),
    /// Markers in the layer were created, changed or destroyed since the last update.
    Updated,
    /// The layer itself was destroyed.
    Destroyed,
}

/// Filters for [`MarkerLayer::find_markers`]. Every populated filter must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindMarkersParams {
    /// Markers starting exactly here.
    pub start_position: Option<Point>,
    /// Markers ending exactly here.
    pub end_position: Option<Point>,
    /// Markers whose start lies in the range (inclusive).
    pub starts_in_range: Option<Range>,
    /// Markers whose end lies in the range (inclusive).
    pub ends_in_range: Option<Range>,
    /// Markers containing the point (inclusive).
    pub contains_point: Option<Point>,
    /// Markers containing the whole range.
    pub contains_range: Option<Range>,
    /// Markers intersecting the range (inclusive).
    pub intersects_range: Option<Range>,
    /// Markers touching the row.
    pub intersects_row: Option<usize>,
    /// Markers touching any row in `start..=end`.
    pub intersects_row_range: Option<(usize, usize)>,
    /// Markers starting on the row.
    pub start_row: Option<usize>,
    /// Markers ending on the row.
    pub end_row: Option<usize>,
    /// Markers with the given validity.
    pub valid: Option<bool>,
    /// Markers whose properties include all of these entries.
    pub properties: Properties,
}

impl FindMarkersParams {
    /// Empty filter set; matches every marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`FindMarkersParams::contains_point`].
    pub fn containing_point(mut self, point: Point) -> Self {
        self.contains_point = Some(point);
        self
    }

    /// See [`FindMarkersParams::contains_range`].
    pub fn containing_range(mut self, range: Range) -> Self {
        self.contains_range = Some(range);
        self
    }

    /// See [`FindMarkersParams::intersects_range`].
    pub fn intersecting_range(mut self, range: Range) -> Self {
        self.intersects_range = Some(range);
        self
    }

    /// See [`FindMarkersParams::intersects_row_range`].
    pub fn intersecting_row_range(mut self, start_row: usize, end_row: usize) -> Self {
        self.intersects_row_range = Some((start_row, end_row));
        self
    }

    /// See [`FindMarkersParams::valid`].
    pub fn valid(mut self, valid: bool) -> Self {
        self.valid = Some(valid);
        self
    }

    /// Require a property value.
    pub fn property(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn matches(&self, marker: &Marker) -> bool {
        let range = marker.range();
        self.start_position.is_none_or(|p| range.start == p)
            && self.end_position.is_none_or(|p| range.end == p)
            && self.starts_in_range.is_none_or(|r| r.contains_point(range.start))
            && self.ends_in_range.is_none_or(|r| r.contains_point(range.end))
            && self.contains_point.is_none_or(|p| range.contains_point(p))
            && self.contains_range.is_none_or(|r| range.contains_range(&r))
            && self.intersects_range.is_none_or(|r| range.intersects(&r))
            && self.intersects_row.is_none_or(|row| range.intersects_row(row))
            && self
                .intersects_row_range
                .is_none_or(|(start, end)| range.intersects_row_range(start, end))
            && self.start_row.is_none_or(|row| range.start.row == row)
            && self.end_row.is_none_or(|row| range.end.row == row)
            && self.valid.is_none_or(|valid| marker.is_valid() == valid)
            && self
                .properties
                .iter()
                .all(|(key, value)| marker.properties().get(key) == Some(value))
    }
}

/// Persisted state of a single marker inside a [`LayerSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSnapshot {
    /// Covered range.
    pub range: Range,
    /// Whether the head precedes the tail.
    pub reversed: bool,
    /// Whether the marker tracks a tail.
    pub has_tail: bool,
    /// Invalidation strategy.
    pub invalidate: InvalidationStrategy,
    /// Exclusivity.
    pub exclusive: bool,
    /// Properties.
    pub properties: Properties,
}

/// Point-in-time copy of a layer's markers, used for undo/redo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    /// Live markers at snapshot time.
    pub markers: BTreeMap<MarkerId, MarkerSnapshot>,
    /// Markers destroyed since the previous snapshot.
    pub tombstones: BTreeSet<MarkerId>,
}

/// Serializable form of a whole layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerLayerState {
    /// Layer id.
    pub id: MarkerLayerId,
    /// Layer options.
    pub options: MarkerLayerOptions,
    /// Next id to hand out.
    pub next_marker_id: u64,
    /// Markers in id order.
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone)]
struct PendingChange {
    old: MarkerState,
    text_changed: bool,
}

/// A set of markers sharing configuration and observers.
pub struct MarkerLayer {
    id: MarkerLayerId,
    options: MarkerLayerOptions,
    markers: BTreeMap<MarkerId, Marker>,
    next_marker_id: u64,
    emitter: Emitter<MarkerLayerEvent>,
    pending_changes: BTreeMap<MarkerId, PendingChange>,
    pending_destroyed: Vec<MarkerId>,
    update_pending: bool,
    batch_depth: usize,
    destroyed_since_snapshot: BTreeSet<MarkerId>,
    destroyed: bool,
}

impl MarkerLayer {
    /// Create an empty layer.
    pub fn new(id: MarkerLayerId, options: MarkerLayerOptions) -> Self {
        Self {
            id,
            options,
            markers: BTreeMap::new(),
            next_marker_id: 0,
            emitter: Emitter::new(),
            pending_changes: BTreeMap::new(),
            pending_destroyed: Vec::new(),
            update_pending: false,
            batch_depth: 0,
            destroyed_since_snapshot: BTreeSet::new(),
            destroyed: false,
        }
    }

    /// Layer id.
    pub fn id(&self) -> MarkerLayerId {
        self.id
    }

    /// Layer options.
    pub fn options(&self) -> &MarkerLayerOptions {
        &self.options
    }

    /// Role tag, if any.
    pub fn role(&self) -> Option<&str> {
        self.options.role.as_deref()
    }

    /// Whether [`MarkerLayer::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Subscribe to layer notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&MarkerLayerEvent) + Send + 'static,
    {
        self.emitter.subscribe(callback)
    }

    /// Subscribe to change notifications of a single marker.
    pub fn on_did_change_marker<F>(&mut self, id: MarkerId, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&MarkerChangeEvent) + Send + 'static,
    {
        self.emitter.subscribe(move |event| {
            if let MarkerLayerEvent::MarkerChanged(change) = event
                && change.marker_id == id
            {
                callback(change);
            }
        })
    }

    /// Remove a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.emitter.unsubscribe(id)
    }

    /// Create a marker spanning `range`.
    ///
    /// Fails with [`Error::InvalidPosition`] for non-finite coordinates, leaving the layer
    /// untouched.
    pub fn mark_range(&mut self, range: impl IntoRange, options: MarkerOptions) -> Result<MarkerId> {
        let range = range.into_range()?;
        let id = MarkerId(self.next_marker_id);
        self.next_marker_id += 1;
        self.insert_marker(Marker::new(id, range, options));
        Ok(id)
    }

    /// Create a tail-less marker at `position`.
    pub fn mark_position(&mut self, position: impl IntoPoint, mut options: MarkerOptions) -> Result<MarkerId> {
        let position = position.into_point()?;
        options.tailless = true;
        self.mark_range(Range::empty(position), options)
    }

    fn insert_marker(&mut self, marker: Marker) {
        let created = marker.clone();
        self.markers.insert(marker.id(), marker);
        self.emitter.emit(&MarkerLayerEvent::MarkerCreated(created));
        self.update_pending = true;
        if self.batch_depth == 0 {
            self.emit_did_update();
        }
    }

    /// Look up a marker.
    pub fn get_marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(&id)
    }

    /// All markers in id order.
    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    /// Number of live markers.
    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    /// Markers matching `params`, ordered by start, then by descending length, then by id.
    pub fn find_markers(&self, params: &FindMarkersParams) -> Vec<&Marker> {
        let mut found: Vec<&Marker> = self
            .markers
            .values()
            .filter(|marker| params.matches(marker))
            .collect();
        found.sort_by(|a, b| {
            a.start()
                .cmp(&b.start())
                .then_with(|| b.end().cmp(&a.end()))
                .then_with(|| a.id().cmp(&b.id()))
        });
        found
    }

    /// Move the head. No-op when unchanged.
    pub fn set_head_position(&mut self, id: MarkerId, position: Point) -> Result<()> {
        self.mutate(id, |marker| {
            if marker.has_tail() {
                let tail = marker.tail();
                marker.set_head_and_tail(position, tail);
            } else {
                marker.set_head_and_tail(position, position);
            }
        })
    }

    /// Move the tail, planting one if the marker had none. No-op when unchanged.
    pub fn set_tail_position(&mut self, id: MarkerId, position: Point) -> Result<()> {
        self.mutate(id, |marker| {
            let head = marker.head();
            marker.set_has_tail(true);
            marker.set_head_and_tail(head, position);
        })
    }

    /// Replace the range. `reversed` defaults to the current orientation.
    pub fn set_range(&mut self, id: MarkerId, range: Range, reversed: Option<bool>) -> Result<()> {
        self.mutate(id, |marker| {
            let reversed = reversed.unwrap_or(marker.is_reversed());
            marker.set_has_tail(true);
            marker.set_range(range, reversed);
        })
    }

    /// Merge `properties` into the marker's properties.
    pub fn set_properties(&mut self, id: MarkerId, properties: Properties) -> Result<()> {
        self.mutate(id, |marker| {
            marker.properties_mut().extend(properties);
        })
    }

    /// Drop the tail; the range collapses onto the head.
    pub fn clear_tail(&mut self, id: MarkerId) -> Result<()> {
        self.mutate(id, |marker| {
            let head = marker.head();
            marker.set_has_tail(false);
            marker.set_head_and_tail(head, head);
        })
    }

    /// Start tracking a tail at the current head.
    pub fn plant_tail(&mut self, id: MarkerId) -> Result<()> {
        self.mutate(id, |marker| {
            if !marker.has_tail() {
                let head = marker.head();
                marker.set_has_tail(true);
                marker.set_head_and_tail(head, head);
            }
        })
    }

    fn mutate(&mut self, id: MarkerId, update: impl FnOnce(&mut Marker)) -> Result<()> {
        let marker = self.markers.get_mut(&id).ok_or(Error::UnknownMarker(id.0))?;
        let before = marker.state();
        update(marker);
        if marker.state() == before {
            return Ok(());
        }
        self.pending_changes.entry(id).or_insert(PendingChange {
            old: before,
            text_changed: false,
        });
        self.update_pending = true;
        if self.batch_depth == 0 {
            self.flush_events();
        }
        Ok(())
    }

    /// Destroy one marker. Returns whether it existed.
    pub fn destroy_marker(&mut self, id: MarkerId) -> bool {
        if self.markers.remove(&id).is_none() {
            return false;
        }
        self.pending_changes.remove(&id);
        self.destroyed_since_snapshot.insert(id);
        self.emitter.emit(&MarkerLayerEvent::MarkerDestroyed(id));
        self.update_pending = true;
        if self.batch_depth == 0 {
            self.emit_did_update();
        }
        true
    }

    /// Destroy every marker.
    pub fn clear(&mut self) {
        let ids: Vec<MarkerId> = self.markers.keys().copied().collect();
        self.begin_batch();
        for id in ids {
            self.destroy_marker(id);
        }
        self.end_batch();
    }

    /// Destroy the layer and all of its markers. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        tracing::debug!(layer = self.id.0, markers = self.markers.len(), "destroying marker layer");
        self.clear();
        self.destroyed = true;
        self.emitter.emit(&MarkerLayerEvent::Destroyed);
        self.emitter.clear();
    }

    /// Adjust every marker for a buffer edit replacing `old_extent` at `start` with
    /// `new_extent`. Notifications are buffered until [`MarkerLayer::flush_events`].
    pub fn splice(&mut self, start: Point, old_extent: Point, new_extent: Point) {
        let mut invalidated = Vec::new();
        for (id, marker) in self.markers.iter_mut() {
            if marker.end() < start {
                continue;
            }
            let before = marker.state();
            let was_invalidated = marker.splice(start, old_extent, new_extent);
            if marker.state() != before {
                self.pending_changes
                    .entry(*id)
                    .and_modify(|pending| pending.text_changed = true)
                    .or_insert(PendingChange {
                        old: before,
                        text_changed: true,
                    });
                self.update_pending = true;
            }
            if was_invalidated {
                invalidated.push(*id);
            }
        }

        tracing::trace!(
            layer = self.id.0,
            start = %start,
            invalidated = invalidated.len(),
            "spliced marker layer"
        );

        if self.options.destroy_invalidated_markers {
            for id in invalidated {
                self.markers.remove(&id);
                self.pending_changes.remove(&id);
                self.destroyed_since_snapshot.insert(id);
                self.pending_destroyed.push(id);
                self.update_pending = true;
            }
        }
    }

    /// Defer notifications until the matching [`MarkerLayer::end_batch`].
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    /// Close a batch; the outermost close flushes buffered notifications.
    pub fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth == 0 {
            self.flush_events();
        }
    }

    /// Whether notifications are currently deferred.
    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Emit buffered marker change and destroy notifications, then the layer update.
    pub fn flush_events(&mut self) {
        self.emit_marker_changes();
        self.emit_did_update();
    }

    /// Emit buffered per-marker notifications only.
    pub fn emit_marker_changes(&mut self) {
        let pending = std::mem::take(&mut self.pending_changes);
        for (id, change) in pending {
            let Some(marker) = self.markers.get(&id) else {
                continue;
            };
            let new = marker.state();
            if new == change.old {
                continue;
            }
            let event = MarkerChangeEvent::between(id, change.old, new, change.text_changed);
            self.emitter.emit(&MarkerLayerEvent::MarkerChanged(event));
        }
        for id in std::mem::take(&mut self.pending_destroyed) {
            self.emitter.emit(&MarkerLayerEvent::MarkerDestroyed(id));
        }
    }

    /// Emit the layer update notification if anything changed since the last one.
    pub fn emit_did_update(&mut self) {
        if std::mem::take(&mut self.update_pending) {
            self.emitter.emit(&MarkerLayerEvent::Updated);
        }
    }

    /// Capture the current markers plus the ids destroyed since the previous snapshot.
    pub fn create_snapshot(&mut self) -> LayerSnapshot {
        let markers = self
            .markers
            .values()
            .map(|marker| {
                (
                    marker.id(),
                    MarkerSnapshot {
                        range: marker.range(),
                        reversed: marker.is_reversed(),
                        has_tail: marker.has_tail(),
                        invalidate: marker.invalidation_strategy(),
                        exclusive: marker.is_exclusive(),
                        properties: marker.properties().clone(),
                    },
                )
            })
            .collect();
        LayerSnapshot {
            markers,
            tombstones: std::mem::take(&mut self.destroyed_since_snapshot),
        }
    }

    /// Make the layer match `snapshot`: recreate missing markers with their original ids,
    /// update surviving ones and destroy markers absent from it.
    pub fn restore_from_snapshot(&mut self, snapshot: &LayerSnapshot) {
        tracing::debug!(
            layer = self.id.0,
            markers = snapshot.markers.len(),
            "restoring marker layer snapshot"
        );
        self.begin_batch();

        let stale: Vec<MarkerId> = self
            .markers
            .keys()
            .filter(|id| !snapshot.markers.contains_key(id))
            .copied()
            .collect();
        for id in stale {
            self.destroy_marker(id);
        }

        for (id, entry) in &snapshot.markers {
            if self.markers.contains_key(id) {
                let restored = self.mutate(*id, |marker| {
                    marker.set_has_tail(entry.has_tail);
                    marker.set_range(entry.range, entry.reversed);
                    marker.set_valid(true);
                    marker.set_exclusive(entry.exclusive);
                    marker.set_invalidation_strategy(entry.invalidate);
                    *marker.properties_mut() = entry.properties.clone();
                });
                debug_assert!(restored.is_ok());
            } else {
                let options = MarkerOptions {
                    reversed: entry.reversed,
                    tailless: !entry.has_tail,
                    invalidate: entry.invalidate,
                    exclusive: Some(entry.exclusive),
                    properties: entry.properties.clone(),
                };
                self.next_marker_id = self.next_marker_id.max(id.0 + 1);
                self.insert_marker(Marker::new(*id, entry.range, options));
            }
        }

        self.end_batch();
    }

    /// Serializable copy of the layer.
    pub fn serialize(&self) -> MarkerLayerState {
        MarkerLayerState {
            id: self.id,
            options: self.options.clone(),
            next_marker_id: self.next_marker_id,
            markers: self.markers.values().cloned().collect(),
        }
    }

    /// Rebuild a layer from [`MarkerLayer::serialize`] output. No events are emitted.
    pub fn deserialize(state: MarkerLayerState) -> Self {
        let mut layer = MarkerLayer::new(state.id, state.options);
        layer.next_marker_id = state.next_marker_id;
        for marker in state.markers {
            layer.next_marker_id = layer.next_marker_id.max(marker.id().0 + 1);
            layer.markers.insert(marker.id(), marker);
        }
        layer
    }
}

impl fmt::Debug for MarkerLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkerLayer")
            .field("id", &self.id)
            .field("options", &self.options)
            .field("markers", &self.markers.len())
            .field("batch_depth", &self.batch_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn layer() -> MarkerLayer {
        MarkerLayer::new(MarkerLayerId(0), MarkerLayerOptions::default())
    }

    fn record(layer: &mut MarkerLayer) -> Arc<Mutex<Vec<MarkerLayerEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        layer.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
        events
    }

    #[test]
    fn test_find_markers_orders_outer_before_inner() {
        let mut layer = layer();
        let inner = layer
            .mark_range(Range::from_coords(0, 2, 0, 4), MarkerOptions::new())
            .unwrap();
        let outer = layer
            .mark_range(Range::from_coords(0, 2, 0, 9), MarkerOptions::new())
            .unwrap();
        let first = layer
            .mark_range(Range::from_coords(0, 0, 0, 1), MarkerOptions::new())
            .unwrap();

        let ids: Vec<MarkerId> = layer
            .find_markers(&FindMarkersParams::new())
            .into_iter()
            .map(Marker::id)
            .collect();
        assert_eq!(ids, vec![first, outer, inner]);

        let containing: Vec<MarkerId> = layer
            .find_markers(&FindMarkersParams::new().containing_point(Point::new(0, 3)))
            .into_iter()
            .map(Marker::id)
            .collect();
        assert_eq!(containing, vec![outer, inner]);
    }

    #[test]
    fn test_find_markers_by_property() {
        let mut layer = layer();
        layer
            .mark_range(Range::from_coords(0, 0, 0, 1), MarkerOptions::new().property("kind", "a"))
            .unwrap();
        let b = layer
            .mark_range(Range::from_coords(0, 0, 0, 1), MarkerOptions::new().property("kind", "b"))
            .unwrap();
        let found = layer.find_markers(&FindMarkersParams::new().property("kind", "b"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), b);
    }

    #[test]
    fn test_invalid_position_does_not_mutate() {
        let mut layer = layer();
        let result = layer.mark_range((Point::ZERO, (f64::NAN, 1.0)), MarkerOptions::new());
        assert!(matches!(result, Err(Error::InvalidPosition { .. })));
        assert_eq!(layer.marker_count(), 0);
        let id = layer.mark_position((0usize, 1usize), MarkerOptions::new()).unwrap();
        assert_eq!(id, MarkerId(0));
    }

    #[test]
    fn test_setters_are_noops_when_unchanged() {
        let mut layer = layer();
        let id = layer
            .mark_range(Range::from_coords(0, 1, 0, 3), MarkerOptions::new())
            .unwrap();
        let events = record(&mut layer);

        layer.set_head_position(id, Point::new(0, 3)).unwrap();
        assert!(events.lock().unwrap().is_empty());

        layer.set_head_position(id, Point::new(0, 0)).unwrap();
        let marker = layer.get_marker(id).unwrap();
        assert!(marker.is_reversed());
        assert_eq!(marker.range(), Range::from_coords(0, 0, 0, 1));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            MarkerLayerEvent::MarkerChanged(change) => {
                assert_eq!(change.old_head, Point::new(0, 3));
                assert_eq!(change.new_head, Point::new(0, 0));
                assert!(!change.text_changed);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], MarkerLayerEvent::Updated);
    }

    #[test]
    fn test_clear_and_plant_tail() {
        let mut layer = layer();
        let id = layer
            .mark_range(Range::from_coords(0, 1, 0, 3), MarkerOptions::new())
            .unwrap();
        layer.clear_tail(id).unwrap();
        let marker = layer.get_marker(id).unwrap();
        assert!(!marker.has_tail());
        assert_eq!(marker.range(), Range::empty(Point::new(0, 3)));

        layer.plant_tail(id).unwrap();
        layer.set_head_position(id, Point::new(0, 5)).unwrap();
        assert_eq!(
            layer.get_marker(id).unwrap().range(),
            Range::from_coords(0, 3, 0, 5)
        );
    }

    #[test]
    fn test_splice_defers_events_until_flush() {
        let mut layer = layer();
        let id = layer
            .mark_range(Range::from_coords(0, 3, 0, 6), MarkerOptions::new())
            .unwrap();
        let events = record(&mut layer);

        layer.splice(Point::new(0, 0), Point::ZERO, Point::new(0, 2));
        assert!(events.lock().unwrap().is_empty());

        layer.flush_events();
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        match &events[0] {
            MarkerLayerEvent::MarkerChanged(change) => {
                assert_eq!(change.marker_id, id);
                assert_eq!(change.new_tail, Point::new(0, 5));
                assert!(change.text_changed);
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(events[1], MarkerLayerEvent::Updated);
    }

    #[test]
    fn test_destroy_invalidated_markers() {
        let mut layer = MarkerLayer::new(
            MarkerLayerId(1),
            MarkerLayerOptions {
                destroy_invalidated_markers: true,
                ..Default::default()
            },
        );
        let id = layer
            .mark_range(Range::from_coords(0, 3, 0, 6), MarkerOptions::new())
            .unwrap();
        let events = record(&mut layer);
        layer.splice(Point::new(0, 4), Point::new(0, 1), Point::new(0, 3));
        assert!(layer.get_marker(id).is_none());
        layer.flush_events();
        assert_eq!(
            *events.lock().unwrap(),
            vec![MarkerLayerEvent::MarkerDestroyed(id), MarkerLayerEvent::Updated]
        );
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut layer = layer();
        let kept = layer
            .mark_range(Range::from_coords(0, 0, 0, 2), MarkerOptions::new())
            .unwrap();
        let removed = layer
            .mark_range(Range::from_coords(1, 0, 1, 2), MarkerOptions::new().property("k", 1))
            .unwrap();
        let snapshot = layer.create_snapshot();

        layer.destroy_marker(removed);
        layer.set_range(kept, Range::from_coords(2, 0, 2, 1), None).unwrap();
        let added = layer
            .mark_range(Range::from_coords(3, 0, 3, 1), MarkerOptions::new())
            .unwrap();

        let events = record(&mut layer);
        layer.restore_from_snapshot(&snapshot);

        assert!(layer.get_marker(added).is_none());
        assert_eq!(
            layer.get_marker(kept).unwrap().range(),
            Range::from_coords(0, 0, 0, 2)
        );
        let restored = layer.get_marker(removed).unwrap();
        assert_eq!(restored.range(), Range::from_coords(1, 0, 1, 2));
        assert_eq!(restored.properties().get("k"), Some(&serde_json::json!(1)));

        let events = events.lock().unwrap();
        assert!(events.contains(&MarkerLayerEvent::MarkerDestroyed(added)));
        assert!(
            events
                .iter()
                .any(|event| matches!(event, MarkerLayerEvent::MarkerCreated(m) if m.id() == removed))
        );
        assert_eq!(events.last(), Some(&MarkerLayerEvent::Updated));

        let next = layer.create_snapshot();
        assert!(next.tombstones.contains(&added));
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut layer = layer();
        layer
            .mark_range(Range::from_coords(0, 1, 2, 0), MarkerOptions::new().reversed(true))
            .unwrap();
        let json = serde_json::to_string(&layer.serialize()).unwrap();
        let state: MarkerLayerState = serde_json::from_str(&json).unwrap();
        let restored = MarkerLayer::deserialize(state);
        let marker = restored.get_marker(MarkerId(0)).unwrap();
        assert!(marker.is_reversed());
        assert_eq!(marker.head(), Point::new(0, 1));
        assert_eq!(restored.serialize().next_marker_id, 1);
    }
}
