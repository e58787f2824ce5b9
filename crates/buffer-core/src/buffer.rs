//! Text buffer: text storage plus every layer that tracks it.
//!
//! [`TextBuffer`] owns the [`Text`], its marker layers and its display layers, all keyed by id.
//! Layers never point back at the buffer; edits are pushed to them in a fixed order:
//!
//! 1. every marker layer splices its markers,
//! 2. every display layer re-indexes the touched rows (folding in decoration invalidations),
//! 3. notifications run once the outermost transaction completes: text-change observers,
//!    then marker change observers, then marker layer update observers, then display layer
//!    change observers.

use crate::deadline::Deadline;
use crate::display_layer::{DisplayLayer, DisplayLayerId, DisplayLayerState};
use crate::display_marker_layer::{DisplayMarkerLayer, DisplayMarkerLayerBinding, DisplayMarkerLayerId};
use crate::display_params::DisplayLayerParams;
use crate::emitter::{Emitter, SubscriptionId};
use crate::error::{Error, Result};
use crate::marker_layer::{LayerSnapshot, MarkerLayer, MarkerLayerId, MarkerLayerOptions, MarkerLayerState};
use crate::point::{IntoPoint, IntoRange, Point, Range};
use crate::text::{Text, TextChange, TextStorage};
use std::collections::BTreeMap;
use std::fmt;

/// Text edits applied since the previous notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChangeEvent {
    /// Applied changes in application order.
    pub changes: Vec<TextChange>,
}

/// Marker state of every history-tracking layer, keyed by layer.
pub type MarkerLayersSnapshot = BTreeMap<MarkerLayerId, LayerSnapshot>;

/// A text buffer with marker layers and display layers.
pub struct TextBuffer {
    text: Text,
    next_marker_layer_id: u64,
    marker_layers: BTreeMap<MarkerLayerId, MarkerLayer>,
    default_marker_layer: MarkerLayerId,
    next_display_layer_id: u64,
    display_layers: BTreeMap<DisplayLayerId, DisplayLayer>,
    next_display_marker_layer_id: u64,
    display_marker_layers: BTreeMap<DisplayMarkerLayerId, DisplayMarkerLayerBinding>,
    text_emitter: Emitter<TextChangeEvent>,
    pending_text_changes: Vec<TextChange>,
    transaction_depth: usize,
}

impl TextBuffer {
    /// Create a buffer holding `text`, with one default marker layer.
    pub fn new(text: &str) -> Self {
        let mut buffer = Self {
            text: Text::from_text(text),
            next_marker_layer_id: 0,
            marker_layers: BTreeMap::new(),
            default_marker_layer: MarkerLayerId(0),
            next_display_layer_id: 0,
            display_layers: BTreeMap::new(),
            next_display_marker_layer_id: 0,
            display_marker_layers: BTreeMap::new(),
            text_emitter: Emitter::new(),
            pending_text_changes: Vec::new(),
            transaction_depth: 0,
        };
        buffer.default_marker_layer = buffer.add_marker_layer(MarkerLayerOptions::default());
        buffer
    }

    // ---- text ----------------------------------------------------------------------------

    /// Underlying storage.
    pub fn storage(&self) -> &Text {
        &self.text
    }

    /// The whole text.
    pub fn text(&self) -> String {
        self.text.text()
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.text.line_count()
    }

    /// Line contents without its ending.
    pub fn line_for_row(&self, row: usize) -> String {
        self.text.line_for_row(row)
    }

    /// Text inside `range` (clipped).
    pub fn text_in_range(&self, range: impl IntoRange) -> Result<String> {
        Ok(self.text.text_in_range(range.into_range()?))
    }

    /// Nearest valid buffer position.
    pub fn clip_position(&self, position: impl IntoPoint) -> Result<Point> {
        Ok(self.text.clip_position(position.into_point()?))
    }

    /// Replace `range` (clipped) with `text`. Returns the range of the inserted text.
    pub fn set_text_in_range(&mut self, range: impl IntoRange, text: &str) -> Result<Range> {
        let range = range.into_range()?;
        self.begin_transaction();
        let change = self.text.set_text_in_range(range, text);
        let new_range = change.new_range;
        self.propagate(change);
        self.end_transaction();
        Ok(new_range)
    }

    /// Insert `text` at `position`.
    pub fn insert(&mut self, position: impl IntoPoint, text: &str) -> Result<Range> {
        let position = position.into_point()?;
        self.set_text_in_range(Range::empty(position), text)
    }

    /// Delete `range`.
    pub fn delete(&mut self, range: impl IntoRange) -> Result<Range> {
        self.set_text_in_range(range, "")
    }

    /// Replace the whole text.
    pub fn set_text(&mut self, text: &str) -> Range {
        let range = Range::new(Point::ZERO, self.text.max_position());
        self.begin_transaction();
        let change = self.text.set_text_in_range(range, text);
        let new_range = change.new_range;
        self.propagate(change);
        self.end_transaction();
        new_range
    }

    fn propagate(&mut self, change: TextChange) {
        let (start, old_extent, new_extent) = (change.start(), change.old_extent(), change.new_extent());
        tracing::trace!(
            start = %start,
            old_extent = %old_extent,
            new_extent = %new_extent,
            "applying buffer edit"
        );
        for layer in self.marker_layers.values_mut() {
            layer.splice(start, old_extent, new_extent);
        }
        for layer in self.display_layers.values_mut() {
            layer.buffer_did_change(&self.text, &change);
        }
        self.pending_text_changes.push(change);
    }

    // ---- transactions --------------------------------------------------------------------

    /// Run `f` with every notification deferred until it returns.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.begin_transaction();
        let result = f(self);
        self.end_transaction();
        result
    }

    /// Open a (possibly nested) transaction.
    pub fn begin_transaction(&mut self) {
        if self.transaction_depth == 0 {
            for layer in self.marker_layers.values_mut() {
                layer.begin_batch();
            }
            for layer in self.display_layers.values_mut() {
                layer.begin_batch();
            }
        }
        self.transaction_depth += 1;
    }

    /// Close a transaction; closing the outermost one emits deferred notifications.
    pub fn end_transaction(&mut self) {
        match self.transaction_depth {
            0 => return,
            1 => {}
            _ => {
                self.transaction_depth -= 1;
                return;
            }
        }
        self.transaction_depth = 0;

        let changes = std::mem::take(&mut self.pending_text_changes);
        if !changes.is_empty() {
            self.text_emitter.emit(&TextChangeEvent { changes });
        }
        for layer in self.marker_layers.values_mut() {
            layer.emit_marker_changes();
        }
        for layer in self.marker_layers.values_mut() {
            layer.emit_did_update();
        }
        for layer in self.marker_layers.values_mut() {
            layer.end_batch();
        }
        for layer in self.display_layers.values_mut() {
            layer.end_batch();
        }
    }

    /// Whether a transaction is open.
    pub fn is_in_transaction(&self) -> bool {
        self.transaction_depth > 0
    }

    /// Observe text changes.
    pub fn on_did_change_text<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&TextChangeEvent) + Send + 'static,
    {
        self.text_emitter.subscribe(callback)
    }

    /// Remove a text-change subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.text_emitter.unsubscribe(id)
    }

    // ---- marker layers -------------------------------------------------------------------

    /// Create a marker layer.
    pub fn add_marker_layer(&mut self, options: MarkerLayerOptions) -> MarkerLayerId {
        let id = MarkerLayerId(self.next_marker_layer_id);
        self.next_marker_layer_id += 1;
        self.insert_marker_layer(MarkerLayer::new(id, options));
        tracing::debug!(layer = id.0, "added marker layer");
        id
    }

    fn insert_marker_layer(&mut self, mut layer: MarkerLayer) {
        if self.transaction_depth > 0 {
            layer.begin_batch();
        }
        self.marker_layers.insert(layer.id(), layer);
    }

    /// Layer that receives markers when the caller does not pick one.
    pub fn default_marker_layer_id(&self) -> MarkerLayerId {
        self.default_marker_layer
    }

    /// Look up a marker layer.
    pub fn marker_layer(&self, id: MarkerLayerId) -> Result<&MarkerLayer> {
        self.marker_layers
            .get(&id)
            .ok_or(Error::UnknownMarkerLayer(id.0))
    }

    /// Look up a marker layer for mutation.
    pub fn marker_layer_mut(&mut self, id: MarkerLayerId) -> Result<&mut MarkerLayer> {
        self.marker_layers
            .get_mut(&id)
            .ok_or(Error::UnknownMarkerLayer(id.0))
    }

    /// The default marker layer.
    pub fn default_marker_layer(&mut self) -> &mut MarkerLayer {
        let id = self.default_marker_layer;
        self.marker_layers
            .entry(id)
            .or_insert_with(|| MarkerLayer::new(id, MarkerLayerOptions::default()))
    }

    /// Ids of every live marker layer.
    pub fn marker_layer_ids(&self) -> Vec<MarkerLayerId> {
        self.marker_layers.keys().copied().collect()
    }

    /// Destroy a marker layer and every display marker layer projecting it.
    pub fn destroy_marker_layer(&mut self, id: MarkerLayerId) -> Result<()> {
        let mut layer = self
            .marker_layers
            .remove(&id)
            .ok_or(Error::UnknownMarkerLayer(id.0))?;
        self.display_marker_layers
            .retain(|_, binding| binding.marker_layer != id);
        layer.destroy();
        Ok(())
    }

    // ---- display layers ------------------------------------------------------------------

    /// Create a display layer.
    pub fn add_display_layer(&mut self, params: DisplayLayerParams) -> DisplayLayerId {
        let id = DisplayLayerId(self.next_display_layer_id);
        self.next_display_layer_id += 1;
        self.insert_display_layer(DisplayLayer::new(id, params));
        tracing::debug!(layer = id.0, "added display layer");
        id
    }

    fn insert_display_layer(&mut self, mut layer: DisplayLayer) {
        if self.transaction_depth > 0 {
            layer.begin_batch();
        }
        self.display_layers.insert(layer.id(), layer);
    }

    /// Look up a display layer.
    pub fn display_layer(&self, id: DisplayLayerId) -> Result<&DisplayLayer> {
        self.display_layers
            .get(&id)
            .ok_or(Error::UnknownDisplayLayer(id.0))
    }

    /// A display layer together with the text its operations need.
    pub fn display_layer_mut(&mut self, id: DisplayLayerId) -> Result<(&mut DisplayLayer, &Text)> {
        let layer = self
            .display_layers
            .get_mut(&id)
            .ok_or(Error::UnknownDisplayLayer(id.0))?;
        Ok((layer, &self.text))
    }

    /// Ids of every live display layer.
    pub fn display_layer_ids(&self) -> Vec<DisplayLayerId> {
        self.display_layers.keys().copied().collect()
    }

    /// Destroy a display layer and every display marker layer projecting through it.
    pub fn destroy_display_layer(&mut self, id: DisplayLayerId) -> Result<()> {
        let mut layer = self
            .display_layers
            .remove(&id)
            .ok_or(Error::UnknownDisplayLayer(id.0))?;
        self.display_marker_layers
            .retain(|_, binding| binding.display_layer != id);
        layer.destroy();
        Ok(())
    }

    /// Serializable state of a display layer.
    pub fn serialize_display_layer(&self, id: DisplayLayerId) -> Result<DisplayLayerState> {
        Ok(self.display_layer(id)?.serialize())
    }

    /// Add a display layer restored from [`TextBuffer::serialize_display_layer`] output.
    pub fn restore_display_layer(&mut self, state: DisplayLayerState) -> DisplayLayerId {
        let id = state.id;
        self.next_display_layer_id = self.next_display_layer_id.max(id.0 + 1);
        self.insert_display_layer(DisplayLayer::deserialize(state));
        id
    }

    /// Extend every display layer's index until `deadline` runs short. Returns whether work
    /// remains.
    pub fn do_background_work(&mut self, deadline: &dyn Deadline) -> bool {
        let mut remaining = false;
        for layer in self.display_layers.values_mut() {
            if deadline.time_remaining().is_zero() {
                return true;
            }
            remaining |= layer.do_background_work(&self.text, deadline);
        }
        remaining
    }

    // ---- display marker layers -----------------------------------------------------------

    /// Project a marker layer through a display layer.
    pub fn add_display_marker_layer(
        &mut self,
        display_layer: DisplayLayerId,
        marker_layer: MarkerLayerId,
    ) -> Result<DisplayMarkerLayerId> {
        self.display_layer(display_layer)?;
        self.marker_layer(marker_layer)?;
        let id = DisplayMarkerLayerId(self.next_display_marker_layer_id);
        self.next_display_marker_layer_id += 1;
        self.display_marker_layers.insert(
            id,
            DisplayMarkerLayerBinding {
                display_layer,
                marker_layer,
            },
        );
        Ok(id)
    }

    /// Screen-coordinate view of a display marker layer.
    pub fn display_marker_layer_mut(&mut self, id: DisplayMarkerLayerId) -> Result<DisplayMarkerLayer<'_>> {
        let binding = *self
            .display_marker_layers
            .get(&id)
            .ok_or(Error::UnknownDisplayMarkerLayer(id.0))?;
        let display_layer = self
            .display_layers
            .get_mut(&binding.display_layer)
            .ok_or(Error::UnknownDisplayLayer(binding.display_layer.0))?;
        let marker_layer = self
            .marker_layers
            .get_mut(&binding.marker_layer)
            .ok_or(Error::UnknownMarkerLayer(binding.marker_layer.0))?;
        Ok(DisplayMarkerLayer::new(id, display_layer, marker_layer, &self.text))
    }

    /// Layers a display marker layer projects between.
    pub fn display_marker_layer_binding(&self, id: DisplayMarkerLayerId) -> Result<DisplayMarkerLayerBinding> {
        self.display_marker_layers
            .get(&id)
            .copied()
            .ok_or(Error::UnknownDisplayMarkerLayer(id.0))
    }

    /// Forget a display marker layer. The underlying marker layer is kept.
    pub fn destroy_display_marker_layer(&mut self, id: DisplayMarkerLayerId) -> Result<()> {
        self.display_marker_layers
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::UnknownDisplayMarkerLayer(id.0))
    }

    // ---- snapshots and persistence -------------------------------------------------------

    /// Snapshot every layer created with `maintain_history`.
    pub fn create_marker_snapshot(&mut self) -> MarkerLayersSnapshot {
        self.marker_layers
            .iter_mut()
            .filter(|(_, layer)| layer.options().maintain_history)
            .map(|(id, layer)| (*id, layer.create_snapshot()))
            .collect()
    }

    /// Restore the layers captured by [`TextBuffer::create_marker_snapshot`]. Layers destroyed
    /// since then are skipped.
    pub fn restore_marker_snapshot(&mut self, snapshot: &MarkerLayersSnapshot) {
        self.transact(|buffer| {
            for (id, layer_snapshot) in snapshot {
                if let Some(layer) = buffer.marker_layers.get_mut(id) {
                    layer.restore_from_snapshot(layer_snapshot);
                }
            }
        });
    }

    /// Serializable state of every `persistent` marker layer.
    pub fn serialize_marker_layers(&self) -> BTreeMap<MarkerLayerId, MarkerLayerState> {
        self.marker_layers
            .iter()
            .filter(|(_, layer)| layer.options().persistent)
            .map(|(id, layer)| (*id, layer.serialize()))
            .collect()
    }

    /// Add (or replace) marker layers from [`TextBuffer::serialize_marker_layers`] output.
    pub fn deserialize_marker_layers(&mut self, states: BTreeMap<MarkerLayerId, MarkerLayerState>) {
        for (id, state) in states {
            self.next_marker_layer_id = self.next_marker_layer_id.max(id.0 + 1);
            if let Some(mut previous) = self.marker_layers.remove(&id) {
                previous.destroy();
            }
            self.insert_marker_layer(MarkerLayer::deserialize(state));
        }
    }

    /// [`TextBuffer::serialize_marker_layers`] as JSON.
    pub fn marker_layers_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.serialize_marker_layers())?)
    }

    /// [`TextBuffer::deserialize_marker_layers`] from JSON.
    pub fn marker_layers_from_json(&mut self, json: &str) -> Result<()> {
        let states = serde_json::from_str(json)?;
        self.deserialize_marker_layers(states);
        Ok(())
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl fmt::Debug for TextBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextBuffer")
            .field("lines", &self.text.line_count())
            .field("marker_layers", &self.marker_layers.len())
            .field("display_layers", &self.display_layers.len())
            .field("display_marker_layers", &self.display_marker_layers.len())
            .field("transaction_depth", &self.transaction_depth)
            .finish()
    }
}
