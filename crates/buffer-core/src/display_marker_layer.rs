//! Screen-coordinate views of marker layers.
//!
//! A display marker layer pairs a [`MarkerLayer`] with a [`DisplayLayer`]. Markers are still
//! stored in buffer coordinates; this module translates in both directions so callers can
//! create, move and query markers in screen coordinates.

use crate::display_layer::{DisplayLayer, DisplayLayerId, TranslateOptions};
use crate::error::{Error, Result};
use crate::marker::{Marker, MarkerId, MarkerOptions};
use crate::marker_layer::{FindMarkersParams, MarkerLayer, MarkerLayerId};
use crate::point::{ClipDirection, IntoPoint, IntoRange, Point, Range};
use crate::text::TextStorage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Display marker layer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DisplayMarkerLayerId(pub u64);

impl fmt::Display for DisplayMarkerLayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which layers a display marker layer projects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayMarkerLayerBinding {
    /// Layer providing the screen coordinates.
    pub display_layer: DisplayLayerId,
    /// Layer holding the markers.
    pub marker_layer: MarkerLayerId,
}

/// Borrowed screen-coordinate view over one marker layer.
///
/// Obtained from [`crate::TextBuffer::display_marker_layer_mut`]. Translations extend the
/// display layer's index on demand, hence the mutable borrow.
pub struct DisplayMarkerLayer<'a> {
    id: DisplayMarkerLayerId,
    display_layer: &'a mut DisplayLayer,
    marker_layer: &'a mut MarkerLayer,
    storage: &'a dyn TextStorage,
}

impl<'a> DisplayMarkerLayer<'a> {
    pub(crate) fn new(
        id: DisplayMarkerLayerId,
        display_layer: &'a mut DisplayLayer,
        marker_layer: &'a mut MarkerLayer,
        storage: &'a dyn TextStorage,
    ) -> Self {
        Self {
            id,
            display_layer,
            marker_layer,
            storage,
        }
    }

    /// Layer id.
    pub fn id(&self) -> DisplayMarkerLayerId {
        self.id
    }

    /// Underlying buffer-coordinate layer.
    pub fn marker_layer(&mut self) -> &mut MarkerLayer {
        self.marker_layer
    }

    /// Display layer used for translation.
    pub fn display_layer(&mut self) -> &mut DisplayLayer {
        self.display_layer
    }

    /// Mark the buffer range corresponding to a screen range.
    pub fn mark_screen_range(
        &mut self,
        range: impl IntoRange,
        options: MarkerOptions,
        clip_direction: ClipDirection,
    ) -> Result<MarkerId> {
        let range = range.into_range()?;
        let buffer_range = self
            .display_layer
            .translate_screen_range(self.storage, range, clip_direction);
        self.marker_layer.mark_range(buffer_range, options)
    }

    /// Mark the buffer position corresponding to a screen position.
    pub fn mark_screen_position(
        &mut self,
        position: impl IntoPoint,
        options: MarkerOptions,
        clip_direction: ClipDirection,
    ) -> Result<MarkerId> {
        let position = position.into_point()?;
        let buffer_position = self
            .display_layer
            .translate_screen_position(self.storage, position, clip_direction);
        self.marker_layer.mark_position(buffer_position, options)
    }

    /// Mark a buffer range; it is reported in screen coordinates like any other marker.
    pub fn mark_buffer_range(&mut self, range: impl IntoRange, options: MarkerOptions) -> Result<MarkerId> {
        let range = self.storage.clip_range(range.into_range()?);
        self.marker_layer.mark_range(range, options)
    }

    /// Screen range of a marker.
    pub fn marker_screen_range(&mut self, id: MarkerId) -> Result<Range> {
        let range = self.buffer_range(id)?;
        Ok(self
            .display_layer
            .translate_buffer_range(self.storage, range, ClipDirection::Closest))
    }

    /// Screen position of a marker's head.
    pub fn marker_head_screen_position(&mut self, id: MarkerId) -> Result<Point> {
        let head = self.marker(id)?.head();
        Ok(self
            .display_layer
            .translate_buffer_position(self.storage, head, ClipDirection::Closest))
    }

    /// Screen position of a marker's tail (the head for tail-less markers).
    pub fn marker_tail_screen_position(&mut self, id: MarkerId) -> Result<Point> {
        let tail = self.marker(id)?.tail();
        Ok(self
            .display_layer
            .translate_buffer_position(self.storage, tail, ClipDirection::Closest))
    }

    /// Move a marker to the buffer range corresponding to `range`.
    pub fn set_marker_screen_range(
        &mut self,
        id: MarkerId,
        range: impl IntoRange,
        reversed: Option<bool>,
        clip_direction: ClipDirection,
    ) -> Result<()> {
        let range = range.into_range()?;
        self.marker(id)?;
        let buffer_range = self
            .display_layer
            .translate_screen_range(self.storage, range, clip_direction);
        self.marker_layer.set_range(id, buffer_range, reversed)
    }

    /// Move a marker's head to the buffer position corresponding to `position`.
    pub fn set_marker_head_screen_position(
        &mut self,
        id: MarkerId,
        position: impl IntoPoint,
        clip_direction: ClipDirection,
    ) -> Result<()> {
        let position = position.into_point()?;
        self.marker(id)?;
        let buffer_position = self
            .display_layer
            .translate_screen_position(self.storage, position, clip_direction);
        self.marker_layer.set_head_position(id, buffer_position)
    }

    /// Markers intersecting a screen range, ordered like [`MarkerLayer::find_markers`].
    ///
    /// The range is widened outward so markers inside a fold or a hard tab are found.
    pub fn find_markers_in_screen_range(&mut self, range: impl IntoRange) -> Result<Vec<MarkerId>> {
        let range = range.into_range()?;
        let start = self.display_layer.translate_screen_position(
            self.storage,
            range.start,
            TranslateOptions::new(ClipDirection::Backward),
        );
        let end = self.display_layer.translate_screen_position(
            self.storage,
            range.end,
            TranslateOptions::new(ClipDirection::Forward),
        );
        let params = FindMarkersParams::new().intersecting_range(Range::new(start, end));
        Ok(self
            .marker_layer
            .find_markers(&params)
            .into_iter()
            .map(|marker| marker.id())
            .collect())
    }

    /// Screen position of a buffer position.
    pub fn translate_buffer_position(&mut self, position: Point, clip_direction: ClipDirection) -> Point {
        self.display_layer
            .translate_buffer_position(self.storage, position, clip_direction)
    }

    /// Buffer position of a screen position.
    pub fn translate_screen_position(&mut self, position: Point, options: impl Into<TranslateOptions>) -> Point {
        self.display_layer
            .translate_screen_position(self.storage, position, options)
    }

    fn marker(&self, id: MarkerId) -> Result<&Marker> {
        self.marker_layer
            .get_marker(id)
            .ok_or(Error::UnknownMarker(id.0))
    }

    fn buffer_range(&self, id: MarkerId) -> Result<Range> {
        self.marker(id).map(|marker| marker.range())
    }
}

impl fmt::Debug for DisplayMarkerLayer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayMarkerLayer")
            .field("id", &self.id)
            .field("display_layer", &self.display_layer.id())
            .field("marker_layer", &self.marker_layer.id())
            .finish()
    }
}
