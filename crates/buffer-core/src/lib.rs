#![warn(missing_docs)]
//! Buffer Core - Coordinate Projection Kernel for Text Editor Buffers
//!
//! # Overview
//!
//! `buffer-core` maps positions in a text buffer to positions on screen and back. The screen
//! is what a renderer draws: hard tabs expanded to tab stops, long lines soft-wrapped, folded
//! regions collapsed into a single placeholder character. Positions that must follow the text
//! as it is edited (cursors, bookmarks, diagnostics, folds) are tracked as markers.
//!
//! # Core Features
//!
//! - **Spatial Index**: ordered hunks relating buffer and screen coordinates, O(log n) lookup
//! - **Lazy Indexing**: screen rows are indexed on demand or in bounded background slices
//! - **Soft Wrapping**: word-boundary wrapping with indentation-preserving continuation lines
//! - **Code Folding**: folds are markers, so they move with edits and merge when they overlap
//! - **Screen Lines**: text plus a nested tag stream of built-in flags and decoration scopes
//! - **Markers**: edit-tracking ranges with five invalidation strategies and snapshots
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  TextBuffer (edits, transactions, events)   │  ← Public API
//! ├─────────────────────────────────────────────┤
//! │  Display Marker Layers                      │  ← Screen-space markers
//! ├─────────────────────────────────────────────┤
//! │  Screen Line Builder (tokens + decorations) │  ← Rendering Data
//! ├─────────────────────────────────────────────┤
//! │  Display Layer (tabs, wraps, folds)         │  ← Coordinate Projection
//! ├─────────────────────────────────────────────┤
//! │  Spatial Index                              │  ← Buffer/Screen Hunks
//! ├─────────────────────────────────────────────┤
//! │  Marker Layers                              │  ← Edit Tracking
//! ├─────────────────────────────────────────────┤
//! │  Text Storage (Rope-based)                  │  ← Text Access
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use buffer_core::{ClipDirection, DisplayLayerParams, Point, TextBuffer};
//!
//! let mut buffer = TextBuffer::new("abc\tdef\nghi");
//! let display = buffer.add_display_layer(DisplayLayerParams::new().with_tab_length(4));
//!
//! let (layer, text) = buffer.display_layer_mut(display).unwrap();
//! let lines = layer.screen_lines(text, 0, 2);
//! assert_eq!(lines[0].line_text, "abc def");
//!
//! let screen = layer.translate_buffer_position(text, Point::new(0, 4), ClipDirection::Closest);
//! assert_eq!(screen, Point::new(0, 4));
//!
//! layer.fold_buffer_range(text, ((0, 1), (1, 1))).unwrap();
//! let lines = layer.screen_lines(text, 0, 1);
//! assert_eq!(lines[0].line_text, "a⋯hi");
//! ```
//!
//! # Module Description
//!
//! - [`point`] - Points, ranges and clip directions
//! - [`text`] - Text storage trait and rope-backed implementation
//! - [`spatial_index`] - Buffer/screen hunk index
//! - [`display_params`] - Layout configuration and strategies
//! - [`display_layer`] - Projection, folds and lazy indexing
//! - [`screen_line`] - Rendered rows and tag encoding
//! - [`decoration`] - Decoration provider contract
//! - [`marker`] / [`marker_layer`] - Edit-tracking ranges
//! - [`display_marker_layer`] - Markers in screen coordinates
//! - [`buffer`] - The buffer tying everything together
//!
//! # Unicode Support
//!
//! - Columns count Unicode scalar values
//! - Grapheme clusters are atomic: positions inside one clip to its boundaries
//! - Optional East Asian width ratios via `unicode-width` for soft wrapping

pub mod buffer;
pub mod deadline;
pub mod decoration;
pub mod display_layer;
pub mod display_marker_layer;
pub mod display_params;
pub mod emitter;
pub mod error;
mod grapheme;
pub mod marker;
pub mod marker_layer;
pub mod point;
pub mod screen_line;
mod screen_line_builder;
pub mod spatial_index;
pub mod text;

pub use buffer::{MarkerLayersSnapshot, TextBuffer, TextChangeEvent};
pub use deadline::{Deadline, Unbounded};
pub use decoration::{
    DecorationIterator, DecorationLayer, DecorationSpan, NullDecorationLayer, SpanDecorationLayer,
};
pub use display_layer::{
    DisplayLayer, DisplayLayerEvent, DisplayLayerId, DisplayLayerState, FoldId, IndexFrontier,
    ScreenChange, TranslateOptions,
};
pub use display_marker_layer::{DisplayMarkerLayer, DisplayMarkerLayerBinding, DisplayMarkerLayerId};
pub use display_params::{CharacterWidth, DisplayLayerParams, Invisibles, WrapBoundary};
pub use emitter::{Emitter, SubscriptionId};
pub use error::{Error, Result};
pub use marker::{InvalidationStrategy, Marker, MarkerChangeEvent, MarkerId, MarkerOptions, Properties};
pub use marker_layer::{
    FindMarkersParams, LayerSnapshot, MarkerLayer, MarkerLayerEvent, MarkerLayerId,
    MarkerLayerOptions, MarkerLayerState, MarkerSnapshot,
};
pub use point::{ClipDirection, IntoPoint, IntoRange, Point, Range};
pub use screen_line::{BuiltInFlags, ScopeId, ScreenLine, ScreenLineId, TagCode, TagId};
pub use spatial_index::{Hunk, SpatialIndex};
pub use text::{LineEnding, Text, TextChange, TextStorage, extent_for_text};
