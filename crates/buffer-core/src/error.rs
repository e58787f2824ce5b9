//! Error types.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by buffer, marker and display-layer operations.
///
/// Out-of-range positions are never errors: they are clipped to the nearest valid position.
#[derive(Debug, Error)]
pub enum Error {
    /// A NaN or infinite coordinate was passed to a marking or range API.
    #[error("invalid position ({row}, {column})")]
    InvalidPosition {
        /// Row as supplied by the caller.
        row: f64,
        /// Column as supplied by the caller.
        column: f64,
    },

    /// No marker layer with this id exists (or it was destroyed).
    #[error("unknown marker layer {0}")]
    UnknownMarkerLayer(u64),

    /// No marker with this id exists in the layer.
    #[error("unknown marker {0}")]
    UnknownMarker(u64),

    /// No display layer with this id exists (or it was destroyed).
    #[error("unknown display layer {0}")]
    UnknownDisplayLayer(u64),

    /// No display marker layer with this id exists (or it was destroyed).
    #[error("unknown display marker layer {0}")]
    UnknownDisplayMarkerLayer(u64),

    /// Persisted state could not be encoded or decoded.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
