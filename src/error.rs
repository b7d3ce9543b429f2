//! Error types for media validation, detection, and export operations.

use thiserror::Error;

/// Errors raised while validating uploaded media, before any session
/// state is mutated.
#[derive(Error, Debug)]
pub enum MediaError {
    /// File extension is not a supported image or video type
    #[error("Unsupported file type: {name}")]
    UnsupportedType {
        /// Name of the rejected file
        name: String,
    },

    /// Upload exceeds the size limit for its media kind
    #[error("File too large: {name} ({size} bytes, maximum {max})")]
    TooLarge {
        /// Name of the rejected file
        name: String,
        /// Actual size in bytes
        size: u64,
        /// Allowed maximum in bytes
        max: u64,
    },

    /// Image bytes could not be decoded
    #[error("Invalid image file - could not decode: {name}")]
    DecodeFailed {
        /// Name of the rejected file
        name: String,
    },

    /// No media has been loaded into the session
    #[error("No image loaded")]
    NoImage,
}

impl MediaError {
    /// Create an unsupported type error.
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::UnsupportedType { name: name.into() }
    }

    /// Create a decode failure error.
    pub fn decode_failed(name: impl Into<String>) -> Self {
        Self::DecodeFailed { name: name.into() }
    }
}

/// Errors surfaced by the detection bridge.
///
/// A `Service` error leaves annotation state unchanged; the operation is
/// retryable by re-invoking auto-annotate.
#[derive(Error, Debug)]
pub enum DetectError {
    /// A single-image detection is already outstanding
    #[error("Detection already in progress")]
    Busy,

    /// The result belongs to a superseded request and was not applied
    #[error("Stale detection result (generation {generation})")]
    Stale {
        /// Generation the result was issued for
        generation: u64,
    },

    /// Transport or service failure (network error, non-success status)
    #[error("Detection service error: {0}")]
    Service(String),

    /// Response body could not be parsed
    #[error("Malformed detection response: {0}")]
    Json(#[from] serde_json::Error),

    /// The target image has no retained bytes to send
    #[error(transparent)]
    Media(#[from] MediaError),
}

impl DetectError {
    /// Create a service error with a message.
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }
}

/// Errors surfaced by the export collaborator.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Collaborator failed to produce an archive
    #[error("Export service error: {0}")]
    Service(String),

    /// Request serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
