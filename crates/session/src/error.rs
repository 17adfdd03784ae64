//! Session-level errors layered over the core taxonomy.

use thiserror::Error;

/// Errors raised by capture sessions and replay readers.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A codec, cache, or transport failure from the core taxonomy.
    #[error(transparent)]
    Core(#[from] reel_core::Error),

    /// A `NextFileId` chunk referenced a file the manifest does not list.
    #[error("manifest has no file at index {index}")]
    ManifestIndex {
        /// The out-of-range file index from the chunk
        index: usize,
    },

    /// Manifest file I/O failed.
    #[error("manifest I/O: {0}")]
    ManifestIo(#[source] std::io::Error),

    /// Manifest (de)serialization failed.
    #[error("manifest JSON: {0}")]
    ManifestJson(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
