//! Byte transport collaborators.
//!
//! The capture and replay state machines never touch files or sockets
//! directly; they write to a [`ByteSink`] and read from a [`ByteSource`].
//! Blocking, buffering, and retry policy all live behind these traits.

use crate::error::Result;

/// Destination for encoded chunks.
pub trait ByteSink {
    /// Write `bytes` in full.
    ///
    /// Failures propagate as [`crate::Error::Sink`] and abort the session;
    /// no retry is attempted at this layer.
    fn send(&mut self, bytes: &[u8]) -> Result<()>;

    /// Largest contiguous packet this sink accepts.
    ///
    /// The capture session bounds its order batches by
    /// `min(capacity(), 16384)`.
    fn capacity(&self) -> usize;

    /// Close the current file/stream and open the next logical one.
    ///
    /// Used by the capture session's multi-file rotation; `next` names the
    /// new segment.
    fn rotate(&mut self, next: &str) -> Result<()>;
}

/// Source of encoded chunks.
pub trait ByteSource {
    /// Read exactly `len` bytes.
    ///
    /// Fails with [`crate::Error::ShortRead`] if fewer than `len` bytes are
    /// available and no more are forthcoming. A short read with zero bytes
    /// delivered marks clean end-of-stream for callers that care.
    fn receive(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Close the current file/stream and continue from the segment named
    /// `next`.
    ///
    /// Used by `NextFileId` handling when a recording spans rotated files.
    fn rotate(&mut self, next: &str) -> Result<()>;
}
