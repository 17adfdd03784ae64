//! Canonical error taxonomy for capture and replay.
//!
//! Every failure mode of the recording pipeline is represented here. All
//! variants abort the current session except [`Error::NoTierFits`], which the
//! encoder recovers from by sending the bitmap inline, uncached.

use thiserror::Error;

/// All capture/replay errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Fewer than the 8 header bytes were available at a chunk boundary.
    #[error("truncated stream: needed {needed} bytes for chunk header, got {got}")]
    TruncatedStream {
        /// Bytes required
        needed: usize,
        /// Bytes actually available
        got: usize,
    },

    /// The source under-delivered inside a chunk payload.
    #[error("short read: asked for {asked} bytes, got {got}")]
    ShortRead {
        /// Bytes requested
        asked: usize,
        /// Bytes actually delivered
        got: usize,
    },

    /// A single encoded record cannot fit even an empty batch.
    ///
    /// Indicates misconfiguration (packet capacity too small for the
    /// command stream); fatal to the session.
    #[error("record of {size} bytes exceeds batch capacity {capacity}")]
    RecordTooLarge {
        /// Encoded record size including margin
        size: usize,
        /// Effective batch capacity
        capacity: usize,
    },

    /// No cache tier has slots large enough for the bitmap.
    ///
    /// Recoverable: the caller sends the bitmap inline instead of caching.
    #[error("no cache tier fits a {byte_size}-byte bitmap")]
    NoTierFits {
        /// Encoded size of the rejected bitmap
        byte_size: usize,
    },

    /// Replay hit a blit referencing a slot never populated in this session.
    ///
    /// Signals a corrupt, truncated, or out-of-order recording.
    #[error("dangling cache reference: tier {tier} slot {slot} was never populated")]
    DanglingCacheReference {
        /// Tier id from the blit record
        tier: u8,
        /// Slot index from the blit record
        slot: u16,
    },

    /// The chunk header carried an unrecognized kind value.
    #[error("unknown chunk kind {kind}")]
    UnknownChunkKind {
        /// The raw kind value from the wire
        kind: u16,
    },

    /// A record or chunk payload failed structural decoding.
    #[error("malformed record: {detail}")]
    MalformedRecord {
        /// What went wrong
        detail: String,
    },

    /// The byte sink failed; propagated from the I/O collaborator.
    #[error("sink error: {0}")]
    Sink(#[source] std::io::Error),

    /// The byte source failed; propagated from the I/O collaborator.
    #[error("source error: {0}")]
    Source(#[source] std::io::Error),
}

/// Result type for capture/replay operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if the caller can recover from this error.
    ///
    /// Only [`Error::NoTierFits`] is recoverable (inline fallback); every
    /// other variant aborts the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::NoTierFits { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tier_fits_is_recoverable() {
        assert!(Error::NoTierFits { byte_size: 99999 }.is_recoverable());
    }

    #[test]
    fn test_fatal_errors_are_not_recoverable() {
        assert!(!Error::TruncatedStream { needed: 8, got: 3 }.is_recoverable());
        assert!(!Error::RecordTooLarge {
            size: 40000,
            capacity: 16384
        }
        .is_recoverable());
        assert!(!Error::DanglingCacheReference { tier: 1, slot: 7 }.is_recoverable());
        assert!(!Error::UnknownChunkKind { kind: 9999 }.is_recoverable());
    }
}
