//! Unified error type for Reel.
//!
//! This module wraps the internal error layers and presents one consistent
//! type at the crate boundary.

use thiserror::Error;

/// All Reel errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Codec, cache, or transport failure
    #[error(transparent)]
    Core(#[from] reel_core::Error),

    /// Capture/replay session failure
    #[error(transparent)]
    Session(#[from] reel_session::SessionError),

    /// Cache signature persistence failure
    #[error("cache persistence: {0}")]
    Persist(#[from] reel_cache::PersistError),
}

/// Result type for Reel operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if the caller can recover from this error.
    ///
    /// Only a cache-tier overflow is recoverable (the bitmap goes inline);
    /// every other failure aborts the session.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Core(e) => e.is_recoverable(),
            Error::Session(reel_session::SessionError::Core(e)) => e.is_recoverable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability_propagates_through_layers() {
        let inner = reel_core::Error::NoTierFits { byte_size: 1 };
        assert!(Error::Core(inner).is_recoverable());

        let nested = Error::Session(reel_session::SessionError::Core(
            reel_core::Error::NoTierFits { byte_size: 1 },
        ));
        assert!(nested.is_recoverable());

        let fatal = Error::Core(reel_core::Error::UnknownChunkKind { kind: 42 });
        assert!(!fatal.is_recoverable());
    }
}
