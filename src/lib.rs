//! # Reel
//!
//! Session capture and replay core for remote-desktop recordings.
//!
//! Reel turns a live stream of screen-drawing commands into a compact,
//! seekable binary recording, and turns that recording back into the same
//! stream of commands for playback, auditing, or screenshot extraction.
//!
//! ## Quick Start
//!
//! ```ignore
//! use reel::prelude::*;
//!
//! // Record
//! let config = CaptureConfig::recorder(1024, 768, 24);
//! let mut session = CaptureSession::new(config, sink, surface, codec, "rec-000.reel")?;
//! session.draw(&command)?;
//! session.advance_time(now_micros)?;
//! session.breakpoint()?;
//! let (sink, manifest) = session.close()?;
//!
//! // Replay
//! let mut reader = ReplayReader::new(source, consumer, manifest);
//! reader.run_to_end()?;
//! ```
//!
//! ## Architecture
//!
//! - [`reel_core`] — drawing-command model, order state, collaborator traits
//! - [`reel_codec`] — chunk envelope, delta order codec, save-state codec
//! - [`reel_cache`] — multi-tier bitmap cache with signature persistence
//! - [`reel_session`] — capture session, replay reader, recording manifest
//!
//! The encoder and decoder are byte-exact mirrors: after every `Orders`
//! chunk, a replay reader's order records equal the capture session's
//! field for field, and a reader may join mid-file at any breakpoint.

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use error::{Error, Result};

// Re-export the data model
pub use reel_core::{
    Bitmap, Brush, ByteSink, ByteSource, DestBlt, DrawCommand, DrawableSurface, Frame, GlyphIndex,
    ImageCodec, LineTo, MemBlt, OpaqueRect, OrderKind, OrderState, PatBlt, Pen, RawImageCodec,
    Rect, ScreenBlt, Signature,
};

// Re-export the cache
pub use reel_cache::{recorder_profile, BitmapCache, CacheOutcome, CacheRef, TierConfig};

// Re-export the sessions
pub use reel_session::{
    CaptureConfig, CaptureSession, Manifest, ManifestEntry, ReplayEvent, ReplayReader, SessionMeta,
};
