//! Capture and replay sessions over the recording container format.
//!
//! [`CaptureSession`] turns a live stream of drawing commands into chunks on
//! a byte sink: it batches delta-encoded orders under packet limits, defers
//! timestamps until something actually flushes, and periodically emits a
//! self-contained resynchronization bundle (breakpoint) of screenshot,
//! order-state snapshot, and cache tables.
//!
//! [`ReplayReader`] is its decoder mirror: it reconstructs the same
//! last-emitted-record state and cache contents the encoder had, follows
//! multi-file continuation markers through the recording [`Manifest`], and
//! can start mid-file at any breakpoint.
//!
//! Both are single-threaded, synchronous, non-reentrant state machines; one
//! command or chunk is fully processed before the next is accepted, and
//! each session exclusively owns its order records and cache tiers.

pub mod capture;
pub mod error;
pub mod manifest;
pub mod payload;
pub mod replay;

pub use capture::{CaptureConfig, CaptureSession};
pub use error::{Result, SessionError};
pub use manifest::{Manifest, ManifestEntry};
pub use payload::SessionMeta;
pub use replay::{ReplayEvent, ReplayReader};
