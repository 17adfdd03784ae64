//! Core types for the session capture/replay system
//!
//! This crate defines the fundamental types shared by the codec, cache, and
//! session layers:
//! - The drawing-command model: seven order kinds with fixed field layouts
//! - [`OrderState`]: the per-session array of last-emitted records
//! - [`Bitmap`] and its content [`Signature`]
//! - Collaborator traits for byte transport, drawable surfaces, and image
//!   encoding ([`ByteSink`], [`ByteSource`], [`DrawableSurface`],
//!   [`ImageCodec`])
//! - The canonical [`Error`] taxonomy

pub mod bitmap;
pub mod error;
pub mod geometry;
pub mod mem;
pub mod order;
pub mod surface;
pub mod transport;

pub use bitmap::{Bitmap, Signature};
pub use error::{Error, Result};
pub use geometry::{Brush, Pen, Rect};
pub use order::{
    DestBlt, DrawCommand, GlyphIndex, LineTo, MemBlt, OpaqueRect, OrderKind, OrderState, PatBlt,
    ScreenBlt,
};
pub use surface::{DrawableSurface, Frame, ImageCodec, RawImageCodec};
pub use transport::{ByteSink, ByteSource};
