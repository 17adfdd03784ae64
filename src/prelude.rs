//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use reel::prelude::*;
//! ```

pub use crate::error::{Error, Result};
pub use reel_core::{
    Bitmap, Brush, ByteSink, ByteSource, DrawCommand, DrawableSurface, Frame, ImageCodec,
    OrderKind, OrderState, Pen, RawImageCodec, Rect,
};
pub use reel_core::{DestBlt, GlyphIndex, LineTo, MemBlt, OpaqueRect, PatBlt, ScreenBlt};

pub use reel_cache::{recorder_profile, BitmapCache, CacheOutcome, CacheRef, TierConfig};

pub use reel_session::{
    CaptureConfig, CaptureSession, Manifest, ReplayEvent, ReplayReader, SessionMeta,
};
