//! The drawing-command model: seven order kinds with fixed field layouts.
//!
//! Each kind has exactly one *live* record per session (encoder or decoder),
//! held in [`OrderState`]: the last fully-specified value of that kind that
//! has been transmitted. Records are mutated on every emitted command of
//! their kind and only ever overwritten, never deleted.

use crate::bitmap::Bitmap;
use crate::geometry::{Brush, Pen, Rect};

/// Maximum glyph payload carried by a [`GlyphIndex`] order.
pub const MAX_GLYPH_DATA: usize = 255;

/// Discriminant for the seven drawing-command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OrderKind {
    /// Solid rectangle fill
    OpaqueRect = 0,
    /// Screen-to-screen copy
    ScreenBlt = 1,
    /// Destination-only raster fill
    DestBlt = 2,
    /// Pattern (brush) fill
    PatBlt = 3,
    /// Cached-bitmap blit
    MemBlt = 4,
    /// Line draw
    LineTo = 5,
    /// Glyph-run draw
    GlyphIndex = 6,
}

impl OrderKind {
    /// All kinds, in wire-tag order.
    pub const ALL: [OrderKind; 7] = [
        OrderKind::OpaqueRect,
        OrderKind::ScreenBlt,
        OrderKind::DestBlt,
        OrderKind::PatBlt,
        OrderKind::MemBlt,
        OrderKind::LineTo,
        OrderKind::GlyphIndex,
    ];

    /// Wire tag for this kind.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag back into a kind.
    pub fn from_u8(tag: u8) -> Option<Self> {
        OrderKind::ALL.get(tag as usize).copied()
    }
}

/// Solid rectangle fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpaqueRect {
    /// Target rectangle
    pub rect: Rect,
    /// Fill color, 0x00BBGGRR
    pub color: u32,
}

/// Screen-to-screen copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenBlt {
    /// Destination rectangle
    pub rect: Rect,
    /// Raster operation
    pub rop: u8,
    /// Source left edge
    pub src_x: u16,
    /// Source top edge
    pub src_y: u16,
}

/// Destination-only raster fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestBlt {
    /// Target rectangle
    pub rect: Rect,
    /// Raster operation
    pub rop: u8,
}

/// Pattern (brush) fill.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatBlt {
    /// Target rectangle
    pub rect: Rect,
    /// Raster operation
    pub rop: u8,
    /// Background color, 0x00BBGGRR
    pub back_color: u32,
    /// Foreground color, 0x00BBGGRR
    pub fore_color: u32,
    /// Fill pattern
    pub brush: Brush,
}

/// Cached-bitmap blit.
///
/// Carries only a `(tier, slot)` cache reference on the wire, never pixel
/// data; the pixels travel ahead of the first reference in a cache-insert
/// record. `tier == 0xFF` is the uncached inline escape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemBlt {
    /// Destination rectangle
    pub rect: Rect,
    /// Raster operation
    pub rop: u8,
    /// Source left edge within the cached bitmap
    pub src_x: u16,
    /// Source top edge within the cached bitmap
    pub src_y: u16,
    /// Cache tier id
    pub tier: u8,
    /// Slot index within the tier
    pub slot: u16,
}

/// Line draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTo {
    /// Start point x
    pub start_x: u16,
    /// Start point y
    pub start_y: u16,
    /// End point x
    pub end_x: u16,
    /// End point y
    pub end_y: u16,
    /// Background mix mode
    pub back_mode: u8,
    /// Background color, 0x00BBGGRR
    pub back_color: u32,
    /// Binary raster operation
    pub rop2: u8,
    /// Stroke pen
    pub pen: Pen,
}

/// Glyph-run draw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlyphIndex {
    /// Background color, 0x00BBGGRR
    pub back_color: u32,
    /// Foreground color, 0x00BBGGRR
    pub fore_color: u32,
    /// Accelerator flags
    pub flags: u16,
    /// Fixed character advance, 0 for proportional
    pub char_inc: u16,
    /// Background rectangle
    pub bk: Rect,
    /// Opaque rectangle
    pub op: Rect,
    /// Background brush
    pub brush: Brush,
    /// Baseline origin x
    pub glyph_x: i16,
    /// Baseline origin y
    pub glyph_y: i16,
    /// Glyph index/advance payload, at most [`MAX_GLYPH_DATA`] bytes
    pub data: Vec<u8>,
}

/// The per-session array of last-emitted records, one per kind.
///
/// Created zeroed at session start, mutated on every processed command, and
/// owned by the session for its whole lifetime. Encoder and decoder keep
/// field-for-field identical copies of this state at every chunk boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderState {
    /// Last-emitted solid rectangle fill
    pub opaque_rect: OpaqueRect,
    /// Last-emitted screen-to-screen copy
    pub screen_blt: ScreenBlt,
    /// Last-emitted destination-only fill
    pub dest_blt: DestBlt,
    /// Last-emitted pattern fill
    pub pat_blt: PatBlt,
    /// Last-emitted cached-bitmap blit
    pub mem_blt: MemBlt,
    /// Last-emitted line draw
    pub line_to: LineTo,
    /// Last-emitted glyph-run draw
    pub glyph_index: GlyphIndex,
}

/// One drawing command, as consumed by a capture session or produced by a
/// replay reader.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Solid rectangle fill
    OpaqueRect(OpaqueRect),
    /// Screen-to-screen copy
    ScreenBlt(ScreenBlt),
    /// Destination-only fill
    DestBlt(DestBlt),
    /// Pattern fill
    PatBlt(PatBlt),
    /// Cached-bitmap blit plus the bitmap being blitted.
    ///
    /// On capture the `tier`/`slot` fields of the blit are assigned by the
    /// session, not the caller; on replay they carry the resolved reference.
    MemBlt(MemBlt, Bitmap),
    /// Line draw
    LineTo(LineTo),
    /// Glyph-run draw
    GlyphIndex(GlyphIndex),
}

impl DrawCommand {
    /// The order kind of this command.
    pub fn kind(&self) -> OrderKind {
        match self {
            DrawCommand::OpaqueRect(_) => OrderKind::OpaqueRect,
            DrawCommand::ScreenBlt(_) => OrderKind::ScreenBlt,
            DrawCommand::DestBlt(_) => OrderKind::DestBlt,
            DrawCommand::PatBlt(_) => OrderKind::PatBlt,
            DrawCommand::MemBlt(..) => OrderKind::MemBlt,
            DrawCommand::LineTo(_) => OrderKind::LineTo,
            DrawCommand::GlyphIndex(_) => OrderKind::GlyphIndex,
        }
    }
}
