//! Delta-encoded order records, driven by per-kind field tables.
//!
//! Each order kind declares an ordered table of [`FieldSpec`] entries
//! (width + accessor pair); one generic routine encodes and decodes every
//! kind against the last-emitted record of that kind. A record on the wire
//! is:
//!
//! ```text
//! [kind: u8] [presence: u32 LE bitmask] [changed fields, table order, LE]
//!            [payload bit set → u8 length + bytes]
//! ```
//!
//! A field is included iff its value differs from the last-emitted record;
//! decoding merges present fields into the resident record, which then
//! becomes the new last-emitted value. Inclusion is all-or-nothing per
//! field: once selected, a field always travels at its full fixed width.
//!
//! The cache-insert auxiliary record (tag [`CACHE_INSERT_TAG`]) carries a
//! full bitmap payload and always precedes the first blit referencing its
//! slot. Tier [`INLINE_TIER`] is the uncached escape used when no cache
//! tier fits the bitmap.

use byteorder::{LittleEndian, ReadBytesExt};

use reel_core::order::MAX_GLYPH_DATA;
use reel_core::{
    Bitmap, DestBlt, Error, GlyphIndex, LineTo, MemBlt, OpaqueRect, OrderKind, PatBlt, Result,
    ScreenBlt,
};

/// Wire tag marking a cache-insert record inside an Orders payload.
pub const CACHE_INSERT_TAG: u8 = 0x80;

/// Pseudo-tier carried by cache-insert and blit records for bitmaps too
/// large for any cache tier; the decoder applies them one-shot, uncached.
pub const INLINE_TIER: u8 = 0xFF;

/// Fixed width of one table field on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldWidth {
    /// One byte
    U8,
    /// Two bytes, little-endian
    U16,
    /// Four bytes, little-endian
    U32,
}

impl FieldWidth {
    fn bytes(self) -> usize {
        match self {
            FieldWidth::U8 => 1,
            FieldWidth::U16 => 2,
            FieldWidth::U32 => 4,
        }
    }
}

/// One entry of a kind's field table: wire width plus accessor pair.
///
/// Signed fields ride as unsigned casts of the same width.
pub struct FieldSpec<R> {
    /// Wire width
    pub width: FieldWidth,
    /// Read the field from a record
    pub get: fn(&R) -> u32,
    /// Write the field into a record
    pub set: fn(&mut R, u32),
}

/// An order record that can be delta-encoded against its last-emitted
/// predecessor.
pub trait DeltaRecord: Clone + PartialEq + 'static {
    /// The kind this record belongs to.
    const KIND: OrderKind;

    /// Ordered field table; bit `i` of the presence mask covers entry `i`.
    const FIELDS: &'static [FieldSpec<Self>];

    /// Whether the record carries a variable-length payload (bit
    /// `FIELDS.len()` of the presence mask).
    const HAS_PAYLOAD: bool = false;

    /// The variable payload, empty when `HAS_PAYLOAD` is false.
    fn payload(&self) -> &[u8] {
        &[]
    }

    /// Replace the variable payload.
    fn set_payload(&mut self, _bytes: Vec<u8>) {}
}

impl DeltaRecord for OpaqueRect {
    const KIND: OrderKind = OrderKind::OpaqueRect;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.x as u32, set: |r, v| r.rect.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.y as u32, set: |r, v| r.rect.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cx as u32, set: |r, v| r.rect.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cy as u32, set: |r, v| r.rect.cy = v as u16 },
        FieldSpec { width: FieldWidth::U32, get: |r| r.color, set: |r, v| r.color = v },
    ];
}

impl DeltaRecord for ScreenBlt {
    const KIND: OrderKind = OrderKind::ScreenBlt;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.x as u32, set: |r, v| r.rect.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.y as u32, set: |r, v| r.rect.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cx as u32, set: |r, v| r.rect.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cy as u32, set: |r, v| r.rect.cy = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.rop as u32, set: |r, v| r.rop = v as u8 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.src_x as u32, set: |r, v| r.src_x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.src_y as u32, set: |r, v| r.src_y = v as u16 },
    ];
}

impl DeltaRecord for DestBlt {
    const KIND: OrderKind = OrderKind::DestBlt;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.x as u32, set: |r, v| r.rect.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.y as u32, set: |r, v| r.rect.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cx as u32, set: |r, v| r.rect.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cy as u32, set: |r, v| r.rect.cy = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.rop as u32, set: |r, v| r.rop = v as u8 },
    ];
}

impl DeltaRecord for PatBlt {
    const KIND: OrderKind = OrderKind::PatBlt;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.x as u32, set: |r, v| r.rect.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.y as u32, set: |r, v| r.rect.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cx as u32, set: |r, v| r.rect.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cy as u32, set: |r, v| r.rect.cy = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.rop as u32, set: |r, v| r.rop = v as u8 },
        FieldSpec { width: FieldWidth::U32, get: |r| r.back_color, set: |r, v| r.back_color = v },
        FieldSpec { width: FieldWidth::U32, get: |r| r.fore_color, set: |r, v| r.fore_color = v },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.org_x as u32, set: |r, v| r.brush.org_x = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.org_y as u32, set: |r, v| r.brush.org_y = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.style as u32, set: |r, v| r.brush.style = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.hatch as u32, set: |r, v| r.brush.hatch = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[0] as u32, set: |r, v| r.brush.extra[0] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[1] as u32, set: |r, v| r.brush.extra[1] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[2] as u32, set: |r, v| r.brush.extra[2] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[3] as u32, set: |r, v| r.brush.extra[3] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[4] as u32, set: |r, v| r.brush.extra[4] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[5] as u32, set: |r, v| r.brush.extra[5] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[6] as u32, set: |r, v| r.brush.extra[6] = v as u8 },
    ];
}

impl DeltaRecord for MemBlt {
    const KIND: OrderKind = OrderKind::MemBlt;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.x as u32, set: |r, v| r.rect.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.y as u32, set: |r, v| r.rect.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cx as u32, set: |r, v| r.rect.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.rect.cy as u32, set: |r, v| r.rect.cy = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.rop as u32, set: |r, v| r.rop = v as u8 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.src_x as u32, set: |r, v| r.src_x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.src_y as u32, set: |r, v| r.src_y = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.tier as u32, set: |r, v| r.tier = v as u8 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.slot as u32, set: |r, v| r.slot = v as u16 },
    ];
}

impl DeltaRecord for LineTo {
    const KIND: OrderKind = OrderKind::LineTo;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U16, get: |r| r.start_x as u32, set: |r, v| r.start_x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.start_y as u32, set: |r, v| r.start_y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.end_x as u32, set: |r, v| r.end_x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.end_y as u32, set: |r, v| r.end_y = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.back_mode as u32, set: |r, v| r.back_mode = v as u8 },
        FieldSpec { width: FieldWidth::U32, get: |r| r.back_color, set: |r, v| r.back_color = v },
        FieldSpec { width: FieldWidth::U8, get: |r| r.rop2 as u32, set: |r, v| r.rop2 = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.pen.style as u32, set: |r, v| r.pen.style = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.pen.width as u32, set: |r, v| r.pen.width = v as u8 },
        FieldSpec { width: FieldWidth::U32, get: |r| r.pen.color, set: |r, v| r.pen.color = v },
    ];
}

impl DeltaRecord for GlyphIndex {
    const KIND: OrderKind = OrderKind::GlyphIndex;
    const HAS_PAYLOAD: bool = true;
    const FIELDS: &'static [FieldSpec<Self>] = &[
        FieldSpec { width: FieldWidth::U32, get: |r| r.back_color, set: |r, v| r.back_color = v },
        FieldSpec { width: FieldWidth::U32, get: |r| r.fore_color, set: |r, v| r.fore_color = v },
        FieldSpec { width: FieldWidth::U16, get: |r| r.flags as u32, set: |r, v| r.flags = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.char_inc as u32, set: |r, v| r.char_inc = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.bk.x as u32, set: |r, v| r.bk.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.bk.y as u32, set: |r, v| r.bk.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.bk.cx as u32, set: |r, v| r.bk.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.bk.cy as u32, set: |r, v| r.bk.cy = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.op.x as u32, set: |r, v| r.op.x = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.op.y as u32, set: |r, v| r.op.y = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.op.cx as u32, set: |r, v| r.op.cx = v as u16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.op.cy as u32, set: |r, v| r.op.cy = v as u16 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.org_x as u32, set: |r, v| r.brush.org_x = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.org_y as u32, set: |r, v| r.brush.org_y = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.style as u32, set: |r, v| r.brush.style = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.hatch as u32, set: |r, v| r.brush.hatch = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[0] as u32, set: |r, v| r.brush.extra[0] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[1] as u32, set: |r, v| r.brush.extra[1] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[2] as u32, set: |r, v| r.brush.extra[2] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[3] as u32, set: |r, v| r.brush.extra[3] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[4] as u32, set: |r, v| r.brush.extra[4] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[5] as u32, set: |r, v| r.brush.extra[5] = v as u8 },
        FieldSpec { width: FieldWidth::U8, get: |r| r.brush.extra[6] as u32, set: |r, v| r.brush.extra[6] = v as u8 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.glyph_x as u16 as u32, set: |r, v| r.glyph_x = v as u16 as i16 },
        FieldSpec { width: FieldWidth::U16, get: |r| r.glyph_y as u16 as u32, set: |r, v| r.glyph_y = v as u16 as i16 },
    ];

    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn set_payload(&mut self, bytes: Vec<u8>) {
        self.data = bytes;
    }
}

/// Encode `next` as a compact delta against `last`, appending to `buf`.
///
/// Emits the kind tag, the presence mask, and only the changed fields.
/// An unchanged record still costs 5 bytes (tag + empty mask).
pub fn encode_delta<R: DeltaRecord>(buf: &mut Vec<u8>, last: &R, next: &R) -> Result<()> {
    buf.push(R::KIND.as_u8());
    let mask_pos = buf.len();
    buf.extend_from_slice(&[0u8; 4]);

    let mut mask = 0u32;
    for (i, field) in R::FIELDS.iter().enumerate() {
        let value = (field.get)(next);
        if value == (field.get)(last) {
            continue;
        }
        mask |= 1 << i;
        match field.width {
            FieldWidth::U8 => buf.push(value as u8),
            FieldWidth::U16 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
            FieldWidth::U32 => buf.extend_from_slice(&value.to_le_bytes()),
        }
    }

    if R::HAS_PAYLOAD && next.payload() != last.payload() {
        let payload = next.payload();
        if payload.len() > MAX_GLYPH_DATA {
            return Err(Error::MalformedRecord {
                detail: format!(
                    "variable payload of {} bytes exceeds the {MAX_GLYPH_DATA}-byte limit",
                    payload.len()
                ),
            });
        }
        mask |= 1 << R::FIELDS.len();
        buf.push(payload.len() as u8);
        buf.extend_from_slice(payload);
    }

    buf[mask_pos..mask_pos + 4].copy_from_slice(&mask.to_le_bytes());
    Ok(())
}

/// Decode one delta record into the resident last-emitted `record`.
///
/// The kind tag must already have been consumed by the dispatcher; `input`
/// starts at the presence mask and is advanced past the record.
pub fn decode_delta<R: DeltaRecord>(input: &mut &[u8], record: &mut R) -> Result<()> {
    let mask = read_u32(input)?;

    let mut known = (1u64 << R::FIELDS.len()) - 1;
    if R::HAS_PAYLOAD {
        known |= 1 << R::FIELDS.len();
    }
    if u64::from(mask) & !known != 0 {
        return Err(Error::MalformedRecord {
            detail: format!("presence mask {mask:#010x} has bits outside the {:?} field table", R::KIND),
        });
    }

    for (i, field) in R::FIELDS.iter().enumerate() {
        if mask & (1 << i) == 0 {
            continue;
        }
        let value = match field.width {
            FieldWidth::U8 => read_u8(input)? as u32,
            FieldWidth::U16 => read_u16(input)? as u32,
            FieldWidth::U32 => read_u32(input)?,
        };
        (field.set)(record, value);
    }

    if R::HAS_PAYLOAD && mask & (1 << R::FIELDS.len()) != 0 {
        let len = read_u8(input)? as usize;
        let bytes = take(input, len)?;
        record.set_payload(bytes.to_vec());
    }

    Ok(())
}

/// Worst-case encoded size of one record of `kind`, for batch reservation.
pub fn encoded_size_upper_bound(kind: OrderKind) -> usize {
    fn bound<R: DeltaRecord>() -> usize {
        let fields: usize = R::FIELDS.iter().map(|f| f.width.bytes()).sum();
        let payload = if R::HAS_PAYLOAD { 1 + MAX_GLYPH_DATA } else { 0 };
        1 + 4 + fields + payload
    }

    match kind {
        OrderKind::OpaqueRect => bound::<OpaqueRect>(),
        OrderKind::ScreenBlt => bound::<ScreenBlt>(),
        OrderKind::DestBlt => bound::<DestBlt>(),
        OrderKind::PatBlt => bound::<PatBlt>(),
        OrderKind::MemBlt => bound::<MemBlt>(),
        OrderKind::LineTo => bound::<LineTo>(),
        OrderKind::GlyphIndex => bound::<GlyphIndex>(),
    }
}

/// A cache-insert auxiliary record: full pixels destined for a cache slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInsert {
    /// Destination tier, or [`INLINE_TIER`] for the uncached escape
    pub tier: u8,
    /// Destination slot within the tier
    pub slot: u16,
    /// The bitmap payload
    pub bitmap: Bitmap,
}

impl CacheInsert {
    /// Exact encoded size of this record.
    pub fn encoded_size(&self) -> usize {
        // tag + tier + slot + width + height + bpp + len + pixels
        1 + 1 + 2 + 2 + 2 + 1 + 4 + self.bitmap.data.len()
    }
}

/// Encode a cache-insert record, appending to `buf`.
pub fn encode_cache_insert(buf: &mut Vec<u8>, record: &CacheInsert) {
    buf.push(CACHE_INSERT_TAG);
    buf.push(record.tier);
    buf.extend_from_slice(&record.slot.to_le_bytes());
    buf.extend_from_slice(&record.bitmap.width.to_le_bytes());
    buf.extend_from_slice(&record.bitmap.height.to_le_bytes());
    buf.push(record.bitmap.bpp);
    buf.extend_from_slice(&(record.bitmap.data.len() as u32).to_le_bytes());
    buf.extend_from_slice(&record.bitmap.data);
}

/// Decode one cache-insert record; the tag byte is already consumed.
pub fn decode_cache_insert(input: &mut &[u8]) -> Result<CacheInsert> {
    let tier = read_u8(input)?;
    let slot = read_u16(input)?;
    let width = read_u16(input)?;
    let height = read_u16(input)?;
    let bpp = read_u8(input)?;
    let len = read_u32(input)? as usize;
    let data = take(input, len)?.to_vec();
    Ok(CacheInsert {
        tier,
        slot,
        bitmap: Bitmap::new(width, height, bpp, data),
    })
}

/// The leading tag of one record in an Orders payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTag {
    /// A delta-encoded order record of the given kind
    Order(OrderKind),
    /// A cache-insert auxiliary record
    CacheInsert,
}

impl RecordTag {
    /// Read and classify the next record tag.
    pub fn read(input: &mut &[u8]) -> Result<Self> {
        let tag = read_u8(input)?;
        if tag == CACHE_INSERT_TAG {
            return Ok(RecordTag::CacheInsert);
        }
        OrderKind::from_u8(tag)
            .map(RecordTag::Order)
            .ok_or(Error::MalformedRecord {
                detail: format!("unknown record tag {tag:#04x}"),
            })
    }
}

// ── Slice readers ───────────────────────────────────────────────

/// Split `len` bytes off the front of `input`.
pub fn take<'a>(input: &mut &'a [u8], len: usize) -> Result<&'a [u8]> {
    if input.len() < len {
        return Err(Error::MalformedRecord {
            detail: format!("record truncated: need {len} bytes, have {}", input.len()),
        });
    }
    let (head, tail) = input.split_at(len);
    *input = tail;
    Ok(head)
}

/// Read one byte off the front of `input`.
pub fn read_u8(input: &mut &[u8]) -> Result<u8> {
    input.read_u8().map_err(|_| Error::MalformedRecord {
        detail: "record truncated reading u8".to_string(),
    })
}

/// Read a little-endian u16 off the front of `input`.
pub fn read_u16(input: &mut &[u8]) -> Result<u16> {
    input
        .read_u16::<LittleEndian>()
        .map_err(|_| Error::MalformedRecord {
            detail: "record truncated reading u16".to_string(),
        })
}

/// Read a little-endian u32 off the front of `input`.
pub fn read_u32(input: &mut &[u8]) -> Result<u32> {
    input
        .read_u32::<LittleEndian>()
        .map_err(|_| Error::MalformedRecord {
            detail: "record truncated reading u32".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use reel_core::{Brush, Pen, Rect};

    fn roundtrip<R: DeltaRecord + std::fmt::Debug>(last: &R, next: &R) -> R {
        let mut buf = Vec::new();
        encode_delta(&mut buf, last, next).unwrap();

        let mut input = &buf[..];
        assert_eq!(read_u8(&mut input).unwrap(), R::KIND.as_u8());
        let mut record = last.clone();
        decode_delta(&mut input, &mut record).unwrap();
        assert!(input.is_empty(), "decoder must consume the whole record");
        record
    }

    #[test]
    fn test_color_only_delta() {
        // Two same-geometry fills: the second record must carry only the
        // color field.
        let first = OpaqueRect {
            rect: Rect::new(0, 0, 10, 10),
            color: 0xFF0000,
        };
        let second = OpaqueRect {
            rect: Rect::new(0, 0, 10, 10),
            color: 0x00FF00,
        };

        let mut buf = Vec::new();
        encode_delta(&mut buf, &first, &second).unwrap();
        // tag + mask + one u32 color
        assert_eq!(buf.len(), 1 + 4 + 4);
        let mask = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(mask, 1 << 4, "only the color bit may be set");

        assert_eq!(roundtrip(&first, &second), second);
    }

    #[test]
    fn test_unchanged_record_is_five_bytes() {
        let rec = LineTo {
            start_x: 1,
            start_y: 2,
            end_x: 3,
            end_y: 4,
            back_mode: 1,
            back_color: 0xAABBCC,
            rop2: 13,
            pen: Pen { style: 0, width: 1, color: 0x112233 },
        };
        let mut buf = Vec::new();
        encode_delta(&mut buf, &rec, &rec).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(roundtrip(&rec, &rec), rec);
    }

    #[test]
    fn test_full_record_from_zeroed_state() {
        let next = PatBlt {
            rect: Rect::new(4, 8, 15, 16),
            rop: 0xF0,
            back_color: 0x0000FF,
            fore_color: 0x00FF00,
            brush: Brush {
                org_x: 1,
                org_y: 2,
                style: 3,
                hatch: 4,
                extra: [5, 6, 7, 8, 9, 10, 11],
            },
        };
        assert_eq!(roundtrip(&PatBlt::default(), &next), next);
    }

    #[test]
    fn test_glyph_payload_delta() {
        let last = GlyphIndex::default();
        let next = GlyphIndex {
            fore_color: 0xFFFFFF,
            data: vec![3, 1, 4, 1, 5],
            ..GlyphIndex::default()
        };
        assert_eq!(roundtrip(&last, &next), next);

        // Same payload again: the payload bit must not be set.
        let mut buf = Vec::new();
        encode_delta(&mut buf, &next, &next).unwrap();
        assert_eq!(buf.len(), 5);
    }

    #[test]
    fn test_oversized_glyph_payload_rejected() {
        let next = GlyphIndex {
            data: vec![0u8; 256],
            ..GlyphIndex::default()
        };
        let mut buf = Vec::new();
        assert!(encode_delta(&mut buf, &GlyphIndex::default(), &next).is_err());
    }

    #[test]
    fn test_stray_presence_bits_rejected() {
        let mut buf = Vec::new();
        encode_delta(&mut buf, &DestBlt::default(), &DestBlt::default()).unwrap();
        // DestBlt has 5 fields; flip bit 9.
        buf[2] |= 0x02;

        let mut input = &buf[1..];
        let mut record = DestBlt::default();
        assert!(decode_delta(&mut input, &mut record).is_err());
    }

    #[test]
    fn test_truncated_record_rejected() {
        let next = OpaqueRect {
            rect: Rect::new(1, 2, 3, 4),
            color: 0xABCDEF,
        };
        let mut buf = Vec::new();
        encode_delta(&mut buf, &OpaqueRect::default(), &next).unwrap();
        buf.truncate(buf.len() - 2);

        let mut input = &buf[1..];
        let mut record = OpaqueRect::default();
        assert!(decode_delta(&mut input, &mut record).is_err());
    }

    #[test]
    fn test_cache_insert_roundtrip() {
        let record = CacheInsert {
            tier: 2,
            slot: 17,
            bitmap: Bitmap::new(8, 8, 24, (0u8..192).collect()),
        };
        let mut buf = Vec::new();
        encode_cache_insert(&mut buf, &record);
        assert_eq!(buf.len(), record.encoded_size());

        let mut input = &buf[..];
        assert_eq!(RecordTag::read(&mut input).unwrap(), RecordTag::CacheInsert);
        let back = decode_cache_insert(&mut input).unwrap();
        assert!(input.is_empty());
        assert_eq!(back, record);
    }

    #[test]
    fn test_upper_bound_covers_worst_case() {
        // A record changing every field from a zeroed state must fit the
        // advertised bound.
        let next = GlyphIndex {
            back_color: 1,
            fore_color: 2,
            flags: 3,
            char_inc: 4,
            bk: Rect::new(1, 2, 3, 4),
            op: Rect::new(5, 6, 7, 8),
            brush: Brush {
                org_x: 1,
                org_y: 2,
                style: 3,
                hatch: 4,
                extra: [1, 2, 3, 4, 5, 6, 7],
            },
            glyph_x: -5,
            glyph_y: -9,
            data: vec![0xAA; MAX_GLYPH_DATA],
        };
        let mut buf = Vec::new();
        encode_delta(&mut buf, &GlyphIndex::default(), &next).unwrap();
        assert!(buf.len() <= encoded_size_upper_bound(OrderKind::GlyphIndex));
    }

    #[test]
    fn test_negative_glyph_origin_roundtrips() {
        let next = GlyphIndex {
            glyph_x: -123,
            glyph_y: i16::MIN,
            ..GlyphIndex::default()
        };
        assert_eq!(roundtrip(&GlyphIndex::default(), &next), next);
    }

    proptest! {
        #[test]
        fn prop_opaque_rect_roundtrip(
            lx in any::<u16>(), ly in any::<u16>(), lcx in any::<u16>(), lcy in any::<u16>(),
            lc in any::<u32>(),
            nx in any::<u16>(), ny in any::<u16>(), ncx in any::<u16>(), ncy in any::<u16>(),
            nc in any::<u32>(),
        ) {
            let last = OpaqueRect { rect: Rect::new(lx, ly, lcx, lcy), color: lc };
            let next = OpaqueRect { rect: Rect::new(nx, ny, ncx, ncy), color: nc };
            prop_assert_eq!(roundtrip(&last, &next), next);
        }

        #[test]
        fn prop_mem_blt_roundtrip(
            x in any::<u16>(), y in any::<u16>(), rop in any::<u8>(),
            sx in any::<u16>(), sy in any::<u16>(),
            tier in 0u8..4, slot in any::<u16>(),
        ) {
            let last = MemBlt::default();
            let next = MemBlt {
                rect: Rect::new(x, y, 16, 16),
                rop,
                src_x: sx,
                src_y: sy,
                tier,
                slot,
            };
            prop_assert_eq!(roundtrip(&last, &next), next);
        }

        #[test]
        fn prop_glyph_roundtrip(
            bc in any::<u32>(), fc in any::<u32>(),
            gx in any::<i16>(), gy in any::<i16>(),
            data in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let last = GlyphIndex::default();
            let next = GlyphIndex {
                back_color: bc,
                fore_color: fc,
                glyph_x: gx,
                glyph_y: gy,
                data,
                ..GlyphIndex::default()
            };
            prop_assert_eq!(roundtrip(&last, &next), next.clone());
        }
    }
}
