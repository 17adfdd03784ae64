//! The chunk envelope: an 8-byte header prefixing every unit of the
//! container format.
//!
//! Wire layout, little-endian: `kind: u16`, `total_size: u32` (8 + payload
//! bytes), `record_count: u16`. Chunks are constructed immediately before a
//! write and consumed immediately after a read; they are never persisted as
//! objects, only as bytes.

use reel_core::{ByteSink, ByteSource, Error, Result};

/// Size of the chunk header on the wire.
pub const CHUNK_HEADER_SIZE: usize = 8;

/// Chunk kinds of the container format.
///
/// The values are fixed wire constants; renumbering breaks every existing
/// recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChunkKind {
    /// Batch of delta-encoded order records
    Orders = 1000,
    /// Wholesale last-emitted-record snapshot
    SaveState = 1001,
    /// Non-final slice of an embedded screenshot
    PartialImage = 1002,
    /// Final slice of an embedded screenshot
    LastImage = 1003,
    /// Cache resynchronization tables (signatures and stamps)
    Breakpoint = 1005,
    /// Session parameters: frame geometry and cache tier shape
    Meta = 1006,
    /// Continuation marker: index of the next file in the recording
    NextFileId = 1007,
    /// Logical timestamp update, microseconds
    Timestamp = 1008,
}

impl ChunkKind {
    /// Wire value of this kind.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Parse a wire value; `UnknownChunkKind` values return `None`.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(ChunkKind::Orders),
            1001 => Some(ChunkKind::SaveState),
            1002 => Some(ChunkKind::PartialImage),
            1003 => Some(ChunkKind::LastImage),
            1005 => Some(ChunkKind::Breakpoint),
            1006 => Some(ChunkKind::Meta),
            1007 => Some(ChunkKind::NextFileId),
            1008 => Some(ChunkKind::Timestamp),
            _ => None,
        }
    }
}

/// A decoded chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Chunk kind
    pub kind: ChunkKind,
    /// Payload bytes following the header
    pub payload_len: u32,
    /// Number of records in the payload (meaning depends on the kind)
    pub record_count: u16,
}

/// Emit one chunk: header then payload verbatim.
pub fn write_chunk(
    sink: &mut dyn ByteSink,
    kind: ChunkKind,
    payload: &[u8],
    record_count: u16,
) -> Result<()> {
    let mut header = Vec::with_capacity(CHUNK_HEADER_SIZE);
    header.extend_from_slice(&kind.as_u16().to_le_bytes());
    header.extend_from_slice(&((CHUNK_HEADER_SIZE + payload.len()) as u32).to_le_bytes());
    header.extend_from_slice(&record_count.to_le_bytes());

    sink.send(&header)?;
    sink.send(payload)?;
    Ok(())
}

/// Read exactly one chunk header.
///
/// Fails with [`Error::TruncatedStream`] if fewer than 8 bytes are
/// available. No validation of `payload_len` against source availability is
/// performed here; callers must bound subsequent reads.
pub fn read_header(source: &mut dyn ByteSource) -> Result<ChunkHeader> {
    let bytes = source.receive(CHUNK_HEADER_SIZE).map_err(|e| match e {
        Error::ShortRead { got, .. } => Error::TruncatedStream {
            needed: CHUNK_HEADER_SIZE,
            got,
        },
        other => other,
    })?;

    let raw_kind = u16::from_le_bytes([bytes[0], bytes[1]]);
    let total_size = u32::from_le_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
    let record_count = u16::from_le_bytes([bytes[6], bytes[7]]);

    let kind = ChunkKind::from_u16(raw_kind).ok_or(Error::UnknownChunkKind { kind: raw_kind })?;

    Ok(ChunkHeader {
        kind,
        payload_len: total_size.saturating_sub(CHUNK_HEADER_SIZE as u32),
        record_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::mem::{MemorySink, MemorySource};

    #[test]
    fn test_header_roundtrip() {
        let mut sink = MemorySink::new("t.rec");
        write_chunk(&mut sink, ChunkKind::Orders, b"payload", 3).unwrap();

        let segments = sink.into_segments();
        assert_eq!(segments[0].1.len(), CHUNK_HEADER_SIZE + 7);

        let mut source = MemorySource::new(segments);
        let header = read_header(&mut source).unwrap();
        assert_eq!(header.kind, ChunkKind::Orders);
        assert_eq!(header.payload_len, 7);
        assert_eq!(header.record_count, 3);
        assert_eq!(source.receive(7).unwrap(), b"payload");
    }

    #[test]
    fn test_empty_payload() {
        let mut sink = MemorySink::new("t.rec");
        write_chunk(&mut sink, ChunkKind::Breakpoint, &[], 0).unwrap();

        let mut source = MemorySource::new(sink.into_segments());
        let header = read_header(&mut source).unwrap();
        assert_eq!(header.kind, ChunkKind::Breakpoint);
        assert_eq!(header.payload_len, 0);
    }

    #[test]
    fn test_truncated_header() {
        let mut source = MemorySource::single(vec![0xE8, 0x03, 0x08]);
        match read_header(&mut source) {
            Err(Error::TruncatedStream { needed: 8, got: 3 }) => {}
            other => panic!("expected TruncatedStream, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_kind_is_fatal() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&9999u16.to_le_bytes());
        bytes.extend_from_slice(&8u32.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());

        let mut source = MemorySource::single(bytes);
        match read_header(&mut source) {
            Err(Error::UnknownChunkKind { kind: 9999 }) => {}
            other => panic!("expected UnknownChunkKind, got {other:?}"),
        }
    }

    #[test]
    fn test_kind_values_are_wire_constants() {
        // Renumbering breaks existing recordings; pin the values.
        assert_eq!(ChunkKind::Orders.as_u16(), 1000);
        assert_eq!(ChunkKind::SaveState.as_u16(), 1001);
        assert_eq!(ChunkKind::PartialImage.as_u16(), 1002);
        assert_eq!(ChunkKind::LastImage.as_u16(), 1003);
        assert_eq!(ChunkKind::Breakpoint.as_u16(), 1005);
        assert_eq!(ChunkKind::Meta.as_u16(), 1006);
        assert_eq!(ChunkKind::NextFileId.as_u16(), 1007);
        assert_eq!(ChunkKind::Timestamp.as_u16(), 1008);
        for kind in [
            ChunkKind::Orders,
            ChunkKind::SaveState,
            ChunkKind::PartialImage,
            ChunkKind::LastImage,
            ChunkKind::Breakpoint,
            ChunkKind::Meta,
            ChunkKind::NextFileId,
            ChunkKind::Timestamp,
        ] {
            assert_eq!(ChunkKind::from_u16(kind.as_u16()), Some(kind));
        }
        assert_eq!(ChunkKind::from_u16(1004), None);
    }
}
