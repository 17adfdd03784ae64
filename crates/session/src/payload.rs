//! Payload codecs for the session-level chunk kinds.
//!
//! `Orders` and `SaveState` payloads are handled by `reel-codec`; this
//! module covers the rest: `Meta` (frame geometry + tier shape),
//! `Timestamp`, `NextFileId`, and the `Breakpoint` cache resync tables.

use reel_cache::{BitmapCache, TierConfig};
use reel_codec::{read_u16, read_u32, read_u8};
use reel_core::{Error, Result, Signature};

/// Global session parameters carried by a `Meta` chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMeta {
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
    /// Color depth in bits per pixel
    pub bpp: u8,
    /// Cache tier shape, in tier-id order
    pub tiers: Vec<TierConfig>,
}

/// Encode a `Meta` payload.
///
/// The persistent flag is a writer-side concern and does not travel;
/// decoded tiers come back non-persistent.
pub fn encode_meta(meta: &SessionMeta) -> Vec<u8> {
    let mut buf = Vec::with_capacity(7 + meta.tiers.len() * 6);
    buf.extend_from_slice(&meta.width.to_le_bytes());
    buf.extend_from_slice(&meta.height.to_le_bytes());
    buf.extend_from_slice(&u16::from(meta.bpp).to_le_bytes());
    buf.push(meta.tiers.len() as u8);
    for tier in &meta.tiers {
        buf.extend_from_slice(&tier.capacity.to_le_bytes());
        buf.extend_from_slice(&tier.slot_byte_size.to_le_bytes());
    }
    buf
}

/// Decode a `Meta` payload.
pub fn decode_meta(payload: &[u8]) -> Result<SessionMeta> {
    let mut input = payload;
    let width = read_u16(&mut input)?;
    let height = read_u16(&mut input)?;
    let bpp = read_u16(&mut input)? as u8;
    let tier_count = read_u8(&mut input)? as usize;
    let mut tiers = Vec::with_capacity(tier_count);
    for _ in 0..tier_count {
        let capacity = read_u16(&mut input)?;
        let slot_byte_size = read_u32(&mut input)?;
        tiers.push(TierConfig::new(capacity, slot_byte_size, false));
    }
    if !input.is_empty() {
        return Err(Error::MalformedRecord {
            detail: format!("meta payload has {} trailing bytes", input.len()),
        });
    }
    Ok(SessionMeta {
        width,
        height,
        bpp,
        tiers,
    })
}

/// Encode a `Timestamp` payload: microseconds, u64 LE.
pub fn encode_timestamp(micros: u64) -> [u8; 8] {
    micros.to_le_bytes()
}

/// Decode a `Timestamp` payload.
pub fn decode_timestamp(payload: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| Error::MalformedRecord {
        detail: format!("timestamp payload must be 8 bytes, got {}", payload.len()),
    })?;
    Ok(u64::from_le_bytes(bytes))
}

/// Encode a `NextFileId` payload: a zero-based manifest index, u32 LE.
pub fn encode_next_file(index: u32) -> [u8; 4] {
    index.to_le_bytes()
}

/// Decode a `NextFileId` payload.
pub fn decode_next_file(payload: &[u8]) -> Result<u32> {
    let bytes: [u8; 4] = payload.try_into().map_err(|_| Error::MalformedRecord {
        detail: format!("next-file payload must be 4 bytes, got {}", payload.len()),
    })?;
    Ok(u32::from_le_bytes(bytes))
}

/// Encode the `Breakpoint` cache resync tables.
///
/// Per persistent tier: tier id, slot count, then one
/// `(lo, hi, stamp)` triple per slot. Non-persistent tiers are omitted;
/// their contents ride the cache-insert dump that follows a breakpoint.
pub fn encode_cache_tables(cache: &BitmapCache) -> Vec<u8> {
    let persistent: Vec<u8> = (0..cache.tier_count() as u8)
        .filter(|&t| cache.tier_config(t).is_some_and(|c| c.persistent))
        .collect();

    let mut buf = Vec::new();
    buf.push(persistent.len() as u8);
    for tier in persistent {
        let table = cache.export_signatures(tier);
        buf.push(tier);
        buf.extend_from_slice(&(table.len() as u16).to_le_bytes());
        for (signature, stamp) in table {
            buf.extend_from_slice(&signature.lo.to_le_bytes());
            buf.extend_from_slice(&signature.hi.to_le_bytes());
            buf.extend_from_slice(&stamp.to_le_bytes());
        }
    }
    buf
}

/// Decode `Breakpoint` cache resync tables into the reader's cache.
pub fn decode_cache_tables(payload: &[u8], cache: &mut BitmapCache) -> Result<()> {
    let mut input = payload;
    let tier_count = read_u8(&mut input)? as usize;
    for _ in 0..tier_count {
        let tier = read_u8(&mut input)?;
        let slots = read_u16(&mut input)? as usize;
        let mut table = Vec::with_capacity(slots);
        for _ in 0..slots {
            let lo = read_u32(&mut input)?;
            let hi = read_u32(&mut input)?;
            let stamp = read_u32(&mut input)?;
            table.push((Signature::from_parts(lo, hi), stamp));
        }
        cache.import_signatures(tier, &table);
    }
    if !input.is_empty() {
        return Err(Error::MalformedRecord {
            detail: format!("cache table payload has {} trailing bytes", input.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reel_core::Bitmap;

    #[test]
    fn test_meta_roundtrip() {
        let meta = SessionMeta {
            width: 1024,
            height: 768,
            bpp: 24,
            tiers: vec![
                TierConfig::new(120, 768, false),
                TierConfig::new(2553, 12288, false),
            ],
        };
        let bytes = encode_meta(&meta);
        assert_eq!(decode_meta(&bytes).unwrap(), meta);
    }

    #[test]
    fn test_meta_trailing_bytes_rejected() {
        let meta = SessionMeta {
            width: 10,
            height: 10,
            bpp: 16,
            tiers: vec![],
        };
        let mut bytes = encode_meta(&meta);
        bytes.push(0);
        assert!(decode_meta(&bytes).is_err());
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let bytes = encode_timestamp(1_234_567_890_123);
        assert_eq!(decode_timestamp(&bytes).unwrap(), 1_234_567_890_123);
        assert!(decode_timestamp(&bytes[..7]).is_err());
    }

    #[test]
    fn test_next_file_roundtrip() {
        let bytes = encode_next_file(3);
        assert_eq!(decode_next_file(&bytes).unwrap(), 3);
        assert!(decode_next_file(&[1, 2]).is_err());
    }

    #[test]
    fn test_cache_tables_roundtrip() {
        let configs = [
            TierConfig::new(2, 64, false),
            TierConfig::new(3, 1024, true),
        ];
        let mut writer = BitmapCache::new(&configs);
        let bmp = Bitmap::new(8, 8, 24, vec![0x77; 192]);
        let (r, _) = writer.cache_bitmap(&bmp).unwrap();
        assert_eq!(r.tier, 1);

        let bytes = encode_cache_tables(&writer);
        let mut reader = BitmapCache::new(&configs);
        decode_cache_tables(&bytes, &mut reader).unwrap();

        assert_eq!(
            reader.export_signatures(1),
            writer.export_signatures(1),
            "signatures and stamps must survive the wire"
        );
        // Non-persistent tiers are not carried.
        assert!(reader.export_signatures(0).iter().all(|(s, _)| s.is_empty()));
    }
}
