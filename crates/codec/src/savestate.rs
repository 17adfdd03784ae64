//! Wholesale serialization of the last-emitted-record array.
//!
//! The `SaveState` chunk carries every field of every record at its fixed
//! width, in kind order, driven by the same field tables as the delta
//! codec. Decoding overwrites the decoder's [`OrderState`] wholesale; this
//! is the only way a reader jumps state without replaying prior history.

use reel_core::order::MAX_GLYPH_DATA;
use reel_core::{Error, OrderState, Result};

use crate::delta::{read_u16, read_u32, read_u8, take, DeltaRecord, FieldWidth};

fn write_record<R: DeltaRecord>(buf: &mut Vec<u8>, record: &R) -> Result<()> {
    for field in R::FIELDS {
        let value = (field.get)(record);
        match field.width {
            FieldWidth::U8 => buf.push(value as u8),
            FieldWidth::U16 => buf.extend_from_slice(&(value as u16).to_le_bytes()),
            FieldWidth::U32 => buf.extend_from_slice(&value.to_le_bytes()),
        }
    }
    if R::HAS_PAYLOAD {
        let payload = record.payload();
        if payload.len() > MAX_GLYPH_DATA {
            return Err(Error::MalformedRecord {
                detail: format!(
                    "save-state payload of {} bytes exceeds the {MAX_GLYPH_DATA}-byte limit",
                    payload.len()
                ),
            });
        }
        buf.push(payload.len() as u8);
        buf.extend_from_slice(payload);
    }
    Ok(())
}

fn read_record<R: DeltaRecord>(input: &mut &[u8], record: &mut R) -> Result<()> {
    for field in R::FIELDS {
        let value = match field.width {
            FieldWidth::U8 => read_u8(input)? as u32,
            FieldWidth::U16 => read_u16(input)? as u32,
            FieldWidth::U32 => read_u32(input)?,
        };
        (field.set)(record, value);
    }
    if R::HAS_PAYLOAD {
        let len = read_u8(input)? as usize;
        let bytes = take(input, len)?;
        record.set_payload(bytes.to_vec());
    }
    Ok(())
}

/// Serialize the full last-emitted-record array.
pub fn encode_state(state: &OrderState) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_record(&mut buf, &state.opaque_rect)?;
    write_record(&mut buf, &state.screen_blt)?;
    write_record(&mut buf, &state.dest_blt)?;
    write_record(&mut buf, &state.pat_blt)?;
    write_record(&mut buf, &state.mem_blt)?;
    write_record(&mut buf, &state.line_to)?;
    write_record(&mut buf, &state.glyph_index)?;
    Ok(buf)
}

/// Reconstruct a full last-emitted-record array from a `SaveState` payload.
///
/// Rejects trailing bytes: a save-state payload is exactly the seven
/// records, nothing more.
pub fn decode_state(payload: &[u8]) -> Result<OrderState> {
    let mut input = payload;
    let mut state = OrderState::default();
    read_record(&mut input, &mut state.opaque_rect)?;
    read_record(&mut input, &mut state.screen_blt)?;
    read_record(&mut input, &mut state.dest_blt)?;
    read_record(&mut input, &mut state.pat_blt)?;
    read_record(&mut input, &mut state.mem_blt)?;
    read_record(&mut input, &mut state.line_to)?;
    read_record(&mut input, &mut state.glyph_index)?;
    if !input.is_empty() {
        return Err(Error::MalformedRecord {
            detail: format!("save-state payload has {} trailing bytes", input.len()),
        });
    }
    Ok(state)
}
