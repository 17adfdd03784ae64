//! Wire codecs for the recording container format.
//!
//! Three layers, all little-endian:
//! - `chunk`: the fixed 8-byte chunk envelope prefixing every unit of the
//!   container
//! - `delta`: the per-kind field tables and the single generic routine that
//!   encodes/decodes compact order records against last-emitted state, plus
//!   the cache-insert auxiliary record
//! - `savestate`: wholesale serialization of the full last-emitted-record
//!   array for resynchronization points
//!
//! Byte-exact symmetry is the contract: whatever the encoder produces here,
//! the decoder reconstructs identically.

pub mod chunk;
pub mod delta;
pub mod savestate;

pub use chunk::{read_header, write_chunk, ChunkHeader, ChunkKind, CHUNK_HEADER_SIZE};
pub use delta::{
    decode_cache_insert, decode_delta, encode_cache_insert, encode_delta, encoded_size_upper_bound,
    read_u16, read_u32, read_u8, take, CacheInsert, DeltaRecord, FieldSpec, FieldWidth, RecordTag,
    CACHE_INSERT_TAG, INLINE_TIER,
};
pub use savestate::{decode_state, encode_state};
