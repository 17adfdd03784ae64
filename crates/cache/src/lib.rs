//! Multi-tier bitmap cache for the capture/replay pipeline.
//!
//! A fixed set of independently sized slot tables maps a bitmap's content
//! signature to a `(tier, slot)` reference, letting the delta encoder
//! replace repeated bitmap payloads with 3-byte references. Tiering by size
//! bounds per-slot memory: small decorative glyphs and icons share a cheap
//! tier while full-tile screen regions use a larger, fewer-slot tier.
//!
//! # Design
//!
//! - Lookup is a signature scan of the one tier sized for the bitmap
//! - Eviction is least-recently-used by a per-tier monotone stamp counter,
//!   ties broken by lowest slot index
//! - Eviction runs only on the encoder; the decoder follows cache-insert
//!   records and never evicts, so determinism needs no cross-side
//!   coordination
//! - Each session owns its cache instance exclusively; there is no shared
//!   or process-wide cache state

pub mod persist;
mod tier;

pub use persist::PersistError;
pub use tier::{recorder_profile, BitmapCache, CacheOutcome, CacheRef, CacheTier, TierConfig};
