//! On-disk persistence of cache signature tables.
//!
//! Persistent tiers write a sidecar file holding one `(lo: u32, hi: u32)`
//! little-endian pair per slot index; the all-zero pair denotes an empty
//! slot. Only the signature table is persisted — pixel data is re-fed by
//! the recording itself — and stamps restart at zero on import, so a
//! reloaded tier is ordered but cold.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;
use tracing::debug;

use reel_core::Signature;

use crate::tier::BitmapCache;

/// Errors from signature-table persistence.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file's entry count does not match the tier's capacity.
    #[error("signature file for tier {tier} is sized for {got} slots, expected {expected}")]
    WrongEntryCount {
        /// Tier the file was loaded for
        tier: u8,
        /// Slot count the tier expects
        expected: usize,
        /// Entries actually present
        got: usize,
    },
}

/// Sidecar filename for one tier's signature table.
pub fn table_path(dir: &Path, tier: u8) -> PathBuf {
    dir.join(format!("tier-{tier}.sig"))
}

/// Write one tier's signature table: `(lo, hi)` pairs in slot order.
pub fn write_table<W: Write>(writer: &mut W, table: &[(Signature, u32)]) -> Result<(), PersistError> {
    for (signature, _stamp) in table {
        writer.write_u32::<LittleEndian>(signature.lo)?;
        writer.write_u32::<LittleEndian>(signature.hi)?;
    }
    Ok(())
}

/// Read a signature table of exactly `capacity` entries.
///
/// Imported entries carry stamp 0: order survives, recency does not.
pub fn read_table<R: Read>(
    reader: &mut R,
    tier: u8,
    capacity: usize,
) -> Result<Vec<(Signature, u32)>, PersistError> {
    let mut table = Vec::with_capacity(capacity);
    for got in 0..capacity {
        let lo = match reader.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(PersistError::WrongEntryCount {
                    tier,
                    expected: capacity,
                    got,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let hi = reader.read_u32::<LittleEndian>()?;
        table.push((Signature::from_parts(lo, hi), 0));
    }
    // A longer file means the tier shape changed; refuse rather than
    // silently mis-seed slot indices.
    let mut probe = [0u8; 1];
    if reader.read(&mut probe)? != 0 {
        return Err(PersistError::WrongEntryCount {
            tier,
            expected: capacity,
            got: capacity + 1,
        });
    }
    Ok(table)
}

/// Persist the signature tables of every persistent tier under `dir`.
pub fn save_all(dir: &Path, cache: &BitmapCache) -> Result<(), PersistError> {
    for tier in 0..cache.tier_count() as u8 {
        let config = match cache.tier_config(tier) {
            Some(c) if c.persistent => c,
            _ => continue,
        };
        let path = table_path(dir, tier);
        let mut writer = BufWriter::new(File::create(&path)?);
        write_table(&mut writer, &cache.export_signatures(tier))?;
        writer.flush()?;
        debug!(tier, slots = config.capacity, path = %path.display(), "saved signature table");
    }
    Ok(())
}

/// Re-seed every persistent tier from the signature tables under `dir`.
///
/// Tiers whose sidecar file does not exist are left empty (first run).
pub fn load_all(dir: &Path, cache: &mut BitmapCache) -> Result<(), PersistError> {
    for tier in 0..cache.tier_count() as u8 {
        let config = match cache.tier_config(tier) {
            Some(c) if c.persistent => c,
            _ => continue,
        };
        let path = table_path(dir, tier);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);
        let table = read_table(&mut reader, tier, config.capacity as usize)?;
        cache.import_signatures(tier, &table);
        debug!(tier, path = %path.display(), "loaded signature table");
    }
    Ok(())
}
