//! Tier tables and the cache proper.

use tracing::{debug, trace};

use reel_core::{Bitmap, Error, Result, Signature};

/// Shape of one cache tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierConfig {
    /// Number of slots in the tier
    pub capacity: u16,
    /// Largest bitmap payload a slot accepts, in bytes
    pub slot_byte_size: u32,
    /// Whether this tier's signature table is persisted to disk
    pub persistent: bool,
}

impl TierConfig {
    /// Create a tier configuration.
    pub fn new(capacity: u16, slot_byte_size: u32, persistent: bool) -> Self {
        TierConfig {
            capacity,
            slot_byte_size,
            persistent,
        }
    }
}

/// The recorder's stock three-tier profile for a given color depth:
/// many small slots, many medium slots, and a large persistent tier for
/// full-tile regions.
pub fn recorder_profile(bpp: u8) -> Vec<TierConfig> {
    let bytes_per_pixel = (u32::from(bpp) + 7) / 8;
    vec![
        TierConfig::new(120, bytes_per_pixel * 16 * 16, false),
        TierConfig::new(120, bytes_per_pixel * 32 * 32, false),
        TierConfig::new(2553, bytes_per_pixel * 64 * 64, true),
    ]
}

/// Weak lookup key for a cached bitmap: tier id plus slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheRef {
    /// Tier id
    pub tier: u8,
    /// Slot index within the tier
    pub slot: u16,
}

/// Result of a [`BitmapCache::cache_bitmap`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// The bitmap was stored in a fresh or evicted slot; the caller must
    /// transmit the pixels before referencing the slot.
    Added,
    /// A slot with the same signature already existed; reference it as-is.
    AlreadyCached,
}

#[derive(Debug, Clone, Default)]
struct CacheSlot {
    signature: Signature,
    stamp: u32,
    bitmap: Option<Bitmap>,
}

impl CacheSlot {
    fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }
}

/// One capacity/slot-size class of the cache.
#[derive(Debug, Clone)]
pub struct CacheTier {
    config: TierConfig,
    slots: Vec<CacheSlot>,
    stamp_counter: u32,
}

impl CacheTier {
    fn new(config: TierConfig) -> Self {
        CacheTier {
            slots: vec![CacheSlot::default(); config.capacity as usize],
            stamp_counter: 0,
            config,
        }
    }

    fn find(&self, signature: Signature) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| !s.is_empty() && s.signature == signature)
    }

    /// First empty slot, else the least-recently-used one.
    ///
    /// The strict `<` comparison makes the lowest slot index win stamp
    /// ties, which keeps eviction deterministic across encoder restarts.
    fn victim(&self) -> usize {
        if let Some(empty) = self.slots.iter().position(CacheSlot::is_empty) {
            return empty;
        }
        let mut best = 0;
        for (i, slot) in self.slots.iter().enumerate().skip(1) {
            if slot.stamp < self.slots[best].stamp {
                best = i;
            }
        }
        best
    }

    fn touch(&mut self, index: usize) {
        self.stamp_counter = self.stamp_counter.wrapping_add(1);
        self.slots[index].stamp = self.stamp_counter;
    }
}

/// The multi-tier, signature-keyed bitmap cache.
///
/// Owned by exactly one capture session or replay reader; the tiers
/// exclusively own their slots' pixel buffers.
#[derive(Debug, Clone)]
pub struct BitmapCache {
    tiers: Vec<CacheTier>,
}

impl BitmapCache {
    /// Build a cache from tier configurations.
    ///
    /// The recording format addresses tiers by `u8` id in declaration
    /// order; a deployment uses a fixed set of three to five tiers (see
    /// [`recorder_profile`]).
    pub fn new(configs: &[TierConfig]) -> Self {
        BitmapCache {
            tiers: configs.iter().copied().map(CacheTier::new).collect(),
        }
    }

    /// Number of tiers.
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    /// Configuration of one tier.
    pub fn tier_config(&self, tier: u8) -> Option<TierConfig> {
        self.tiers.get(tier as usize).map(|t| t.config)
    }

    /// All tier configurations, in id order.
    pub fn configs(&self) -> Vec<TierConfig> {
        self.tiers.iter().map(|t| t.config).collect()
    }

    /// Choose the smallest tier whose slots fit `byte_size` bytes.
    ///
    /// Fails with [`Error::NoTierFits`] if none qualifies; the caller then
    /// sends the bitmap inline, uncached.
    pub fn select_tier(&self, byte_size: usize) -> Result<u8> {
        self.tiers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.config.slot_byte_size as usize >= byte_size)
            .min_by_key(|(_, t)| t.config.slot_byte_size)
            .map(|(i, _)| i as u8)
            .ok_or(Error::NoTierFits { byte_size })
    }

    /// Insert or look up a bitmap by content signature.
    ///
    /// A hit bumps the slot's recency stamp. A miss stores into the first
    /// empty slot, else evicts the least-recently-used slot. Deterministic
    /// given the call sequence, which the decoder relies on.
    pub fn cache_bitmap(&mut self, bitmap: &Bitmap) -> Result<(CacheRef, CacheOutcome)> {
        let tier_id = self.select_tier(bitmap.byte_size())?;
        let signature = bitmap.signature();
        let tier = &mut self.tiers[tier_id as usize];

        if let Some(index) = tier.find(signature) {
            tier.touch(index);
            // A signature seeded by import has no pixels yet; adopt them on
            // the first re-encounter so get() works on both sides.
            let slot = &mut tier.slots[index];
            if slot.bitmap.is_none() {
                slot.bitmap = Some(bitmap.clone());
            }
            trace!(tier = tier_id, slot = index, "bitmap cache hit");
            return Ok((
                CacheRef {
                    tier: tier_id,
                    slot: index as u16,
                },
                CacheOutcome::AlreadyCached,
            ));
        }

        let index = tier.victim();
        if !tier.slots[index].is_empty() {
            debug!(
                tier = tier_id,
                slot = index,
                stamp = tier.slots[index].stamp,
                "evicting least-recently-used cache slot"
            );
        }
        tier.slots[index] = CacheSlot {
            signature,
            stamp: 0,
            bitmap: Some(bitmap.clone()),
        };
        tier.touch(index);
        Ok((
            CacheRef {
                tier: tier_id,
                slot: index as u16,
            },
            CacheOutcome::Added,
        ))
    }

    /// Look up the pixels behind a cache reference.
    pub fn get(&self, tier: u8, slot: u16) -> Option<&Bitmap> {
        self.tiers
            .get(tier as usize)?
            .slots
            .get(slot as usize)?
            .bitmap
            .as_ref()
    }

    /// Place a bitmap directly into a slot (decoder side).
    ///
    /// Replay follows cache-insert records verbatim instead of running its
    /// own placement or eviction logic.
    pub fn insert_at(&mut self, tier: u8, slot: u16, bitmap: Bitmap) -> Result<()> {
        let tier_table = self
            .tiers
            .get_mut(tier as usize)
            .ok_or_else(|| Error::MalformedRecord {
                detail: format!("cache insert targets nonexistent tier {tier}"),
            })?;
        let entry = tier_table
            .slots
            .get_mut(slot as usize)
            .ok_or_else(|| Error::MalformedRecord {
                detail: format!("cache insert targets slot {slot} beyond tier {tier} capacity"),
            })?;
        entry.signature = bitmap.signature();
        entry.bitmap = Some(bitmap);
        tier_table.stamp_counter = tier_table.stamp_counter.wrapping_add(1);
        entry.stamp = tier_table.stamp_counter;
        Ok(())
    }

    /// Export one tier's signature table as `(signature, stamp)` pairs,
    /// one per slot index; empty slots export the all-zero signature.
    pub fn export_signatures(&self, tier: u8) -> Vec<(Signature, u32)> {
        self.tiers
            .get(tier as usize)
            .map(|t| t.slots.iter().map(|s| (s.signature, s.stamp)).collect())
            .unwrap_or_default()
    }

    /// Re-seed one tier's signature table without pixel data.
    ///
    /// Entries beyond the tier's capacity are ignored; missing entries
    /// leave their slots empty. The stamp counter resumes past the largest
    /// imported stamp. A later `cache_bitmap` of previously-seen content
    /// reports `AlreadyCached` against the seeded slot (and adopts the
    /// pixels); the reading side loads pixel bytes separately.
    pub fn import_signatures(&mut self, tier: u8, entries: &[(Signature, u32)]) {
        let Some(tier_table) = self.tiers.get_mut(tier as usize) else {
            return;
        };
        for slot in tier_table.slots.iter_mut() {
            *slot = CacheSlot::default();
        }
        let mut max_stamp = 0;
        for (index, (signature, stamp)) in entries.iter().enumerate() {
            if index >= tier_table.slots.len() {
                break;
            }
            tier_table.slots[index].signature = *signature;
            tier_table.slots[index].stamp = *stamp;
            max_stamp = max_stamp.max(*stamp);
        }
        tier_table.stamp_counter = max_stamp;
    }

    /// All resident bitmaps across all tiers, in (tier, slot) order.
    ///
    /// Breakpoints dump these as cache-insert records so a reader starting
    /// mid-stream can repopulate pixel data.
    pub fn resident_bitmaps(&self) -> impl Iterator<Item = (u8, u16, &Bitmap)> {
        self.tiers.iter().enumerate().flat_map(|(tier_id, tier)| {
            tier.slots.iter().enumerate().filter_map(move |(slot, s)| {
                s.bitmap.as_ref().map(|b| (tier_id as u8, slot as u16, b))
            })
        })
    }

    /// Clear every slot of every tier, keeping the tier shape.
    pub fn reset(&mut self) {
        for tier in &mut self.tiers {
            for slot in tier.slots.iter_mut() {
                *slot = CacheSlot::default();
            }
            tier.stamp_counter = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(fill: u8, len: usize) -> Bitmap {
        Bitmap::new(4, 4, 24, vec![fill; len])
    }

    fn small_cache(capacity: u16) -> BitmapCache {
        BitmapCache::new(&[
            TierConfig::new(capacity, 64, false),
            TierConfig::new(capacity, 1024, true),
        ])
    }

    #[test]
    fn test_select_smallest_fitting_tier() {
        let cache = small_cache(4);
        assert_eq!(cache.select_tier(48).unwrap(), 0);
        assert_eq!(cache.select_tier(64).unwrap(), 0);
        assert_eq!(cache.select_tier(65).unwrap(), 1);
        match cache.select_tier(2048) {
            Err(Error::NoTierFits { byte_size: 2048 }) => {}
            other => panic!("expected NoTierFits, got {other:?}"),
        }
    }

    #[test]
    fn test_cache_idempotence() {
        let mut cache = small_cache(3);
        let bmp = bitmap(0xAA, 48);

        let (first_ref, outcome) = cache.cache_bitmap(&bmp).unwrap();
        assert_eq!(outcome, CacheOutcome::Added);

        let (second_ref, outcome) = cache.cache_bitmap(&bmp).unwrap();
        assert_eq!(outcome, CacheOutcome::AlreadyCached);
        assert_eq!(first_ref, second_ref);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        // Insert capacity + 1 distinct bitmaps; exactly the least recently
        // used slot (the first) is evicted.
        let mut cache = small_cache(3);
        let refs: Vec<CacheRef> = (0..3)
            .map(|i| cache.cache_bitmap(&bitmap(i, 48)).unwrap().0)
            .collect();
        assert_eq!(refs[0].slot, 0);
        assert_eq!(refs[1].slot, 1);
        assert_eq!(refs[2].slot, 2);

        let (fourth, outcome) = cache.cache_bitmap(&bitmap(99, 48)).unwrap();
        assert_eq!(outcome, CacheOutcome::Added);
        assert_eq!(fourth.slot, 0, "the oldest slot must be the victim");

        // The slot for the 1st insertion now holds the 4th bitmap's content.
        assert_eq!(cache.get(0, 0).unwrap(), &bitmap(99, 48));
        assert_eq!(cache.get(0, 1).unwrap(), &bitmap(1, 48));
    }

    #[test]
    fn test_recency_bump_protects_hit_slots() {
        let mut cache = small_cache(3);
        for i in 0..3 {
            cache.cache_bitmap(&bitmap(i, 48)).unwrap();
        }
        // Touch slot 0; slot 1 becomes the LRU.
        cache.cache_bitmap(&bitmap(0, 48)).unwrap();

        let (evicted_into, _) = cache.cache_bitmap(&bitmap(50, 48)).unwrap();
        assert_eq!(evicted_into.slot, 1);
    }

    #[test]
    fn test_eviction_tie_break_lowest_slot() {
        let mut cache = small_cache(2);
        // Force equal stamps by importing a table where both slots carry
        // the same stamp value.
        let sig_a = bitmap(1, 48).signature();
        let sig_b = bitmap(2, 48).signature();
        cache.import_signatures(0, &[(sig_a, 7), (sig_b, 7)]);

        let (victim, outcome) = cache.cache_bitmap(&bitmap(9, 48)).unwrap();
        assert_eq!(outcome, CacheOutcome::Added);
        assert_eq!(victim.slot, 0, "equal stamps must evict the lowest slot");
    }

    #[test]
    fn test_import_reports_already_cached_and_adopts_pixels() {
        let mut writer = small_cache(4);
        let bmp = bitmap(0x5A, 40);
        let (orig_ref, _) = writer.cache_bitmap(&bmp).unwrap();
        let table = writer.export_signatures(0);

        let mut reader = small_cache(4);
        reader.import_signatures(0, &table);
        assert!(reader.get(orig_ref.tier, orig_ref.slot).is_none());

        let (seeded_ref, outcome) = reader.cache_bitmap(&bmp).unwrap();
        assert_eq!(outcome, CacheOutcome::AlreadyCached);
        assert_eq!(seeded_ref, orig_ref);
        assert_eq!(reader.get(orig_ref.tier, orig_ref.slot), Some(&bmp));
    }

    #[test]
    fn test_import_resumes_stamp_counter() {
        let mut cache = small_cache(2);
        let sig = bitmap(1, 48).signature();
        cache.import_signatures(0, &[(sig, 41)]);

        // The next insertion must stamp past the imported maximum, so the
        // imported slot stays more recent than nothing.
        let (r, _) = cache.cache_bitmap(&bitmap(2, 48)).unwrap();
        assert_eq!(r.slot, 1);
        assert_eq!(cache.export_signatures(0)[1].1, 42);
    }

    #[test]
    fn test_insert_at_and_get() {
        let mut cache = small_cache(4);
        let bmp = bitmap(0x11, 100);
        cache.insert_at(1, 3, bmp.clone()).unwrap();
        assert_eq!(cache.get(1, 3), Some(&bmp));
        assert!(cache.get(1, 2).is_none());
        assert!(cache.insert_at(9, 0, bmp.clone()).is_err());
        assert!(cache.insert_at(0, 99, bmp).is_err());
    }

    #[test]
    fn test_reset_clears_all_tiers() {
        let mut cache = small_cache(2);
        cache.cache_bitmap(&bitmap(1, 48)).unwrap();
        cache.cache_bitmap(&bitmap(2, 100)).unwrap();
        assert_eq!(cache.resident_bitmaps().count(), 2);

        cache.reset();
        assert_eq!(cache.resident_bitmaps().count(), 0);
        assert!(cache.get(0, 0).is_none());
    }

    #[test]
    fn test_recorder_profile_shape() {
        let tiers = recorder_profile(24);
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].slot_byte_size, 3 * 16 * 16);
        assert_eq!(tiers[2].capacity, 2553);
        assert!(tiers[2].persistent);
        assert!(!tiers[0].persistent);
    }
}
