//! The capture side: drawing commands in, chunks out.

use tracing::{debug, error, warn};

use reel_cache::{recorder_profile, BitmapCache, CacheOutcome, TierConfig};
use reel_codec::{
    encode_cache_insert, encode_delta, encode_state, write_chunk, CacheInsert, ChunkKind,
    DeltaRecord, INLINE_TIER,
};
use reel_core::{
    Bitmap, ByteSink, DrawCommand, DrawableSurface, Error, ImageCodec, MemBlt, OrderState,
};

use crate::error::Result;
use crate::manifest::Manifest;
use crate::payload::{self, SessionMeta};

/// Hard ceiling on one order batch, regardless of sink capacity.
const MAX_PACKET: usize = 16384;

/// Reserved margin kept free in every batch.
const BATCH_MARGIN: usize = 100;

/// Maximum records per Orders chunk.
const MAX_BATCH_RECORDS: u16 = 4096;

/// Largest image payload per `PartialImage`/`LastImage` chunk.
const MAX_IMAGE_PAYLOAD: usize = 65536 - 8;

/// Static parameters of a capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
    /// Color depth in bits per pixel
    pub bpp: u8,
    /// Cache tier shape, in tier-id order
    pub tiers: Vec<TierConfig>,
}

impl CaptureConfig {
    /// The stock recorder configuration: three cache tiers sized for the
    /// given color depth, the largest persistent.
    pub fn recorder(width: u16, height: u16, bpp: u8) -> Self {
        CaptureConfig {
            width,
            height,
            bpp,
            tiers: recorder_profile(bpp),
        }
    }

    fn meta(&self) -> SessionMeta {
        SessionMeta {
            width: self.width,
            height: self.height,
            bpp: self.bpp,
            tiers: self.tiers.clone(),
        }
    }
}

/// Records a stream of drawing commands as chunks on a byte sink.
///
/// Two phases alternate: *accumulating* delta-encoded records into the
/// pending batch, and *flushing* the batch as one `Orders` chunk. Encoding
/// failures and sink failures are fatal; the session makes no partial-record
/// recovery and no retries.
pub struct CaptureSession<S, D, C> {
    config: CaptureConfig,
    sink: S,
    surface: D,
    image_codec: C,
    state: OrderState,
    cache: BitmapCache,
    batch: Vec<u8>,
    batch_count: u16,
    timestamp: u64,
    last_sent_timestamp: u64,
    manifest: Manifest,
}

impl<S, D, C> CaptureSession<S, D, C>
where
    S: ByteSink,
    D: DrawableSurface,
    C: ImageCodec,
{
    /// Open a capture session writing to `sink`, starting with a `Meta`
    /// chunk in the segment named `first_file`.
    pub fn new(
        config: CaptureConfig,
        sink: S,
        surface: D,
        image_codec: C,
        first_file: &str,
    ) -> Result<Self> {
        let cache = BitmapCache::new(&config.tiers);
        let mut session = CaptureSession {
            sink,
            surface,
            image_codec,
            state: OrderState::default(),
            cache,
            batch: Vec::new(),
            batch_count: 0,
            timestamp: 0,
            last_sent_timestamp: 0,
            manifest: Manifest::new(first_file),
            config,
        };
        session.send_meta_chunk()?;
        Ok(session)
    }

    /// The session's last-emitted-record state.
    pub fn state(&self) -> &OrderState {
        &self.state
    }

    /// The session's bitmap cache.
    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    /// The recording manifest built so far.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Current logical timestamp in microseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Record one drawing command.
    ///
    /// The command is delta-encoded into the pending batch (flushing first
    /// if it would not fit) and also applied to the drawable surface so
    /// breakpoint screenshots stay current. Fails with
    /// [`Error::RecordTooLarge`] if the record cannot fit even an empty
    /// batch.
    pub fn draw(&mut self, command: &DrawCommand) -> Result<()> {
        match command {
            DrawCommand::OpaqueRect(cmd) => self.push_order(cmd, |s| &mut s.opaque_rect)?,
            DrawCommand::ScreenBlt(cmd) => self.push_order(cmd, |s| &mut s.screen_blt)?,
            DrawCommand::DestBlt(cmd) => self.push_order(cmd, |s| &mut s.dest_blt)?,
            DrawCommand::PatBlt(cmd) => self.push_order(cmd, |s| &mut s.pat_blt)?,
            DrawCommand::MemBlt(cmd, bitmap) => self.draw_mem_blt(cmd, bitmap)?,
            DrawCommand::LineTo(cmd) => self.push_order(cmd, |s| &mut s.line_to)?,
            DrawCommand::GlyphIndex(cmd) => self.push_order(cmd, |s| &mut s.glyph_index)?,
        }
        self.surface.apply(command);
        Ok(())
    }

    /// Advance the logical timestamp.
    ///
    /// If time moved forward, the pending batch is flushed first (stamped
    /// with the time its commands were drawn) and the new timestamp takes
    /// effect for subsequent flushes. Idle periods generate no chunks; the
    /// timestamp is only transmitted once something flushes.
    pub fn advance_time(&mut self, micros: u64) -> Result<()> {
        if micros > self.timestamp {
            self.flush()?;
            self.timestamp = micros;
        }
        Ok(())
    }

    /// Flush the pending batch as a `Timestamp` (if time advanced) plus one
    /// `Orders` chunk. A no-op when nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        if self.batch_count == 0 {
            return Ok(());
        }
        self.send_timestamp_chunk(false)?;
        debug!(
            records = self.batch_count,
            bytes = self.batch.len(),
            "flushing orders chunk"
        );
        write_chunk(
            &mut self.sink,
            ChunkKind::Orders,
            &self.batch,
            self.batch_count,
        )?;
        self.batch.clear();
        self.batch_count = 0;
        Ok(())
    }

    /// Emit a self-contained resynchronization bundle.
    ///
    /// In order: `Meta`, `Timestamp`, `SaveState`, the screenshot as
    /// `PartialImage`* + `LastImage`, the `Breakpoint` cache tables, and an
    /// `Orders` chunk of cache-insert records re-feeding every resident
    /// bitmap. A reader starting at this bundle's `Meta` chunk reconstructs
    /// full state without earlier chunks.
    pub fn breakpoint(&mut self) -> Result<()> {
        self.flush()?;
        self.send_meta_chunk()?;
        self.send_timestamp_chunk(true)?;

        let state = encode_state(&self.state)?;
        write_chunk(&mut self.sink, ChunkKind::SaveState, &state, 1)?;

        self.send_image_chunks()?;

        let tables = payload::encode_cache_tables(&self.cache);
        write_chunk(&mut self.sink, ChunkKind::Breakpoint, &tables, 1)?;

        self.send_cache_dump()?;
        debug!("breakpoint bundle emitted");
        Ok(())
    }

    /// Rotate to the next recording file.
    ///
    /// Flushes, emits a `NextFileId` chunk naming the new manifest index,
    /// rotates the sink, registers `filename` in the manifest, and opens
    /// the new file with a full breakpoint bundle so it is independently
    /// replayable.
    pub fn next_file(&mut self, filename: &str) -> Result<()> {
        self.flush()?;
        let index = self.manifest.len() as u32;
        write_chunk(
            &mut self.sink,
            ChunkKind::NextFileId,
            &payload::encode_next_file(index),
            1,
        )?;
        self.sink.rotate(filename)?;
        self.manifest.push_file(filename);
        debug!(index, filename, "rotated recording file");
        self.breakpoint()
    }

    /// Finish the recording: final flush, close the manifest, and hand back
    /// the sink and manifest.
    pub fn close(mut self) -> Result<(S, Manifest)> {
        self.flush()?;
        self.manifest.finish();
        Ok((self.sink, self.manifest))
    }

    // ── Internals ───────────────────────────────────────────────

    fn push_order<R: DeltaRecord>(
        &mut self,
        next: &R,
        record: fn(&mut OrderState) -> &mut R,
    ) -> Result<()> {
        let mut scratch = Vec::new();
        encode_delta(&mut scratch, record(&mut self.state), next)?;
        self.reserve(scratch.len())?;
        self.batch.extend_from_slice(&scratch);
        self.batch_count += 1;
        *record(&mut self.state) = next.clone();
        Ok(())
    }

    fn draw_mem_blt(&mut self, cmd: &MemBlt, bitmap: &Bitmap) -> Result<()> {
        let (tier, slot) = match self.cache.cache_bitmap(bitmap) {
            Ok((r, CacheOutcome::Added)) => {
                // Insert-before-first-reference: the pixels must be on the
                // wire ahead of the blit that points at them.
                self.push_cache_insert(&CacheInsert {
                    tier: r.tier,
                    slot: r.slot,
                    bitmap: bitmap.clone(),
                })?;
                (r.tier, r.slot)
            }
            Ok((r, CacheOutcome::AlreadyCached)) => (r.tier, r.slot),
            Err(e @ Error::NoTierFits { .. }) => {
                warn!(%e, "sending bitmap inline, uncached");
                self.push_cache_insert(&CacheInsert {
                    tier: INLINE_TIER,
                    slot: 0,
                    bitmap: bitmap.clone(),
                })?;
                (INLINE_TIER, 0)
            }
            Err(e) => return Err(e.into()),
        };

        let mut wire = cmd.clone();
        wire.tier = tier;
        wire.slot = slot;
        self.push_order(&wire, |s| &mut s.mem_blt)
    }

    fn push_cache_insert(&mut self, insert: &CacheInsert) -> Result<()> {
        let mut scratch = Vec::new();
        encode_cache_insert(&mut scratch, insert);
        self.reserve(scratch.len())?;
        self.batch.extend_from_slice(&scratch);
        self.batch_count += 1;
        Ok(())
    }

    /// Check that one more record of `asked` bytes fits the batch; flush
    /// first if not.
    fn reserve(&mut self, asked: usize) -> Result<()> {
        let max_packet = self.sink.capacity().min(MAX_PACKET);
        if asked + BATCH_MARGIN > max_packet {
            error!(
                size = asked + BATCH_MARGIN,
                capacity = max_packet,
                "record cannot fit an empty batch"
            );
            return Err(Error::RecordTooLarge {
                size: asked + BATCH_MARGIN,
                capacity: max_packet,
            }
            .into());
        }
        if self.batch_count >= MAX_BATCH_RECORDS
            || self.batch.len() + asked + BATCH_MARGIN > max_packet
        {
            self.flush()?;
        }
        Ok(())
    }

    fn send_meta_chunk(&mut self) -> Result<()> {
        let meta = payload::encode_meta(&self.config.meta());
        write_chunk(&mut self.sink, ChunkKind::Meta, &meta, 1)?;
        Ok(())
    }

    fn send_timestamp_chunk(&mut self, force: bool) -> Result<()> {
        if force || self.timestamp > self.last_sent_timestamp {
            write_chunk(
                &mut self.sink,
                ChunkKind::Timestamp,
                &payload::encode_timestamp(self.timestamp),
                1,
            )?;
            self.last_sent_timestamp = self.timestamp;
        }
        Ok(())
    }

    fn send_image_chunks(&mut self) -> Result<()> {
        let frame = self.surface.snapshot();
        let encoded = self.image_codec.encode(&frame)?;
        let mut rest = &encoded[..];
        while rest.len() > MAX_IMAGE_PAYLOAD {
            let (head, tail) = rest.split_at(MAX_IMAGE_PAYLOAD);
            write_chunk(&mut self.sink, ChunkKind::PartialImage, head, 1)?;
            rest = tail;
        }
        write_chunk(&mut self.sink, ChunkKind::LastImage, rest, 1)?;
        Ok(())
    }

    /// Re-feed every resident cached bitmap as cache-insert records so a
    /// reader joining at the breakpoint can repopulate pixel data.
    fn send_cache_dump(&mut self) -> Result<()> {
        let inserts: Vec<CacheInsert> = self
            .cache
            .resident_bitmaps()
            .map(|(tier, slot, bitmap)| CacheInsert {
                tier,
                slot,
                bitmap: bitmap.clone(),
            })
            .collect();
        for insert in &inserts {
            self.push_cache_insert(insert)?;
        }
        self.flush()
    }
}
