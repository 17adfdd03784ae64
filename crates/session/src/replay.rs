//! The replay side: chunks in, reconstructed commands and state out.

use tracing::{debug, error};

use reel_cache::BitmapCache;
use reel_codec::{
    decode_cache_insert, decode_delta, decode_state, read_header, ChunkKind, DeltaRecord,
    RecordTag, CHUNK_HEADER_SIZE, INLINE_TIER,
};
use reel_core::{Bitmap, ByteSource, DrawCommand, DrawableSurface, Error, OrderKind, OrderState};

use crate::error::{Result, SessionError};
use crate::manifest::Manifest;
use crate::payload::{self, SessionMeta};

/// What one call to [`ReplayReader::next_event`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplayEvent {
    /// A `Meta` chunk: new logical segment, cache tiers rebuilt.
    Meta(SessionMeta),
    /// The logical timestamp advanced, microseconds.
    Timestamp(u64),
    /// A `SaveState` chunk overwrote the order-record state wholesale.
    StateRestored,
    /// An `Orders` chunk was applied; the count of records processed.
    Orders(u16),
    /// A `PartialImage` chunk was buffered.
    ImageProgress,
    /// A `LastImage` chunk completed a screenshot; the full encoded bytes.
    Image(Vec<u8>),
    /// A `Breakpoint` chunk re-seeded the cache signature tables.
    CacheTables,
    /// A `NextFileId` chunk switched to the manifest file at this index.
    FileSwitch(usize),
    /// The source delivered no further chunks.
    EndOfStream,
}

/// Reads a recording chunk by chunk, mirroring the capture session's state.
///
/// Any chunk stream must either start at position 0 of the first recording
/// file or at a breakpoint bundle's `Meta`+`SaveState` pair; breakpoints are
/// the only way to join mid-stream with consistent state.
pub struct ReplayReader<S, D> {
    source: S,
    consumer: D,
    manifest: Manifest,
    state: OrderState,
    cache: BitmapCache,
    meta: Option<SessionMeta>,
    timestamp: u64,
    file_index: usize,
    image_buf: Vec<u8>,
    inline_bitmap: Option<Bitmap>,
    offset: u64,
}

impl<S, D> ReplayReader<S, D>
where
    S: ByteSource,
    D: DrawableSurface,
{
    /// Open a reader over `source`, applying reconstructed commands to
    /// `consumer` and resolving `NextFileId` chunks through `manifest`.
    pub fn new(source: S, consumer: D, manifest: Manifest) -> Self {
        ReplayReader {
            source,
            consumer,
            manifest,
            state: OrderState::default(),
            cache: BitmapCache::new(&[]),
            meta: None,
            timestamp: 0,
            file_index: 0,
            image_buf: Vec::new(),
            inline_bitmap: None,
            offset: 0,
        }
    }

    /// The reconstructed last-emitted-record state.
    pub fn state(&self) -> &OrderState {
        &self.state
    }

    /// The reconstructed bitmap cache.
    pub fn cache(&self) -> &BitmapCache {
        &self.cache
    }

    /// Session parameters from the most recent `Meta` chunk.
    pub fn meta(&self) -> Option<&SessionMeta> {
        self.meta.as_ref()
    }

    /// Current logical timestamp in microseconds.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Index of the file currently being read.
    pub fn file_index(&self) -> usize {
        self.file_index
    }

    /// Byte offset within the current file.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// The consumer surface.
    pub fn consumer(&self) -> &D {
        &self.consumer
    }

    /// Consume the reader, yielding the consumer surface.
    pub fn into_consumer(self) -> D {
        self.consumer
    }

    /// Read and apply one chunk.
    ///
    /// Returns [`ReplayEvent::EndOfStream`] on clean end of input. Any
    /// failure stops playback at the last fully-applied chunk; the error is
    /// logged with the offset and kind where it occurred.
    pub fn next_event(&mut self) -> Result<ReplayEvent> {
        let chunk_start = self.offset;
        let header = match read_header(&mut self.source) {
            Ok(h) => h,
            Err(Error::TruncatedStream { got: 0, .. }) => return Ok(ReplayEvent::EndOfStream),
            Err(e) => {
                error!(offset = chunk_start, %e, "failed reading chunk header");
                return Err(e.into());
            }
        };
        self.offset += CHUNK_HEADER_SIZE as u64;

        let payload = self
            .source
            .receive(header.payload_len as usize)
            .map_err(|e| {
                error!(
                    offset = chunk_start,
                    kind = ?header.kind,
                    %e,
                    "failed reading chunk payload"
                );
                SessionError::from(e)
            })?;
        self.offset += u64::from(header.payload_len);

        self.dispatch(header.kind, &payload, header.record_count)
            .map_err(|e| {
                error!(offset = chunk_start, kind = ?header.kind, %e, "failed applying chunk");
                e
            })
    }

    /// Drive the reader until end of stream.
    pub fn run_to_end(&mut self) -> Result<()> {
        while self.next_event()? != ReplayEvent::EndOfStream {}
        Ok(())
    }

    // ── Chunk dispatch ──────────────────────────────────────────

    fn dispatch(&mut self, kind: ChunkKind, payload: &[u8], record_count: u16) -> Result<ReplayEvent> {
        match kind {
            ChunkKind::Meta => {
                let meta = payload::decode_meta(payload)?;
                debug!(width = meta.width, height = meta.height, "new session segment");
                self.cache = BitmapCache::new(&meta.tiers);
                self.state = OrderState::default();
                self.inline_bitmap = None;
                self.image_buf.clear();
                self.meta = Some(meta.clone());
                Ok(ReplayEvent::Meta(meta))
            }
            ChunkKind::Timestamp => {
                self.timestamp = payload::decode_timestamp(payload)?;
                Ok(ReplayEvent::Timestamp(self.timestamp))
            }
            ChunkKind::SaveState => {
                self.state = decode_state(payload)?;
                Ok(ReplayEvent::StateRestored)
            }
            ChunkKind::Orders => {
                self.apply_orders(payload, record_count)?;
                Ok(ReplayEvent::Orders(record_count))
            }
            ChunkKind::PartialImage => {
                self.image_buf.extend_from_slice(payload);
                Ok(ReplayEvent::ImageProgress)
            }
            ChunkKind::LastImage => {
                self.image_buf.extend_from_slice(payload);
                Ok(ReplayEvent::Image(std::mem::take(&mut self.image_buf)))
            }
            ChunkKind::Breakpoint => {
                payload::decode_cache_tables(payload, &mut self.cache)?;
                Ok(ReplayEvent::CacheTables)
            }
            ChunkKind::NextFileId => {
                let index = payload::decode_next_file(payload)? as usize;
                let filename = self
                    .manifest
                    .filename(index)
                    .ok_or(SessionError::ManifestIndex { index })?
                    .to_string();
                debug!(index, filename = %filename, "following continuation marker");
                self.source.rotate(&filename)?;
                self.file_index = index;
                self.offset = 0;
                Ok(ReplayEvent::FileSwitch(index))
            }
        }
    }

    fn apply_orders(&mut self, payload: &[u8], record_count: u16) -> Result<()> {
        let mut input = payload;
        for _ in 0..record_count {
            match RecordTag::read(&mut input)? {
                RecordTag::CacheInsert => {
                    let insert = decode_cache_insert(&mut input)?;
                    if insert.tier == INLINE_TIER {
                        self.inline_bitmap = Some(insert.bitmap);
                    } else {
                        self.cache.insert_at(insert.tier, insert.slot, insert.bitmap)?;
                    }
                }
                RecordTag::Order(kind) => {
                    let command = self.decode_order(kind, &mut input)?;
                    self.consumer.apply(&command);
                }
            }
        }
        if !input.is_empty() {
            return Err(Error::MalformedRecord {
                detail: format!("orders payload has {} trailing bytes", input.len()),
            }
            .into());
        }
        Ok(())
    }

    fn decode_order(&mut self, kind: OrderKind, input: &mut &[u8]) -> Result<DrawCommand> {
        fn merge<R: DeltaRecord>(input: &mut &[u8], record: &mut R) -> Result<R> {
            decode_delta(input, record)?;
            Ok(record.clone())
        }

        let command = match kind {
            OrderKind::OpaqueRect => {
                DrawCommand::OpaqueRect(merge(input, &mut self.state.opaque_rect)?)
            }
            OrderKind::ScreenBlt => {
                DrawCommand::ScreenBlt(merge(input, &mut self.state.screen_blt)?)
            }
            OrderKind::DestBlt => DrawCommand::DestBlt(merge(input, &mut self.state.dest_blt)?),
            OrderKind::PatBlt => DrawCommand::PatBlt(merge(input, &mut self.state.pat_blt)?),
            OrderKind::LineTo => DrawCommand::LineTo(merge(input, &mut self.state.line_to)?),
            OrderKind::GlyphIndex => {
                DrawCommand::GlyphIndex(merge(input, &mut self.state.glyph_index)?)
            }
            OrderKind::MemBlt => {
                let blt = merge(input, &mut self.state.mem_blt)?;
                let bitmap = if blt.tier == INLINE_TIER {
                    self.inline_bitmap.take()
                } else {
                    self.cache.get(blt.tier, blt.slot).cloned()
                };
                let bitmap = bitmap.ok_or(Error::DanglingCacheReference {
                    tier: blt.tier,
                    slot: blt.slot,
                })?;
                DrawCommand::MemBlt(blt, bitmap)
            }
        };
        Ok(command)
    }
}
