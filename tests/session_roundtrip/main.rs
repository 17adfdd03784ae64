//! End-to-end recording lifecycle: capture with the stock recorder profile,
//! breakpoints, file rotation, cache persistence, and full replay.

use reel::prelude::*;
use reel_cache::persist;
use reel_core::mem::{CommandLog, MemorySink, MemorySource};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn commands_for_frame(step: u16) -> Vec<DrawCommand> {
    vec![
        DrawCommand::OpaqueRect(OpaqueRect {
            rect: Rect::new(step, step, 32, 32),
            color: 0x101010 + u32::from(step),
        }),
        DrawCommand::LineTo(LineTo {
            start_x: step,
            start_y: 0,
            end_x: step + 100,
            end_y: 80,
            back_mode: 1,
            back_color: 0,
            rop2: 13,
            pen: Pen {
                style: 0,
                width: 1,
                color: 0x00FF00,
            },
        }),
        DrawCommand::MemBlt(
            MemBlt {
                rect: Rect::new(step, 64, 16, 16),
                rop: 0xCC,
                ..MemBlt::default()
            },
            Bitmap::new(16, 16, 24, vec![(step % 5) as u8; 768]),
        ),
        DrawCommand::GlyphIndex(GlyphIndex {
            fore_color: 0xE0E0E0,
            bk: Rect::new(step, 90, 120, 14),
            data: vec![1, 8, 2, 8, 3, 8, 4, 8],
            ..GlyphIndex::default()
        }),
    ]
}

#[test]
fn full_recording_lifecycle() {
    init_tracing();

    let config = CaptureConfig::recorder(640, 480, 24);
    let mut session = CaptureSession::new(
        config,
        MemorySink::new("rec-000.reel"),
        CommandLog::new(640, 480),
        RawImageCodec,
        "rec-000.reel",
    )
    .unwrap();

    // First segment: a few frames then a breakpoint.
    for frame in 0u16..5 {
        for command in commands_for_frame(frame) {
            session.draw(&command).unwrap();
        }
        session
            .advance_time(u64::from(frame + 1) * 16_667)
            .unwrap();
    }
    session.breakpoint().unwrap();

    // Rotate, then keep drawing into the second segment.
    session.next_file("rec-001.reel").unwrap();
    for frame in 5u16..8 {
        for command in commands_for_frame(frame) {
            session.draw(&command).unwrap();
        }
        session
            .advance_time(u64::from(frame + 1) * 16_667)
            .unwrap();
    }
    session.flush().unwrap();

    let capture_state = session.state().clone();
    let capture_residents: Vec<(u8, u16, Bitmap)> = session
        .cache()
        .resident_bitmaps()
        .map(|(t, s, b)| (t, s, b.clone()))
        .collect();

    let (sink, manifest) = session.close().unwrap();
    assert_eq!(manifest.len(), 2);
    assert_eq!(manifest.filename(1), Some("rec-001.reel"));
    assert!(manifest.files.iter().all(|f| f.end.is_some()));

    // Replay the whole recording as one logical stream.
    let mut reader = ReplayReader::new(
        MemorySource::new(sink.into_segments()),
        CommandLog::new(640, 480),
        manifest,
    );

    let mut images = 0;
    let mut switches = 0;
    loop {
        match reader.next_event().unwrap() {
            ReplayEvent::Image(bytes) => {
                images += 1;
                let frame = RawImageCodec.decode(&bytes).unwrap();
                assert_eq!(frame.width, 640);
                assert_eq!(frame.height, 480);
            }
            ReplayEvent::FileSwitch(index) => {
                switches += 1;
                assert_eq!(index, 1);
            }
            ReplayEvent::EndOfStream => break,
            _ => {}
        }
    }
    // One screenshot from the explicit breakpoint, one from the bundle that
    // opens the rotated file.
    assert_eq!(images, 2);
    assert_eq!(switches, 1);

    assert_eq!(reader.state(), &capture_state);
    // The final advance_time had nothing left to flush, so the last
    // transmitted timestamp is the one stamped on frame 7's orders.
    assert_eq!(reader.timestamp(), 7 * 16_667);

    let replay_residents: Vec<(u8, u16, Bitmap)> = reader
        .cache()
        .resident_bitmaps()
        .map(|(t, s, b)| (t, s, b.clone()))
        .collect();
    assert_eq!(replay_residents, capture_residents);

    // The consumer saw every drawn command: 8 frames x 4 commands.
    assert_eq!(reader.consumer().commands().len(), 8 * 4);
}

#[test]
fn persistent_tier_survives_across_recordings() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    let tile = Bitmap::new(64, 64, 24, vec![0x7E; 12288]);

    // First recording caches a large tile and persists signatures.
    let mut first = BitmapCache::new(&recorder_profile(24));
    let (tile_ref, outcome) = first.cache_bitmap(&tile).unwrap();
    assert_eq!(outcome, CacheOutcome::Added);
    assert_eq!(tile_ref.tier, 2, "full tiles land in the big tier");
    persist::save_all(dir.path(), &first).unwrap();

    // A later recording re-seeds from disk: the same content is already
    // known and keeps its slot, so the wire never re-carries the pixels.
    let mut second = BitmapCache::new(&recorder_profile(24));
    persist::load_all(dir.path(), &mut second).unwrap();
    let (seeded_ref, outcome) = second.cache_bitmap(&tile).unwrap();
    assert_eq!(outcome, CacheOutcome::AlreadyCached);
    assert_eq!(seeded_ref, tile_ref);
}

#[test]
fn unified_error_wraps_layer_failures() {
    init_tracing();

    let mut cache = BitmapCache::new(&[TierConfig::new(2, 64, false)]);
    let oversized = Bitmap::new(64, 64, 24, vec![0; 12288]);
    let err: reel::Error = cache.cache_bitmap(&oversized).unwrap_err().into();
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("no cache tier fits"));
}
