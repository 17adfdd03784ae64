//! In-memory collaborator implementations.
//!
//! [`MemorySink`]/[`MemorySource`] keep a recording's segments as named byte
//! buffers, and [`CommandLog`] is a drawable surface that records the
//! commands applied to it. They back the test suites and any caller that
//! wants to capture or replay without touching the filesystem.

use crate::error::{Error, Result};
use crate::order::DrawCommand;
use crate::surface::{DrawableSurface, Frame};
use crate::transport::{ByteSink, ByteSource};

/// Default packet capacity for in-memory sinks.
const DEFAULT_CAPACITY: usize = 65536;

/// Byte sink writing into named in-memory segments.
///
/// `rotate` starts a new segment; finished segments stay readable so a
/// [`MemorySource`] can replay the whole recording.
#[derive(Debug)]
pub struct MemorySink {
    capacity: usize,
    segments: Vec<(String, Vec<u8>)>,
}

impl MemorySink {
    /// Create a sink writing to a first segment named `first`.
    pub fn new(first: &str) -> Self {
        Self::with_capacity(first, DEFAULT_CAPACITY)
    }

    /// Create a sink with an explicit packet capacity.
    pub fn with_capacity(first: &str, capacity: usize) -> Self {
        MemorySink {
            capacity,
            segments: vec![(first.to_string(), Vec::new())],
        }
    }

    /// All segments written so far, in rotation order.
    pub fn segments(&self) -> &[(String, Vec<u8>)] {
        &self.segments
    }

    /// Consume the sink, yielding its segments.
    pub fn into_segments(self) -> Vec<(String, Vec<u8>)> {
        self.segments
    }
}

impl ByteSink for MemorySink {
    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        // segments is never empty: constructed with one, rotate only appends
        self.segments
            .last_mut()
            .map(|(_, buf)| buf.extend_from_slice(bytes))
            .ok_or_else(|| {
                Error::Sink(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "sink has no open segment",
                ))
            })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn rotate(&mut self, next: &str) -> Result<()> {
        self.segments.push((next.to_string(), Vec::new()));
        Ok(())
    }
}

/// Byte source reading from named in-memory segments.
///
/// Reads never span segments; `rotate` switches to the named segment,
/// mirroring how a file-backed source opens the next recording file.
#[derive(Debug)]
pub struct MemorySource {
    segments: Vec<(String, Vec<u8>)>,
    current: usize,
    pos: usize,
}

impl MemorySource {
    /// Create a source over a set of named segments, starting at the first.
    pub fn new(segments: Vec<(String, Vec<u8>)>) -> Self {
        MemorySource {
            segments,
            current: 0,
            pos: 0,
        }
    }

    /// Create a source over one anonymous segment.
    pub fn single(bytes: Vec<u8>) -> Self {
        Self::new(vec![(String::new(), bytes)])
    }

    fn remaining(&self) -> usize {
        self.segments
            .get(self.current)
            .map_or(0, |(_, buf)| buf.len() - self.pos)
    }
}

impl ByteSource for MemorySource {
    fn receive(&mut self, len: usize) -> Result<Vec<u8>> {
        let available = self.remaining();
        if available < len {
            return Err(Error::ShortRead {
                asked: len,
                got: available,
            });
        }
        let (_, buf) = &self.segments[self.current];
        let out = buf[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(out)
    }

    fn rotate(&mut self, next: &str) -> Result<()> {
        let index = self
            .segments
            .iter()
            .position(|(name, _)| name == next)
            .ok_or_else(|| {
                Error::Source(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no segment named {next:?}"),
                ))
            })?;
        self.current = index;
        self.pos = 0;
        Ok(())
    }
}

/// Drawable surface that records applied commands and serves a fixed frame.
///
/// Stands in for a real framebuffer renderer: capture sessions use its
/// `snapshot` for breakpoint screenshots, replay readers use it as the
/// consumer and assert on the command log.
#[derive(Debug, Clone)]
pub struct CommandLog {
    commands: Vec<DrawCommand>,
    frame: Frame,
}

impl CommandLog {
    /// Create a surface with a zeroed 24-bit frame of the given geometry.
    pub fn new(width: u16, height: u16) -> Self {
        let row_stride = width as usize * 3;
        CommandLog {
            commands: Vec::new(),
            frame: Frame {
                width,
                height,
                row_stride,
                pixels: vec![0u8; row_stride * height as usize],
            },
        }
    }

    /// Create a surface serving the given frame from `snapshot`.
    pub fn with_frame(frame: Frame) -> Self {
        CommandLog {
            commands: Vec::new(),
            frame,
        }
    }

    /// Commands applied so far, in order.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }
}

impl DrawableSurface for CommandLog {
    fn apply(&mut self, command: &DrawCommand) {
        self.commands.push(command.clone());
    }

    fn snapshot(&self) -> Frame {
        self.frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_rotation_keeps_segments() {
        let mut sink = MemorySink::new("a.rec");
        sink.send(b"one").unwrap();
        sink.rotate("b.rec").unwrap();
        sink.send(b"two").unwrap();

        let segments = sink.into_segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0], ("a.rec".to_string(), b"one".to_vec()));
        assert_eq!(segments[1], ("b.rec".to_string(), b"two".to_vec()));
    }

    #[test]
    fn test_source_short_read_reports_remaining() {
        let mut source = MemorySource::single(vec![1, 2, 3]);
        assert_eq!(source.receive(2).unwrap(), vec![1, 2]);
        match source.receive(4) {
            Err(Error::ShortRead { asked: 4, got: 1 }) => {}
            other => panic!("expected ShortRead, got {other:?}"),
        }
    }

    #[test]
    fn test_source_rotate_by_name() {
        let mut source = MemorySource::new(vec![
            ("a.rec".to_string(), vec![1]),
            ("b.rec".to_string(), vec![2]),
        ]);
        assert_eq!(source.receive(1).unwrap(), vec![1]);
        source.rotate("b.rec").unwrap();
        assert_eq!(source.receive(1).unwrap(), vec![2]);
        assert!(source.rotate("missing.rec").is_err());
    }
}
