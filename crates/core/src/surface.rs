//! Drawable-surface and image-codec collaborators.
//!
//! Pixel rendering and image compression are external concerns: the capture
//! session feeds commands to a [`DrawableSurface`] so breakpoints can embed
//! a screenshot, and hands the raw frame to an [`ImageCodec`] for encoding.
//! The replay reader mirrors this, applying reconstructed commands to a
//! consumer surface.

use crate::error::{Error, Result};
use crate::order::DrawCommand;

/// A raw screenshot: pixel bytes plus geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Width in pixels
    pub width: u16,
    /// Height in pixels
    pub height: u16,
    /// Bytes per row (may exceed `width * bytes_per_pixel` for alignment)
    pub row_stride: usize,
    /// Raw pixel bytes, row-major
    pub pixels: Vec<u8>,
}

/// A surface that drawing commands are applied to.
pub trait DrawableSurface {
    /// Apply one drawing command.
    fn apply(&mut self, command: &DrawCommand);

    /// Capture the current frame contents.
    fn snapshot(&self) -> Frame;
}

/// External image encoder/decoder used for breakpoint screenshots.
pub trait ImageCodec {
    /// Encode a frame into the recording's image format.
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>>;

    /// Decode image bytes back into a frame.
    fn decode(&self, bytes: &[u8]) -> Result<Frame>;
}

/// Identity codec: frames travel as a 12-byte geometry header plus raw
/// pixels, uncompressed.
///
/// Real deployments plug in a compressing codec; this one keeps recordings
/// self-contained without an external dependency and is byte-exact.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawImageCodec;

impl ImageCodec for RawImageCodec {
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(12 + frame.pixels.len());
        out.extend_from_slice(&frame.width.to_le_bytes());
        out.extend_from_slice(&frame.height.to_le_bytes());
        out.extend_from_slice(&(frame.row_stride as u32).to_le_bytes());
        out.extend_from_slice(&(frame.pixels.len() as u32).to_le_bytes());
        out.extend_from_slice(&frame.pixels);
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Frame> {
        if bytes.len() < 12 {
            return Err(Error::MalformedRecord {
                detail: format!("raw image header needs 12 bytes, got {}", bytes.len()),
            });
        }
        let width = u16::from_le_bytes([bytes[0], bytes[1]]);
        let height = u16::from_le_bytes([bytes[2], bytes[3]]);
        let row_stride = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        if bytes.len() < 12 + len {
            return Err(Error::MalformedRecord {
                detail: format!("raw image payload truncated: need {len}, got {}", bytes.len() - 12),
            });
        }
        Ok(Frame {
            width,
            height,
            row_stride,
            pixels: bytes[12..12 + len].to_vec(),
        })
    }
}
