//! Video metadata types.
//!
//! [`VideoMetadata`] is read once when a decoder finishes loading (metadata
//! plus first decodable frame) and is cached for the lifetime of the
//! decoder.

use std::time::Duration;

use crate::utilities::whole_second_count;

/// Metadata for a decodable video.
///
/// # Example
///
/// ```no_run
/// use deepcheck::{FfmpegDecoder, FrameDecoder};
///
/// let decoder = FfmpegDecoder::open("input.mp4").unwrap();
/// let metadata = decoder.metadata();
/// println!("{}x{} for {:?}", metadata.width, metadata.height, metadata.duration);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Total duration. Zero when the container does not report one.
    pub duration: Duration,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
}

impl VideoMetadata {
    /// Number of per-second frames a complete extraction yields.
    pub fn expected_frame_count(&self) -> u64 {
        whole_second_count(self.duration)
    }
}
