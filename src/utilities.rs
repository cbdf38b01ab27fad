//! Internal utility functions.
//!
//! Helpers for pixel-data copying and timestamp conversion shared by the
//! decoder and the extractor.

use std::time::Duration;

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from an RGB24 FFmpeg frame into a tightly-packed buffer.
///
/// FFmpeg frames frequently carry per-row padding (stride > width × 3).
/// The result can be passed directly to [`image::RgbImage::from_raw`].
pub(crate) fn frame_to_rgb_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let expected_stride = (width as usize) * 3;
    let data = video_frame.data(0);

    if stride == expected_stride {
        data[..expected_stride * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(expected_stride * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + expected_stride]);
        }
        buffer
    }
}

/// Convert a [`Duration`] to a seek timestamp in AV_TIME_BASE (microseconds).
///
/// `input_context.seek()` with no stream index expects container time.
pub(crate) fn duration_to_seek_timestamp(duration: Duration) -> i64 {
    duration.as_micros() as i64
}

/// Rescale a PTS value from the stream time base to a media offset.
///
/// Negative timestamps (pre-roll) clamp to zero.
pub(crate) fn pts_to_duration(pts: i64, time_base: Rational) -> Duration {
    let denominator = time_base.denominator() as f64;
    if denominator == 0.0 {
        return Duration::ZERO;
    }
    let seconds = pts as f64 * time_base.numerator() as f64 / denominator;
    Duration::from_secs_f64(seconds.max(0.0))
}

/// Rescale a stream PTS to a media offset measured from the stream's first
/// timestamp.
pub(crate) fn pts_to_offset(pts: i64, stream_start: Option<i64>, time_base: Rational) -> Duration {
    pts_to_duration(pts.saturating_sub(stream_start.unwrap_or(0)), time_base)
}

/// Container start time (AV_TIME_BASE) as a [`Duration`]; unset or negative
/// starts count as zero.
pub(crate) fn container_start(start_time: i64) -> Duration {
    u64::try_from(start_time).map(Duration::from_micros).unwrap_or(Duration::ZERO)
}

/// Number of whole-second offsets strictly before `duration`.
///
/// This is `ceil(duration)` in seconds: 0 s gives 0, 2.5 s gives 3, and an
/// exact 5 s gives 5 (offsets 0 through 4).
pub fn whole_second_count(duration: Duration) -> u64 {
    let whole = duration.as_secs();
    if duration.subsec_nanos() > 0 { whole + 1 } else { whole }
}
