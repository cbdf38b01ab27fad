//! Seekable video decoders.
//!
//! A [`FrameDecoder`] plays the role of an off-screen video element: it has
//! loaded metadata and a first frame by the time it exists, it can seek to
//! an offset, and after a successful seek it exposes exactly one current
//! picture. [`FfmpegDecoder`] is the FFmpeg-backed implementation, and
//! [`VideoBackend`] is the factory the [`Session`](crate::Session) uses to
//! open a decoder for a selected video.
//!
//! Decoders are created and driven on the extraction worker thread, so
//! they need not be [`Send`].

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    codec::{context::Context as CodecContext, decoder::Video as VideoDecoder},
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    Rational,
};
use image::{DynamicImage, RgbImage};

use crate::{
    error::DeepcheckError,
    ffmpeg::ensure_initialized,
    media::PlayableHandle,
    metadata::VideoMetadata,
    utilities::{
        container_start, duration_to_seek_timestamp, frame_to_rgb_buffer, pts_to_duration,
        pts_to_offset,
    },
};

/// A loaded, seekable video with a single current picture.
pub trait FrameDecoder {
    /// Metadata read when the decoder loaded.
    fn metadata(&self) -> &VideoMetadata;

    /// Seek to `offset` and make the picture shown there current.
    ///
    /// Returns only once the seek has landed on a decodable frame. An error
    /// means the media cannot be decoded at this offset (truncated or
    /// malformed input).
    fn seek(&mut self, offset: Duration) -> Result<(), DeepcheckError>;

    /// The picture currently displayed, if any frame has been decoded.
    fn current_frame(&self) -> Option<&DynamicImage>;
}

/// Opens decoders for playable handles.
///
/// Called on the extraction worker thread, after the session has already
/// switched to the new media.
pub trait VideoBackend: Send + Sync {
    /// Load `handle` up to its first decodable frame.
    fn open(&self, handle: &PlayableHandle) -> Result<Box<dyn FrameDecoder>, DeepcheckError>;
}

/// FFmpeg's `AV_NOPTS_VALUE`.
const NO_TIMESTAMP: i64 = i64::MIN;

/// [`VideoBackend`] that decodes with FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegBackend;

impl VideoBackend for FfmpegBackend {
    fn open(&self, handle: &PlayableHandle) -> Result<Box<dyn FrameDecoder>, DeepcheckError> {
        Ok(Box::new(FfmpegDecoder::open(handle.path())?))
    }
}

/// FFmpeg-backed [`FrameDecoder`].
///
/// Seeking goes to the nearest keyframe before the target and decodes
/// forward until the frame displayed at the target is reached.
pub struct FfmpegDecoder {
    input: Input,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    stream_index: usize,
    time_base: Rational,
    /// Stream PTS shown at offset zero.
    stream_start: Option<i64>,
    /// Container time of offset zero.
    container_start: Duration,
    metadata: VideoMetadata,
    current: Option<DynamicImage>,
    path: PathBuf,
}

impl FfmpegDecoder {
    /// Open `path` and decode its first frame.
    ///
    /// # Errors
    ///
    /// - [`DeepcheckError::FileOpen`] if FFmpeg cannot open the file.
    /// - [`DeepcheckError::NoVideoStream`] if it has no video.
    /// - [`DeepcheckError::MediaDecode`] if no first frame can be decoded.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DeepcheckError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video: {}", path.display());

        ensure_initialized()?;

        let input = ffmpeg_next::format::input(&path).map_err(|error| DeepcheckError::FileOpen {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        let (stream_index, time_base, stream_start, stream_duration, frames_per_second, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(DeepcheckError::NoVideoStream)?;

            let frame_rate = stream.avg_frame_rate();
            let frames_per_second = if frame_rate.denominator() != 0 {
                frame_rate.numerator() as f64 / frame_rate.denominator() as f64
            } else {
                0.0
            };

            let decoder_context = CodecContext::from_parameters(stream.parameters())?;
            let decoder = decoder_context.decoder().video()?;

            (
                stream.index(),
                stream.time_base(),
                stream.start_time(),
                stream.duration(),
                frames_per_second,
                decoder,
            )
        };

        // MPEG-TS/PS inputs commonly start well after zero.
        // SAFETY: `input` owns a valid, opened format context.
        let container_start = container_start(unsafe { (*input.as_ptr()).start_time });
        let stream_start = (stream_start != NO_TIMESTAMP).then_some(stream_start);

        // Container duration is in AV_TIME_BASE; fall back to the stream's.
        let container_duration = input.duration();
        let duration = if container_duration > 0 {
            Duration::from_micros(container_duration as u64)
        } else if stream_duration > 0 {
            pts_to_duration(stream_duration, time_base)
        } else {
            Duration::ZERO
        };

        let width = decoder.width();
        let height = decoder.height();
        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let scaler = ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            width,
            height,
            ScalingFlags::BILINEAR,
        )?;

        let mut this = Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            stream_start,
            container_start,
            metadata: VideoMetadata {
                width,
                height,
                duration,
                frames_per_second,
                codec,
            },
            current: None,
            path,
        };

        this.seek(Duration::ZERO).map_err(|error| {
            DeepcheckError::MediaDecode(format!("first frame unavailable: {error}"))
        })?;

        log::debug!(
            "Loaded {} ({}x{}, {:?})",
            this.path.display(),
            this.metadata.width,
            this.metadata.height,
            this.metadata.duration,
        );

        Ok(this)
    }

    /// Path the decoder was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Half a frame interval; frames whose timestamp falls this close to the
    /// target count as being displayed at it.
    fn tolerance(&self) -> Duration {
        if self.metadata.frames_per_second > 0.0 {
            Duration::from_secs_f64(0.5 / self.metadata.frames_per_second)
        } else {
            Duration::from_millis(1)
        }
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek(&mut self, offset: Duration) -> Result<(), DeepcheckError> {
        let threshold = offset.saturating_sub(self.tolerance());
        let target = duration_to_seek_timestamp(offset + self.container_start);

        let Self {
            input,
            decoder,
            scaler,
            stream_index,
            time_base,
            stream_start,
            metadata,
            current,
            ..
        } = self;

        input.seek(target, ..target)?;
        decoder.flush();

        let mut decoded_frame = VideoFrame::empty();

        for (stream, packet) in input.packets() {
            if stream.index() != *stream_index {
                continue;
            }

            decoder.send_packet(&packet)?;

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let pts = decoded_frame.timestamp().or(decoded_frame.pts()).unwrap_or(0);
                if pts_to_offset(pts, *stream_start, *time_base) >= threshold {
                    *current = Some(rasterize(scaler, &decoded_frame, metadata)?);
                    return Ok(());
                }
            }
        }

        decoder.send_eof()?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            let pts = decoded_frame.timestamp().or(decoded_frame.pts()).unwrap_or(0);
            if pts_to_offset(pts, *stream_start, *time_base) >= threshold {
                *current = Some(rasterize(scaler, &decoded_frame, metadata)?);
                return Ok(());
            }
        }

        Err(DeepcheckError::MediaDecode(format!(
            "no decodable frame at {offset:?}"
        )))
    }

    fn current_frame(&self) -> Option<&DynamicImage> {
        self.current.as_ref()
    }
}

/// Convert a decoded frame to an RGB image at the video's native size.
fn rasterize(
    scaler: &mut ScalingContext,
    decoded_frame: &VideoFrame,
    metadata: &VideoMetadata,
) -> Result<DynamicImage, DeepcheckError> {
    let mut rgb_frame = VideoFrame::empty();
    scaler.run(decoded_frame, &mut rgb_frame)?;

    let buffer = frame_to_rgb_buffer(&rgb_frame, metadata.width, metadata.height);
    let rgb_image = RgbImage::from_raw(metadata.width, metadata.height, buffer).ok_or_else(|| {
        DeepcheckError::MediaDecode("decoded frame has an unexpected size".to_string())
    })?;
    Ok(DynamicImage::ImageRgb8(rgb_image))
}
