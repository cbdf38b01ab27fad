//! Per-second frame extraction.
//!
//! [`FrameExtractor`] walks a loaded [`FrameDecoder`] one whole second at a
//! time: seek, wait for the seek to land, rasterize the current picture at
//! the video's native size, encode it, append it, advance. Each step
//! finishes before the next seek is issued, so the sequence is always in
//! time order.
//!
//! Failures never escape as errors. A seek that cannot land ends the run
//! with [`ExtractionOutcome::Truncated`] and leaves the frames captured so
//! far in place; a video that cannot be opened at all ends with
//! [`ExtractionOutcome::Unreadable`] and an empty sequence.
//!
//! # Example
//!
//! ```no_run
//! use deepcheck::{ExtractOptions, FfmpegDecoder, extract_frames};
//!
//! let mut decoder = FfmpegDecoder::open("input.mp4").unwrap();
//! let (frames, report) = extract_frames(&mut decoder, &ExtractOptions::new());
//! println!("{} frames, {:?}", frames.len(), report.outcome);
//! ```

use std::time::Duration;

use image::{DynamicImage, imageops::FilterType};

use crate::{
    configuration::ExtractOptions,
    decoder::{FrameDecoder, VideoBackend},
    error::DeepcheckError,
    frame::{Frame, FrameSequence},
    media::PlayableHandle,
    metadata::VideoMetadata,
    progress::{OperationType, ProgressTracker},
};

/// How an extraction run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExtractionOutcome {
    /// Every whole second before the end of the video was captured.
    Completed,
    /// A seek or capture failed; frames before `at` were kept.
    Truncated {
        /// Offset that could not be captured.
        at: Duration,
        /// Decoder's explanation.
        reason: String,
    },
    /// The session moved on, or the cancellation token fired.
    Abandoned,
    /// The video could not be loaded; nothing was captured.
    Unreadable {
        /// Decoder's explanation.
        reason: String,
    },
    /// The configured frame cap was reached.
    Capped,
}

/// Summary of one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Generation the run captured for.
    pub generation: u64,
    /// Frames appended to the sequence.
    pub captured: u64,
    /// Frames a complete run would have appended, once the duration is known.
    pub expected: Option<u64>,
    /// Why the run stopped.
    pub outcome: ExtractionOutcome,
}

impl ExtractionReport {
    /// Returns `true` if every expected frame was captured.
    pub fn is_complete(&self) -> bool {
        self.outcome == ExtractionOutcome::Completed
    }
}

/// Drives one extraction run into a [`FrameSequence`].
pub struct FrameExtractor<'a> {
    sequence: &'a FrameSequence,
    generation: u64,
    options: &'a ExtractOptions,
}

impl<'a> FrameExtractor<'a> {
    /// Capture into `sequence` on behalf of `generation`.
    pub fn new(sequence: &'a FrameSequence, generation: u64, options: &'a ExtractOptions) -> Self {
        Self {
            sequence,
            generation,
            options,
        }
    }

    fn is_abandoned(&self) -> bool {
        self.options.is_cancelled() || !self.sequence.is_current(self.generation)
    }

    /// Open `handle` through `backend`, then [`run`](FrameExtractor::run).
    pub fn open_and_run(
        &self,
        backend: &dyn VideoBackend,
        handle: &PlayableHandle,
    ) -> ExtractionReport {
        if self.is_abandoned() {
            return self.report(0, None, ExtractionOutcome::Abandoned);
        }

        match backend.open(handle) {
            Ok(mut decoder) => self.run(decoder.as_mut()),
            Err(error) => {
                log::warn!("Video could not be loaded, no preview frames: {error}");
                self.report(
                    0,
                    None,
                    ExtractionOutcome::Unreadable {
                        reason: error.to_string(),
                    },
                )
            }
        }
    }

    /// Capture one frame per whole second of `decoder`'s video.
    ///
    /// The decoder must already have loaded its first frame.
    pub fn run(&self, decoder: &mut dyn FrameDecoder) -> ExtractionReport {
        let metadata = decoder.metadata().clone();
        let expected = metadata.expected_frame_count();
        let mut tracker = ProgressTracker::new(
            self.options.progress.clone(),
            OperationType::FrameExtraction,
            Some(expected),
            self.options.batch_size,
        );

        log::debug!(
            "Extracting {expected} frame(s) from {:?} of video (generation {})",
            metadata.duration,
            self.generation
        );

        let mut captured = 0_u64;
        let mut second = 0_u64;

        let outcome = loop {
            let offset = Duration::from_secs(second);
            if offset >= metadata.duration {
                break ExtractionOutcome::Completed;
            }
            if self.options.max_frames.is_some_and(|limit| captured >= limit) {
                break ExtractionOutcome::Capped;
            }
            if self.is_abandoned() {
                break ExtractionOutcome::Abandoned;
            }

            let attempt = match decoder.seek(offset) {
                Ok(()) => self.capture(&*decoder, offset, &metadata),
                Err(error) => Err(error),
            };

            let frame = match attempt {
                Ok(frame) => frame,
                Err(error) => {
                    log::warn!("Frame extraction stopped at {offset:?}: {error}");
                    break ExtractionOutcome::Truncated {
                        at: offset,
                        reason: error.to_string(),
                    };
                }
            };

            if !self.sequence.push(self.generation, frame) {
                log::debug!("Dropped frame at {offset:?} for stale generation {}", self.generation);
                break ExtractionOutcome::Abandoned;
            }

            captured += 1;
            tracker.advance(offset);
            second += 1;
        };

        tracker.finish();

        if outcome == ExtractionOutcome::Completed {
            log::info!("Extracted {captured} frame(s)");
        }

        self.report(captured, Some(expected), outcome)
    }

    /// Rasterize the current picture onto a native-size surface and encode it.
    fn capture(
        &self,
        decoder: &dyn FrameDecoder,
        offset: Duration,
        metadata: &VideoMetadata,
    ) -> Result<Frame, DeepcheckError> {
        let picture = decoder.current_frame().ok_or_else(|| {
            DeepcheckError::MediaDecode(format!("seek to {offset:?} left no current picture"))
        })?;

        let (width, height) = if metadata.width > 0 && metadata.height > 0 {
            (metadata.width, metadata.height)
        } else {
            (picture.width(), picture.height())
        };

        let surface = if picture.width() == width && picture.height() == height {
            DynamicImage::ImageRgb8(picture.to_rgb8())
        } else {
            DynamicImage::ImageRgb8(picture.resize_exact(width, height, FilterType::Triangle).to_rgb8())
        };

        Frame::encode(offset, &surface, self.options.snapshot_format)
    }

    fn report(
        &self,
        captured: u64,
        expected: Option<u64>,
        outcome: ExtractionOutcome,
    ) -> ExtractionReport {
        ExtractionReport {
            generation: self.generation,
            captured,
            expected,
            outcome,
        }
    }
}

/// Extract every whole-second frame of `decoder` into a fresh sequence.
pub fn extract_frames(
    decoder: &mut dyn FrameDecoder,
    options: &ExtractOptions,
) -> (Vec<Frame>, ExtractionReport) {
    let sequence = FrameSequence::new();
    let report = FrameExtractor::new(&sequence, sequence.generation(), options).run(decoder);
    (sequence.frames(), report)
}
