//! # deepcheck
//!
//! Submit a video or image to a deepfake-detection service and preview the
//! video one frame per second while you wait.
//!
//! `deepcheck` keeps one [`Session`] per user: selecting a video starts a
//! background run that seeks to every whole second, captures the picture
//! shown there at native resolution, and appends it to a shared
//! [`FrameSequence`] that observers watch grow. Submitting the selection
//! uploads the raw file to the prediction service and stores the verdict.
//! Decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate.
//!
//! ## Quick Start
//!
//! ### Preview frames
//!
//! ```no_run
//! use deepcheck::{ExtractOptions, FfmpegDecoder, extract_frames};
//!
//! let mut decoder = FfmpegDecoder::open("input.mp4").unwrap();
//! let (frames, report) = extract_frames(&mut decoder, &ExtractOptions::new());
//! for frame in &frames {
//!     frame.save(format!("second_{:04}.png", frame.index())).unwrap();
//! }
//! assert_eq!(frames.len() as u64, report.captured);
//! ```
//!
//! ### Full session
//!
//! ```no_run
//! use deepcheck::{ClientOptions, MediaKind, Session, SessionConfig};
//!
//! # async fn example() -> Result<(), deepcheck::DeepcheckError> {
//! let session = Session::new(SessionConfig::new(ClientOptions::new("http://localhost:8000")))?;
//! let task = session.select_path(MediaKind::Video, "input.mp4").await?;
//!
//! let verdict = session.predict().await?;
//! println!("Prediction Result: {verdict}");
//!
//! if let Some(task) = task {
//!     task.await?;
//! }
//! println!("{} preview frames", session.frames().len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Behaviour worth knowing
//!
//! - A video of duration `D` yields `ceil(D)` frames, at offsets
//!   `0, 1, …`; an exact integer duration does not get a frame at `D`.
//! - Extraction is best-effort. A seek that fails ends the run quietly with
//!   the frames captured so far; the outcome is still reported through
//!   [`ExtractionOutcome`].
//! - Frame count is unbounded by default, so long videos hold one encoded
//!   still per second in memory. See [`ExtractOptions::with_max_frames`].
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod configuration;
pub mod decoder;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod frame;
pub mod media;
pub mod metadata;
pub mod notification;
pub mod prediction;
pub mod progress;
pub mod session;
pub mod task;
mod utilities;

pub use configuration::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, ExtractOptions, SessionConfig,
    SnapshotFormat,
};
pub use decoder::{FfmpegBackend, FfmpegDecoder, FrameDecoder, VideoBackend};
pub use error::DeepcheckError;
pub use extractor::{ExtractionOutcome, ExtractionReport, FrameExtractor, extract_frames};
pub use ffmpeg::{DecoderLogLevel, set_decoder_log_level};
pub use frame::{Frame, FrameSequence};
pub use media::{MediaKind, MediaSource, PlayableHandle};
pub use metadata::VideoMetadata;
pub use notification::{
    LogNotifier, Notification, Notifier, PREDICTION_FAILED, PREDICTION_SUCCEEDED,
};
pub use prediction::{PredictionClient, PredictionRequest, PredictionResult, Predictor};
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use session::{Session, SessionBuilder, SessionSnapshot};
pub use task::ExtractionTask;
pub use utilities::whole_second_count;
