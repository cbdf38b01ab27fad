//! Extraction and client configuration.
//!
//! [`ExtractOptions`] is a builder that threads progress callbacks,
//! cancellation tokens, and snapshot settings through a frame extraction run
//! without polluting every function signature. [`ClientOptions`] configures
//! the prediction service client, and [`SessionConfig`] bundles both.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use deepcheck::{
//!     CancellationToken, ClientOptions, ExtractOptions, ProgressCallback, ProgressInfo,
//!     SessionConfig, SnapshotFormat,
//! };
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let token = CancellationToken::new();
//! let extract = ExtractOptions::new()
//!     .with_progress(Arc::new(LogProgress))
//!     .with_cancellation(token.clone())
//!     .with_snapshot_format(SnapshotFormat::Jpeg);
//! let client = ClientOptions::new("http://localhost:8000").with_timeout(Duration::from_secs(30));
//! let config = SessionConfig::new(client).with_extract_options(extract);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;
use std::time::Duration;

use image::ImageFormat;

use crate::progress::{CancellationToken, NoOpProgress, ProgressCallback};

/// Default prediction service location.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Default prediction request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Still-image encoding used for captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    /// Lossless PNG. This is the default.
    #[default]
    Png,
    /// Baseline JPEG, much smaller for long videos.
    Jpeg,
}

impl SnapshotFormat {
    pub(crate) fn image_format(self) -> ImageFormat {
        match self {
            SnapshotFormat::Png => ImageFormat::Png,
            SnapshotFormat::Jpeg => ImageFormat::Jpeg,
        }
    }

    /// MIME type of the encoded snapshot.
    pub fn mime_type(self) -> &'static str {
        match self {
            SnapshotFormat::Png => "image/png",
            SnapshotFormat::Jpeg => "image/jpeg",
        }
    }

    /// Conventional file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            SnapshotFormat::Png => "png",
            SnapshotFormat::Jpeg => "jpg",
        }
    }
}

/// Configuration for frame extraction runs.
///
/// All fields have defaults; a default-constructed value captures every
/// whole second as PNG with no cap and no observers.
#[derive(Clone)]
pub struct ExtractOptions {
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means only session replacement cancels.
    pub(crate) cancellation: Option<CancellationToken>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
    /// Encoding of captured frames.
    pub(crate) snapshot_format: SnapshotFormat,
    /// Upper bound on captured frames. `None` means unbounded.
    pub(crate) max_frames: Option<u64>,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .field("snapshot_format", &self.snapshot_format)
            .field("max_frames", &self.max_frames)
            .finish()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
            snapshot_format: SnapshotFormat::Png,
            max_frames: None,
        }
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When the token is cancelled the run stops before its next seek and
    /// reports [`ExtractionOutcome::Abandoned`](crate::ExtractionOutcome::Abandoned).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set how often the progress callback fires. Clamped to at least 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the encoding of captured frames.
    #[must_use]
    pub fn with_snapshot_format(mut self, format: SnapshotFormat) -> Self {
        self.snapshot_format = format;
        self
    }

    /// Stop after `limit` frames.
    ///
    /// Extraction is unbounded by default, so very long videos keep one
    /// encoded still per second in memory. A cap of zero is treated as no
    /// cap.
    #[must_use]
    pub fn with_max_frames(mut self, limit: u64) -> Self {
        self.max_frames = (limit > 0).then_some(limit);
        self
    }

    /// Encoding of captured frames.
    pub fn snapshot_format(&self) -> SnapshotFormat {
        self.snapshot_format
    }

    /// Returns `true` if cancellation has been requested.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }
}

/// Settings for the prediction service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub(crate) base_url: String,
    pub(crate) timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientOptions {
    /// Target the given service root. Trailing slashes are dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the whole-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Service root without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whole-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Everything a [`Session`](crate::Session) needs to know up front.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    pub(crate) client: ClientOptions,
    pub(crate) extract: ExtractOptions,
}

impl SessionConfig {
    /// Build a configuration around the given client options.
    pub fn new(client: ClientOptions) -> Self {
        Self {
            client,
            extract: ExtractOptions::new(),
        }
    }

    /// Replace the extraction options.
    #[must_use]
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Prediction client options.
    pub fn client(&self) -> &ClientOptions {
        &self.client
    }

    /// Frame extraction options.
    pub fn extract(&self) -> &ExtractOptions {
        &self.extract
    }
}
