//! Media intake.
//!
//! [`MediaSource`] holds a user-selected file in two forms: the raw bytes
//! that get uploaded for prediction, and a [`PlayableHandle`] the decoder can
//! open. The handle is backed by a temporary file that is deleted when the
//! last clone of it is dropped, which is how a session revokes decoded media
//! on reset or replacement.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    io::Write,
    path::Path,
    str::FromStr,
    sync::Arc,
};

use image::DynamicImage;
use tempfile::NamedTempFile;

use crate::error::DeepcheckError;

/// Declared kind of a selected file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// A video; gets per-second preview frames.
    Video,
    /// A still image.
    Image,
}

impl MediaKind {
    /// Multipart field name the prediction service expects.
    pub fn field_name(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }

    /// Path segment of the prediction endpoint.
    pub fn endpoint(self) -> &'static str {
        match self {
            MediaKind::Video => "predictVideo",
            MediaKind::Image => "predictImage",
        }
    }

    /// Guess the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "mp4" | "mkv" | "mov" | "webm" | "avi" | "m4v" | "mpg" | "mpeg" => {
                Some(MediaKind::Video)
            }
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "tif" | "tiff" => {
                Some(MediaKind::Image)
            }
            _ => None,
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.field_name())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "video" => Ok(MediaKind::Video),
            "image" => Ok(MediaKind::Image),
            other => Err(format!("unknown media kind: {other} (expected video or image)")),
        }
    }
}

/// Decodable representation of a selected file.
///
/// Cheap to clone. The backing temporary file lives until the last clone is
/// dropped, so an extraction run that still holds a clone keeps reading
/// valid data even after the session has moved on.
#[derive(Debug, Clone)]
pub struct PlayableHandle {
    file: Arc<NamedTempFile>,
}

impl PlayableHandle {
    fn create(file_name: &str, bytes: &[u8]) -> Result<Self, DeepcheckError> {
        let suffix = Path::new(file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| format!(".{extension}"))
            .unwrap_or_default();

        let mut file = tempfile::Builder::new()
            .prefix("deepcheck-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        Ok(Self {
            file: Arc::new(file),
        })
    }

    /// Location the decoder reads from.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// A user-selected video or image.
#[derive(Debug, Clone)]
pub struct MediaSource {
    kind: MediaKind,
    file_name: String,
    bytes: Arc<[u8]>,
    handle: PlayableHandle,
}

impl MediaSource {
    /// Take ownership of raw file contents.
    ///
    /// # Errors
    ///
    /// Returns [`DeepcheckError::Io`] if the playable handle cannot be
    /// written.
    pub fn from_bytes(
        kind: MediaKind,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, DeepcheckError> {
        let file_name = file_name.into();
        let handle = PlayableHandle::create(&file_name, &bytes)?;

        log::debug!(
            "Selected {kind} {file_name} ({} bytes) at {}",
            bytes.len(),
            handle.path().display()
        );

        Ok(Self {
            kind,
            file_name,
            bytes: bytes.into(),
            handle,
        })
    }

    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DeepcheckError::Io`] if the file cannot be read.
    pub async fn from_path<P: AsRef<Path>>(kind: MediaKind, path: P) -> Result<Self, DeepcheckError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| kind.field_name().to_string());
        Self::from_bytes(kind, file_name, bytes)
    }

    /// Declared kind.
    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Original file name, used for the upload.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Raw file contents.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared raw file contents.
    pub(crate) fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    /// Decodable handle.
    pub fn handle(&self) -> &PlayableHandle {
        &self.handle
    }

    /// Decode an image selection.
    ///
    /// # Errors
    ///
    /// - [`DeepcheckError::KindMismatch`] for videos.
    /// - [`DeepcheckError::Image`] if the bytes are not a supported image.
    pub fn decode_image(&self) -> Result<DynamicImage, DeepcheckError> {
        if self.kind != MediaKind::Image {
            return Err(DeepcheckError::KindMismatch {
                expected: MediaKind::Image,
                found: self.kind,
            });
        }
        Ok(image::load_from_memory(&self.bytes)?)
    }
}
