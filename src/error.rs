//! Error types for the `deepcheck` crate.
//!
//! This module defines [`DeepcheckError`], the unified error type returned by
//! all fallible operations in the crate. Two families matter to callers:
//! media decode failures, which frame extraction absorbs into a truncated
//! [`ExtractionOutcome`](crate::ExtractionOutcome), and prediction failures,
//! which the [`Session`](crate::Session) turns into an error notification.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::media::MediaKind;

/// The unified error type for all `deepcheck` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeepcheckError {
    /// The media file could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path handed to the decoder.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The media could not be decoded, or a seek did not land on a
    /// decodable frame.
    #[error("Failed to decode media: {0}")]
    MediaDecode(String),

    /// The prediction request never produced a response.
    #[error("Prediction request failed: {0}")]
    PredictionTransport(String),

    /// The prediction service answered with a non-success status.
    #[error("Prediction service returned {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Response body, possibly empty.
        body: String,
    },

    /// The prediction service answered with a body that is not JSON.
    #[error("Invalid prediction response: {0}")]
    InvalidResponse(String),

    /// A prediction request is already outstanding for this session.
    #[error("A prediction is already in progress")]
    PredictionInFlight,

    /// The session already holds a prediction result.
    #[error("A prediction result is already available; reset the session first")]
    PredictionSettled,

    /// No media has been selected in the session.
    #[error("No media selected")]
    NoMediaSelected,

    /// The operation needs a different kind of media than the one selected.
    #[error("Expected {expected} media, found {found}")]
    KindMismatch {
        /// Kind the operation needs.
        expected: MediaKind,
        /// Kind that is actually selected.
        found: MediaKind,
    },

    /// A session was built outside a Tokio runtime and no runtime handle
    /// was supplied.
    #[error("No Tokio runtime available for background extraction")]
    NoRuntime,

    /// The operation was cancelled via a
    /// [`CancellationToken`](crate::CancellationToken) or superseded by a
    /// newer selection.
    #[error("Operation cancelled")]
    Cancelled,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding or decoding a still.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),
}

impl DeepcheckError {
    /// Returns `true` for failures of the prediction call itself (transport,
    /// status, or body), as opposed to local usage errors.
    pub fn is_prediction_failure(&self) -> bool {
        matches!(
            self,
            DeepcheckError::PredictionTransport(_)
                | DeepcheckError::UnexpectedStatus { .. }
                | DeepcheckError::InvalidResponse(_)
        )
    }

    /// Returns `true` for failures that mean the media cannot be decoded.
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            DeepcheckError::FileOpen { .. }
                | DeepcheckError::NoVideoStream
                | DeepcheckError::MediaDecode(_)
                | DeepcheckError::Ffmpeg(_)
                | DeepcheckError::Image(_)
        )
    }
}

impl From<FfmpegError> for DeepcheckError {
    fn from(error: FfmpegError) -> Self {
        DeepcheckError::Ffmpeg(error.to_string())
    }
}

impl From<reqwest::Error> for DeepcheckError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            DeepcheckError::InvalidResponse(error.to_string())
        } else {
            DeepcheckError::PredictionTransport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_family_is_classified() {
        assert!(DeepcheckError::PredictionTransport("refused".into()).is_prediction_failure());
        assert!(
            DeepcheckError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: String::new(),
            }
            .is_prediction_failure()
        );
        assert!(!DeepcheckError::PredictionInFlight.is_prediction_failure());
        assert!(!DeepcheckError::MediaDecode("eof".into()).is_prediction_failure());
    }

    #[test]
    fn decode_family_is_classified() {
        assert!(DeepcheckError::MediaDecode("truncated".into()).is_decode_failure());
        assert!(DeepcheckError::NoVideoStream.is_decode_failure());
        assert!(!DeepcheckError::Cancelled.is_decode_failure());
    }
}
