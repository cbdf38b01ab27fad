//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions.

use std::path::Path;

use deepcheck::{
    DeepcheckError, FfmpegBackend, FfmpegDecoder, MediaKind, MediaSource, VideoBackend,
};

#[test]
fn open_nonexistent_file() {
    let result = FfmpegDecoder::open("this_file_does_not_exist.mp4");
    let error = result.err().expect("missing file must fail");

    assert!(error.is_decode_failure());
    let error_message = error.to_string();
    assert!(
        error_message.contains("Failed to open media file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = FfmpegDecoder::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
}

#[test]
fn backend_rejects_garbage_selection() {
    let source = MediaSource::from_bytes(MediaKind::Video, "garbage.mp4", vec![0xde, 0xad, 0xbe, 0xef])
        .expect("source");

    let result = FfmpegBackend.open(source.handle());
    assert!(matches!(result, Err(error) if error.is_decode_failure()));
}

#[test]
fn image_decode_of_garbage_is_image_error() {
    let source = MediaSource::from_bytes(MediaKind::Image, "face.png", b"not a png".to_vec())
        .expect("source");

    let error = source.decode_image().expect_err("garbage image");
    assert!(matches!(error, DeepcheckError::Image(_)));
    assert!(error.to_string().contains("Image processing error"));
}

#[test]
fn error_display_messages() {
    let cases = [
        (DeepcheckError::NoVideoStream, "No video stream"),
        (DeepcheckError::NoMediaSelected, "No media selected"),
        (DeepcheckError::PredictionInFlight, "already in progress"),
        (DeepcheckError::Cancelled, "cancelled"),
        (DeepcheckError::NoRuntime, "No Tokio runtime"),
        (
            DeepcheckError::KindMismatch {
                expected: MediaKind::Image,
                found: MediaKind::Video,
            },
            "Expected image media, found video",
        ),
    ];

    for (error, needle) in cases {
        let message = error.to_string();
        assert!(message.contains(needle), "{message:?} should contain {needle:?}");
    }
}

#[test]
fn io_errors_convert() {
    let io = std::fs::read(Path::new("definitely/not/here")).expect_err("missing");
    let error: DeepcheckError = io.into();
    assert!(matches!(error, DeepcheckError::Io(_)));
    assert!(!error.is_prediction_failure());
    assert!(!error.is_decode_failure());
}
