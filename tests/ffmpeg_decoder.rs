//! FFmpeg decoder integration tests.
//!
//! Tests require fixture files from `tests/fixtures/generate_fixtures.sh`.
//! The sample video is 3.4 seconds long, 160x120 at 25 fps, and shows a
//! different solid colour during each second. The offset video carries the
//! same pictures in MPEG-TS with timestamps starting at 1.4 seconds.

use std::{path::Path, sync::Arc, time::Duration};

use deepcheck::{
    ClientOptions, DecoderLogLevel, ExtractOptions, ExtractionOutcome, FfmpegDecoder,
    FrameDecoder, MediaKind, Session, SessionConfig, extract_frames, set_decoder_log_level,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn offset_video_path() -> &'static str {
    "tests/fixtures/offset_video.ts"
}

/// Colours the fixture script paints, one per second.
const SECOND_COLOURS: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 0]];

fn close_to(actual: [u8; 3], expected: [u8; 3]) -> bool {
    actual
        .iter()
        .zip(expected)
        .all(|(&a, e)| (i16::from(a) - i16::from(e)).abs() <= 40)
}

// ── metadata ───────────────────────────────────────────────────────

#[test]
fn metadata_is_loaded_with_first_frame() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let decoder = FfmpegDecoder::open(path).expect("open");
    let metadata = decoder.metadata();

    assert_eq!((metadata.width, metadata.height), (160, 120));
    assert!((metadata.duration.as_secs_f64() - 3.4).abs() < 0.1);
    assert!((metadata.frames_per_second - 25.0).abs() < 0.5);
    assert_eq!(metadata.expected_frame_count(), 4);
    assert!(decoder.current_frame().is_some());
    assert_eq!(decoder.path(), Path::new(path));
}

// ── seek and capture ───────────────────────────────────────────────

#[test]
fn seek_lands_on_the_requested_second() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    set_decoder_log_level(DecoderLogLevel::Error);
    let mut decoder = FfmpegDecoder::open(path).expect("open");

    for second in [2_u64, 0, 3, 1] {
        decoder.seek(Duration::from_secs(second)).expect("seek");
        let picture = decoder.current_frame().expect("picture").to_rgb8();
        let pixel = picture.get_pixel(80, 60).0;
        assert!(
            close_to(pixel, SECOND_COLOURS[second as usize]),
            "second {second}: got {pixel:?}"
        );
    }
}

#[test]
fn extraction_captures_one_frame_per_second() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut decoder = FfmpegDecoder::open(path).expect("open");
    let (frames, report) = extract_frames(&mut decoder, &ExtractOptions::new());

    assert_eq!(report.outcome, ExtractionOutcome::Completed);
    assert_eq!(frames.len(), 4);
    for (second, frame) in frames.iter().enumerate() {
        assert_eq!(frame.timestamp(), Duration::from_secs(second as u64));
        assert_eq!((frame.width(), frame.height()), (160, 120));
        let image = frame.decode().expect("decode").to_rgb8();
        let pixel = image.get_pixel(80, 60).0;
        assert!(close_to(pixel, SECOND_COLOURS[second]), "second {second}: got {pixel:?}");
    }
}

#[test]
fn late_starting_stream_captures_each_second() {
    let path = offset_video_path();
    if !Path::new(path).exists() {
        return;
    }

    set_decoder_log_level(DecoderLogLevel::Error);
    let mut decoder = FfmpegDecoder::open(path).expect("open");
    assert_eq!(decoder.metadata().expected_frame_count(), 4);

    let (frames, report) = extract_frames(&mut decoder, &ExtractOptions::new());

    assert_eq!(report.outcome, ExtractionOutcome::Completed);
    assert_eq!(frames.len(), 4);
    for (second, frame) in frames.iter().enumerate() {
        let image = frame.decode().expect("decode").to_rgb8();
        let pixel = image.get_pixel(80, 60).0;
        assert!(close_to(pixel, SECOND_COLOURS[second]), "second {second}: got {pixel:?}");
    }
}

#[test]
fn seek_past_the_end_fails() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut decoder = FfmpegDecoder::open(path).expect("open");
    let result = decoder.seek(Duration::from_secs(30));
    assert!(matches!(result, Err(error) if error.is_decode_failure()));
}

// ── session ────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn session_previews_the_fixture() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let session = Session::new(SessionConfig::new(ClientOptions::default())).expect("session");
    let task = session
        .select_path(MediaKind::Video, path)
        .await
        .expect("select")
        .expect("video task");

    let report = task.await.expect("join");
    assert_eq!(report.captured, 4);
    assert_eq!(session.frames().len(), 4);

    let shared = Arc::new(session.frames().frames());
    assert!(shared.iter().all(|frame| frame.mime_type() == "image/png"));
}
