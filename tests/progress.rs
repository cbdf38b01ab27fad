//! Progress and cancellation integration tests.

mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::ScriptedDecoder;
use deepcheck::{
    CancellationToken, ExtractOptions, ExtractionOutcome, OperationType, ProgressCallback,
    ProgressInfo, extract_frames,
};

// ── CancellationToken ──────────────────────────────────────────────

#[test]
fn cancellation_token_default_not_cancelled() {
    assert!(!CancellationToken::new().is_cancelled());
    assert!(!CancellationToken::default().is_cancelled());
}

#[test]
fn cancellation_token_clone_shares_state() {
    let token = CancellationToken::new();
    let clone = token.clone();
    assert!(!clone.is_cancelled());

    token.cancel();
    assert!(clone.is_cancelled());
}

#[test]
fn cancelled_extraction_is_abandoned() {
    let token = CancellationToken::new();
    token.cancel();

    let options = ExtractOptions::new().with_cancellation(token);
    let mut decoder = ScriptedDecoder::new(Duration::from_secs(4));
    let (frames, report) = extract_frames(&mut decoder, &options);

    assert!(frames.is_empty());
    assert_eq!(report.outcome, ExtractionOutcome::Abandoned);
}

// ── ProgressInfo ───────────────────────────────────────────────────

#[derive(Default)]
struct RecordingProgress {
    infos: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.infos.lock().unwrap().push(info.clone());
    }
}

#[test]
fn progress_reports_every_frame() {
    let recorder = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new().with_progress(recorder.clone());
    let mut decoder = ScriptedDecoder::new(Duration::from_millis(2_500));

    extract_frames(&mut decoder, &options);

    let infos = recorder.infos.lock().unwrap();
    assert_eq!(infos.len(), 3);
    for (position, info) in infos.iter().enumerate() {
        assert_eq!(info.operation, OperationType::FrameExtraction);
        assert_eq!(info.current, position as u64 + 1);
        assert_eq!(info.total, Some(3));
        assert_eq!(info.current_timestamp, Some(Duration::from_secs(position as u64)));
    }
    let last = infos.last().expect("last report");
    assert!((last.percentage.expect("percentage") - 100.0).abs() < f32::EPSILON);
    assert_eq!(last.estimated_remaining, Some(Duration::ZERO));
}

#[test]
fn batched_progress_reports_remainder() {
    let recorder = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new()
        .with_progress(recorder.clone())
        .with_batch_size(2);
    let mut decoder = ScriptedDecoder::new(Duration::from_secs(5));

    extract_frames(&mut decoder, &options);

    let currents: Vec<u64> = recorder
        .infos
        .lock()
        .unwrap()
        .iter()
        .map(|info| info.current)
        .collect();
    assert_eq!(currents, vec![2, 4, 5]);
}

#[test]
fn empty_video_reports_nothing() {
    let recorder = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new().with_progress(recorder.clone());
    let mut decoder = ScriptedDecoder::new(Duration::ZERO);

    let (frames, report) = extract_frames(&mut decoder, &options);

    assert!(frames.is_empty());
    assert!(report.is_complete());
    assert!(recorder.infos.lock().unwrap().is_empty());
}
