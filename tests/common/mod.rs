//! Shared test doubles: a scripted video backend, stub predictors, and a
//! recording notifier.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        mpsc::{Receiver, Sender, channel},
    },
    time::Duration,
};

use deepcheck::{
    DeepcheckError, FrameDecoder, Notification, Notifier, PlayableHandle, PredictionRequest,
    PredictionResult, Predictor, VideoMetadata,
};
use image::{DynamicImage, Rgb, RgbImage};
use tokio::sync::{Notify, mpsc::UnboundedSender};

pub const WIDTH: u32 = 8;
pub const HEIGHT: u32 = 6;

/// Colour shown during each whole second of a scripted video.
pub const PALETTE: [[u8; 3]; 6] = [
    [255, 0, 0],
    [0, 255, 0],
    [0, 0, 255],
    [255, 255, 0],
    [0, 255, 255],
    [255, 0, 255],
];

pub fn colour_at(second: u64) -> [u8; 3] {
    PALETTE[(second as usize) % PALETTE.len()]
}

// ── scripted decoder ───────────────────────────────────────────────

/// Pauses a decoder before it seeks to `second` until released.
pub struct Gate {
    pub second: u64,
    pub reached: UnboundedSender<()>,
    pub release: Receiver<()>,
}

/// Solid-colour video whose colour changes every second.
pub struct ScriptedDecoder {
    metadata: VideoMetadata,
    current: Option<DynamicImage>,
    fail_from: Option<Duration>,
    gate: Option<Gate>,
    pub seeks: Vec<Duration>,
}

impl ScriptedDecoder {
    pub fn new(duration: Duration) -> Self {
        let mut decoder = Self {
            metadata: VideoMetadata {
                width: WIDTH,
                height: HEIGHT,
                duration,
                frames_per_second: 25.0,
                codec: "scripted".to_string(),
            },
            current: None,
            fail_from: None,
            gate: None,
            seeks: Vec::new(),
        };
        decoder.paint(0);
        decoder
    }

    pub fn failing_from(mut self, offset: Duration) -> Self {
        self.fail_from = Some(offset);
        self
    }

    pub fn with_gate(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    fn paint(&mut self, second: u64) {
        self.current = Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            WIDTH,
            HEIGHT,
            Rgb(colour_at(second)),
        )));
    }
}

impl FrameDecoder for ScriptedDecoder {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn seek(&mut self, offset: Duration) -> Result<(), DeepcheckError> {
        if let Some(gate) = self.gate.take_if(|gate| gate.second == offset.as_secs()) {
            let _ = gate.reached.send(());
            let _ = gate.release.recv();
        }

        self.seeks.push(offset);
        if self.fail_from.is_some_and(|limit| offset >= limit) {
            return Err(DeepcheckError::MediaDecode(format!(
                "truncated input at {offset:?}"
            )));
        }
        self.paint(offset.as_secs());
        Ok(())
    }

    fn current_frame(&self) -> Option<&DynamicImage> {
        self.current.as_ref()
    }
}

// ── scripted backend ───────────────────────────────────────────────

/// Opens [`ScriptedDecoder`]s described by the selected file's contents.
///
/// The file holds `;`-separated directives: `duration=<millis>`,
/// `fail_from=<seconds>`, `gate=<label>`, `crash`, or `unreadable`.
#[derive(Default)]
pub struct ScriptedBackend {
    gates: Mutex<HashMap<String, Gate>>,
}

impl ScriptedBackend {
    /// Register a gate for scripts naming `label`. Returns the sender that
    /// releases it.
    pub fn gate(&self, label: &str, second: u64, reached: UnboundedSender<()>) -> Sender<()> {
        let (release_tx, release_rx) = channel();
        self.gates.lock().unwrap().insert(
            label.to_string(),
            Gate {
                second,
                reached,
                release: release_rx,
            },
        );
        release_tx
    }
}

pub fn script(directives: &str) -> Vec<u8> {
    directives.as_bytes().to_vec()
}

impl deepcheck::VideoBackend for ScriptedBackend {
    fn open(&self, handle: &PlayableHandle) -> Result<Box<dyn FrameDecoder>, DeepcheckError> {
        let contents = std::fs::read_to_string(handle.path())?;
        let mut decoder = ScriptedDecoder::new(Duration::ZERO);

        for directive in contents.split(';').map(str::trim).filter(|d| !d.is_empty()) {
            if directive == "crash" {
                panic!("scripted decoder crashed");
            }
            match directive.split_once('=') {
                Some(("duration", millis)) => {
                    let millis: u64 = millis
                        .parse()
                        .map_err(|_| DeepcheckError::MediaDecode(directive.to_string()))?;
                    decoder.metadata.duration = Duration::from_millis(millis);
                }
                Some(("fail_from", seconds)) => {
                    let seconds: u64 = seconds
                        .parse()
                        .map_err(|_| DeepcheckError::MediaDecode(directive.to_string()))?;
                    decoder = decoder.failing_from(Duration::from_secs(seconds));
                }
                Some(("gate", label)) => {
                    if let Some(gate) = self.gates.lock().unwrap().remove(label) {
                        decoder = decoder.with_gate(gate);
                    }
                }
                _ => {
                    return Err(DeepcheckError::MediaDecode(format!(
                        "not a video: {directive}"
                    )));
                }
            }
        }

        Ok(Box::new(decoder))
    }
}

// ── notifications ──────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<Notification> {
        self.received.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: &Notification) {
        self.received.lock().unwrap().push(notification.clone());
    }
}

// ── predictors ─────────────────────────────────────────────────────

/// Answers every request with a fixed response body.
pub struct BodyPredictor {
    pub body: &'static str,
    pub requests: Mutex<Vec<PredictionRequest>>,
}

impl BodyPredictor {
    pub fn new(body: &'static str) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl Predictor for BodyPredictor {
    async fn predict(&self, request: PredictionRequest) -> Result<PredictionResult, DeepcheckError> {
        self.requests.lock().unwrap().push(request);
        PredictionResult::from_body(self.body)
    }
}

/// Fails every request as if the service were unreachable.
pub struct UnreachablePredictor;

impl Predictor for UnreachablePredictor {
    async fn predict(&self, _request: PredictionRequest) -> Result<PredictionResult, DeepcheckError> {
        Err(DeepcheckError::PredictionTransport(
            "connection refused".to_string(),
        ))
    }
}

/// Holds every request until [`release`](HeldPredictor::release) is called.
pub struct HeldPredictor {
    pub verdict: PredictionResult,
    pub release: Notify,
}

impl HeldPredictor {
    pub fn new(verdict: PredictionResult) -> Arc<Self> {
        Arc::new(Self {
            verdict,
            release: Notify::new(),
        })
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

impl Predictor for HeldPredictor {
    async fn predict(&self, _request: PredictionRequest) -> Result<PredictionResult, DeepcheckError> {
        self.release.notified().await;
        Ok(self.verdict)
    }
}

// ── helpers ────────────────────────────────────────────────────────

/// Dominant colour of a captured frame.
pub fn frame_colour(frame: &deepcheck::Frame) -> [u8; 3] {
    let image = frame.decode().expect("decode frame").to_rgb8();
    image.get_pixel(image.width() / 2, image.height() / 2).0
}

/// Encoded 4x4 PNG for image selections.
pub fn png_bytes() -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// Wait until `condition` holds, yielding to the runtime in between.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
