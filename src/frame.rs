//! Captured frames and the shared frame sequence.
//!
//! A [`Frame`] is one encoded still captured at a whole-second offset. A
//! [`FrameSequence`] is the append-only list the extractor fills and the
//! rest of the application watches. The sequence is tagged with the
//! session's generation: every append names the generation it was captured
//! for, and appends for any other generation are dropped under the same
//! lock that guards the list.

use std::{
    io::Cursor,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use image::DynamicImage;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::{configuration::SnapshotFormat, error::DeepcheckError};

/// One encoded still image.
#[derive(Debug, Clone)]
pub struct Frame {
    index: u64,
    timestamp: Duration,
    width: u32,
    height: u32,
    format: SnapshotFormat,
    data: Arc<[u8]>,
}

impl Frame {
    /// Encode a rasterized surface.
    pub(crate) fn encode(
        timestamp: Duration,
        surface: &DynamicImage,
        format: SnapshotFormat,
    ) -> Result<Self, DeepcheckError> {
        let mut buffer = Cursor::new(Vec::new());
        surface.write_to(&mut buffer, format.image_format())?;

        Ok(Self {
            index: 0,
            timestamp,
            width: surface.width(),
            height: surface.height(),
            format,
            data: buffer.into_inner().into(),
        })
    }

    /// Position in the sequence; equals the whole-second offset.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Media offset the frame was captured at.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Encoding of [`data`](Frame::data).
    pub fn format(&self) -> SnapshotFormat {
        self.format
    }

    /// MIME type of the encoded data.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Encoded bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Decode back into pixels.
    pub fn decode(&self) -> Result<DynamicImage, DeepcheckError> {
        Ok(image::load_from_memory_with_format(
            &self.data,
            self.format.image_format(),
        )?)
    }

    /// Write the encoded bytes to `path` unchanged.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), DeepcheckError> {
        std::fs::write(path, &self.data)?;
        Ok(())
    }
}

struct SequenceState {
    generation: u64,
    frames: Vec<Frame>,
}

struct Shared {
    state: Mutex<SequenceState>,
    length: watch::Sender<usize>,
}

/// Ordered, append-only list of captured frames.
///
/// Clones share the same list. Observers either poll [`frames`] or
/// [`subscribe`] to be woken on every change of length.
///
/// [`frames`]: FrameSequence::frames
/// [`subscribe`]: FrameSequence::subscribe
#[derive(Clone)]
pub struct FrameSequence {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FrameSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FrameSequence")
            .field("generation", &state.generation)
            .field("len", &state.frames.len())
            .finish()
    }
}

impl Default for FrameSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSequence {
    /// An empty sequence at generation zero.
    pub fn new() -> Self {
        let (length, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SequenceState {
                    generation: 0,
                    frames: Vec::new(),
                }),
                length,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SequenceState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Generation appends are currently accepted for.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Returns `true` if `generation` is still the live one.
    pub fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Clear the list and start accepting a new generation.
    ///
    /// Returns the new generation id.
    pub(crate) fn advance_generation(&self) -> u64 {
        let generation = {
            let mut state = self.lock();
            state.generation += 1;
            state.frames.clear();
            state.generation
        };
        self.shared.length.send_replace(0);
        generation
    }

    /// Append a frame captured for `generation`.
    ///
    /// Returns `false`, leaving the list untouched, if that generation is no
    /// longer live.
    pub fn push(&self, generation: u64, mut frame: Frame) -> bool {
        let length = {
            let mut state = self.lock();
            if state.generation != generation {
                return false;
            }
            frame.index = state.frames.len() as u64;
            state.frames.push(frame);
            state.frames.len()
        };
        self.shared.length.send_replace(length);
        true
    }

    /// Snapshot of the current contents.
    pub fn frames(&self) -> Vec<Frame> {
        self.lock().frames.clone()
    }

    /// Frame at `index`, if captured yet.
    pub fn get(&self, index: usize) -> Option<Frame> {
        self.lock().frames.get(index).cloned()
    }

    /// Number of frames captured so far.
    pub fn len(&self) -> usize {
        self.lock().frames.len()
    }

    /// Returns `true` if nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver that is notified with the new length on every change.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.shared.length.subscribe()
    }

    /// Length updates as a [`Stream`](tokio_stream::Stream).
    pub fn updates(&self) -> WatchStream<usize> {
        WatchStream::new(self.subscribe())
    }
}
