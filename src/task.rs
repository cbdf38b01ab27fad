//! Background extraction runs.
//!
//! Decoding is blocking FFmpeg work, so each run is moved onto
//! `tokio::task::spawn_blocking`: the decoder is opened and driven on that
//! thread, and frames reach observers through the shared
//! [`FrameSequence`]. [`ExtractionTask`] resolves to the run's
//! [`ExtractionReport`] once it stops.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::{runtime::Handle, task::JoinHandle};

use crate::{
    configuration::ExtractOptions,
    decoder::VideoBackend,
    error::DeepcheckError,
    extractor::{ExtractionReport, FrameExtractor},
    frame::FrameSequence,
    media::PlayableHandle,
};

/// A running extraction.
///
/// Dropping the task does not stop the run; replacing the session's media
/// (or cancelling its token) does. A panic inside the run is resumed on the
/// task that awaits it.
pub struct ExtractionTask {
    generation: u64,
    handle: JoinHandle<ExtractionReport>,
}

impl ExtractionTask {
    /// Generation the run captures for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once the run has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Future for ExtractionTask {
    type Output = Result<ExtractionReport, DeepcheckError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.handle).poll(cx).map(|result| match result {
            Ok(report) => Ok(report),
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(_) => Err(DeepcheckError::Cancelled),
        })
    }
}

/// Start extracting `handle` into `sequence` for `generation` on `runtime`.
pub(crate) fn spawn_extraction(
    runtime: &Handle,
    backend: Arc<dyn VideoBackend>,
    handle: PlayableHandle,
    sequence: FrameSequence,
    generation: u64,
    options: ExtractOptions,
) -> ExtractionTask {
    let join_handle = runtime.spawn_blocking(move || {
        FrameExtractor::new(&sequence, generation, &options).open_and_run(backend.as_ref(), &handle)
    });

    ExtractionTask {
        generation,
        handle: join_handle,
    }
}
