//! The live session.
//!
//! A [`Session`] owns the selected media, the frame sequence, the
//! prediction verdict, and the busy flag. Every selection and every reset
//! advances the session generation; extraction runs and prediction calls
//! remember the generation they started under, and their results are
//! dropped if it is no longer current when they land.
//!
//! # Example
//!
//! ```no_run
//! use deepcheck::{MediaKind, Session, SessionConfig};
//!
//! # async fn example() -> Result<(), deepcheck::DeepcheckError> {
//! let session = Session::new(SessionConfig::default())?;
//!
//! if let Some(task) = session.select_path(MediaKind::Video, "clip.mp4").await? {
//!     let report = task.await?;
//!     println!("{} preview frames", report.captured);
//! }
//!
//! let verdict = session.predict().await?;
//! println!("Prediction Result: {verdict}");
//! # Ok(())
//! # }
//! ```

use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::runtime::Handle;

use crate::{
    configuration::SessionConfig,
    decoder::{FfmpegBackend, VideoBackend},
    error::DeepcheckError,
    frame::FrameSequence,
    media::{MediaKind, MediaSource},
    notification::{LogNotifier, Notification, Notifier, PREDICTION_FAILED, PREDICTION_SUCCEEDED},
    prediction::{PredictionClient, PredictionRequest, PredictionResult, Predictor},
    task::{ExtractionTask, spawn_extraction},
};

#[derive(Default)]
struct State {
    media: Option<MediaSource>,
    prediction: Option<PredictionResult>,
    is_predicting: bool,
}

struct Inner {
    config: SessionConfig,
    backend: Arc<dyn VideoBackend>,
    notifier: Arc<dyn Notifier>,
    client: PredictionClient,
    runtime: Handle,
    frames: FrameSequence,
    state: Mutex<State>,
}

/// Point-in-time view of a session, for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Current generation.
    pub generation: u64,
    /// Kind of the selected media.
    pub kind: Option<MediaKind>,
    /// File name of the selected media.
    pub file_name: Option<String>,
    /// Preview frames captured so far.
    pub frame_count: usize,
    /// Verdict, once a prediction has completed.
    pub prediction: Option<PredictionResult>,
    /// Whether a prediction call is outstanding.
    pub is_predicting: bool,
}

/// Builder for a [`Session`] with non-default collaborators.
pub struct SessionBuilder {
    config: SessionConfig,
    backend: Arc<dyn VideoBackend>,
    notifier: Arc<dyn Notifier>,
    runtime: Option<Handle>,
}

impl SessionBuilder {
    /// Decode videos with `backend` instead of FFmpeg.
    #[must_use]
    pub fn with_backend(mut self, backend: Arc<dyn VideoBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Deliver notifications to `notifier` instead of the log.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run extractions on `runtime` instead of the runtime the session is
    /// built in.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// - [`DeepcheckError::NoRuntime`] if no runtime was supplied and the
    ///   caller is not inside one.
    /// - Fails if the prediction client cannot be constructed.
    pub fn build(self) -> Result<Session, DeepcheckError> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| DeepcheckError::NoRuntime)?,
        };
        let client = PredictionClient::new(self.config.client())?;
        Ok(Session {
            inner: Arc::new(Inner {
                config: self.config,
                backend: self.backend,
                notifier: self.notifier,
                client,
                runtime,
                frames: FrameSequence::new(),
                state: Mutex::new(State::default()),
            }),
        })
    }
}

/// Clears the busy flag if a prediction call is dropped before it settles.
struct BusyGuard<'a> {
    session: &'a Session,
    generation: u64,
    armed: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.lock();
        if self.session.inner.frames.is_current(self.generation) {
            log::debug!("Prediction call dropped before completion");
            state.is_predicting = false;
        }
    }
}

/// The single live session. Clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("snapshot", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Session with the FFmpeg backend and log notifications, running
    /// extractions on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails outside a runtime, or if the prediction client cannot be
    /// constructed.
    pub fn new(config: SessionConfig) -> Result<Self, DeepcheckError> {
        Self::builder(config).build()
    }

    /// Start configuring a session.
    pub fn builder(config: SessionConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            backend: Arc::new(FfmpegBackend),
            notifier: Arc::new(LogNotifier),
            runtime: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the selected media.
    ///
    /// `None` (no file chosen) is a no-op. Otherwise the previous media,
    /// frames, and verdict are dropped, any running extraction is abandoned,
    /// and for videos a new extraction starts in the background on the
    /// session's runtime.
    pub fn select(&self, source: Option<MediaSource>) -> Option<ExtractionTask> {
        let source = source?;
        let kind = source.kind();
        let handle = source.handle().clone();

        let generation = {
            let mut state = self.lock();
            let generation = self.inner.frames.advance_generation();
            state.media = Some(source);
            state.prediction = None;
            state.is_predicting = false;
            generation
        };

        log::debug!("Session advanced to generation {generation} with {kind} media");

        match kind {
            MediaKind::Video => Some(spawn_extraction(
                &self.inner.runtime,
                Arc::clone(&self.inner.backend),
                handle,
                self.inner.frames.clone(),
                generation,
                self.inner.config.extract().clone(),
            )),
            MediaKind::Image => None,
        }
    }

    /// Read `path` and [`select`](Session::select) it.
    ///
    /// # Errors
    ///
    /// Returns [`DeepcheckError::Io`] if the file cannot be read; the
    /// current selection is left untouched in that case.
    pub async fn select_path<P: AsRef<Path>>(
        &self,
        kind: MediaKind,
        path: P,
    ) -> Result<Option<ExtractionTask>, DeepcheckError> {
        let source = MediaSource::from_path(kind, path).await?;
        Ok(self.select(Some(source)))
    }

    /// Submit the selected media to the configured prediction service.
    ///
    /// See [`predict_with`](Session::predict_with).
    pub async fn predict(&self) -> Result<PredictionResult, DeepcheckError> {
        let client = self.inner.client.clone();
        self.predict_with(&client).await
    }

    /// Submit the selected media through `predictor`.
    ///
    /// The busy flag is set for the duration of the call. A verdict is
    /// stored and announced with a success notification; a failure leaves
    /// the verdict unset and is announced with an error notification. A
    /// reply that arrives after the session was reset or given new media is
    /// discarded.
    ///
    /// # Errors
    ///
    /// - [`DeepcheckError::NoMediaSelected`] if nothing is selected.
    /// - [`DeepcheckError::PredictionInFlight`] if a call is outstanding.
    /// - [`DeepcheckError::PredictionSettled`] if a verdict already exists.
    /// - [`DeepcheckError::Cancelled`] if the session moved on mid-call.
    /// - Any error from `predictor`.
    pub async fn predict_with<P: Predictor>(
        &self,
        predictor: &P,
    ) -> Result<PredictionResult, DeepcheckError> {
        let (generation, request) = {
            let mut state = self.lock();
            let media = state.media.as_ref().ok_or(DeepcheckError::NoMediaSelected)?;
            let request = PredictionRequest::new(
                media.kind(),
                media.file_name(),
                media.shared_bytes(),
            );
            if state.is_predicting {
                return Err(DeepcheckError::PredictionInFlight);
            }
            if state.prediction.is_some() {
                return Err(DeepcheckError::PredictionSettled);
            }
            state.is_predicting = true;
            (self.inner.frames.generation(), request)
        };

        let mut busy = BusyGuard {
            session: self,
            generation,
            armed: true,
        };
        let outcome = predictor.predict(request).await;

        {
            let mut state = self.lock();
            busy.armed = false;
            if !self.inner.frames.is_current(generation) {
                log::debug!("Discarding prediction for stale generation {generation}");
                return Err(DeepcheckError::Cancelled);
            }
            state.is_predicting = false;
            if let Ok(result) = &outcome {
                state.prediction = Some(*result);
            }
        }

        match &outcome {
            Ok(result) => {
                log::info!("Prediction: {result}");
                self.inner
                    .notifier
                    .notify(&Notification::Success(PREDICTION_SUCCEEDED.to_string()));
            }
            Err(error) => {
                log::warn!("Prediction failed: {error}");
                self.inner
                    .notifier
                    .notify(&Notification::Error(PREDICTION_FAILED.to_string()));
            }
        }

        outcome
    }

    /// Drop the media, frames, and verdict, and abandon running work.
    pub fn reset(&self) {
        let mut state = self.lock();
        let generation = self.inner.frames.advance_generation();
        *state = State::default();
        log::debug!("Session reset to generation {generation}");
    }

    /// The shared frame sequence.
    pub fn frames(&self) -> &FrameSequence {
        &self.inner.frames
    }

    /// The selected media, if any.
    pub fn media(&self) -> Option<MediaSource> {
        self.lock().media.clone()
    }

    /// The verdict, once a prediction has completed.
    pub fn prediction(&self) -> Option<PredictionResult> {
        self.lock().prediction
    }

    /// Whether a prediction call is outstanding.
    pub fn is_predicting(&self) -> bool {
        self.lock().is_predicting
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.inner.frames.generation()
    }

    /// Configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Point-in-time view for rendering.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            generation: self.inner.frames.generation(),
            kind: state.media.as_ref().map(MediaSource::kind),
            file_name: state.media.as_ref().map(|media| media.file_name().to_string()),
            frame_count: self.inner.frames.len(),
            prediction: state.prediction,
            is_predicting: state.is_predicting,
        }
    }
}
