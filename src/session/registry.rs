use std::collections::HashMap;
use std::mem;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::pipeline::{Pipeline, PipelineConfig, SessionEvent};
use super::session::Session;
use super::state::{ChannelId, ResumeData, SessionId, SessionState, SessionStatus};
use crate::audio::{AudioFrame, CaptureConfig, PushOutcome};
use crate::config::AudioConfig;
use crate::error::SessionError;
use crate::models::ModelManager;
use crate::notes::NoteSynthesizer;
use crate::store::MeetingStore;
use crate::transcribe::Transcriber;

/// Acknowledgement for one pushed frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameAck {
    pub captured_secs: f64,
    /// The capture ceiling was reached and the session auto-stopped
    pub auto_stopped: bool,
}

pub(crate) struct RegistryInner {
    pub(crate) by_channel: HashMap<ChannelId, Arc<Mutex<Session>>>,
    pub(crate) index: HashMap<SessionId, ChannelId>,
    pub(crate) tasks: HashMap<SessionId, JoinHandle<()>>,
}

/// Adapter-facing entry point for the orchestration core.
///
/// Holds at most one live session per channel. Frame ingestion never
/// blocks on inference: sessions only contend on the model manager inside
/// their own pipeline tasks.
pub struct SessionRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    pipeline: Arc<Pipeline>,
    capture: CaptureConfig,
    idle_timeout: Duration,
}

impl SessionRegistry {
    /// Build the registry and its completion-event channel.
    pub fn new(
        audio: &AudioConfig,
        manager: Arc<ModelManager>,
        store: Arc<dyn MeetingStore>,
        config: PipelineConfig,
    ) -> (Arc<Self>, mpsc::Receiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::channel(64);

        let inner = Arc::new(RwLock::new(RegistryInner {
            by_channel: HashMap::new(),
            index: HashMap::new(),
            tasks: HashMap::new(),
        }));

        let transcriber =
            Transcriber::new(Arc::clone(&manager), config.sample_rate, config.inference_timeout);
        let synthesizer = NoteSynthesizer::new(manager, config.inference_timeout);

        let pipeline = Arc::new(Pipeline {
            transcriber,
            synthesizer,
            store,
            events: events_tx,
            registry: Arc::clone(&inner),
            config,
        });

        let registry = Arc::new(Self {
            inner,
            pipeline,
            capture: CaptureConfig {
                sample_rate: audio.sample_rate,
                max_duration_secs: audio.max_duration_secs,
                min_duration_secs: audio.min_duration_secs,
            },
            idle_timeout: Duration::from_secs(audio.idle_timeout_secs),
        });

        (registry, events_rx)
    }

    /// Start recording a meeting in a channel.
    pub async fn start(
        &self,
        channel: ChannelId,
        name: Option<String>,
    ) -> Result<SessionId, SessionError> {
        let mut inner = self.inner.write().await;

        if inner.by_channel.contains_key(&channel) {
            return Err(SessionError::AlreadyActive(channel));
        }

        let session = Session::new(channel.clone(), name, self.capture.clone());
        let id = session.id;

        inner.index.insert(id, channel.clone());
        inner.by_channel.insert(channel, Arc::new(Mutex::new(session)));

        Ok(id)
    }

    /// Append a frame to a recording session.
    pub async fn push_frame(
        &self,
        id: SessionId,
        frame: AudioFrame,
    ) -> Result<FrameAck, SessionError> {
        let session_arc = self.get(id).await?;
        let mut session = session_arc.lock().await;

        let outcome = session.push_frame(&frame)?;
        let captured_secs = session.captured_secs();

        let auto_stopped = outcome == PushOutcome::CeilingReached;
        if auto_stopped {
            info!("Session {} reached the capture ceiling, auto-stopping", id);
            self.finish_recording(id, &session_arc, &mut session).await?;
        }

        Ok(FrameAck {
            captured_secs,
            auto_stopped,
        })
    }

    /// Stop recording and hand the session to the processing pipeline.
    ///
    /// Returns `EmptyRecording` (and discards the session) if less than
    /// the minimum duration was captured; otherwise the pipeline runs and
    /// the meeting arrives on the event channel.
    pub async fn stop(&self, id: SessionId) -> Result<(), SessionError> {
        let session_arc = self.get(id).await?;
        let mut session = session_arc.lock().await;
        self.finish_recording(id, &session_arc, &mut session).await
    }

    /// Status snapshot for a session.
    pub async fn status(&self, id: SessionId) -> Result<SessionStatus, SessionError> {
        let session_arc = self.get(id).await?;
        let session = session_arc.lock().await;
        Ok(session.status())
    }

    /// Re-run only the failed stage of a parked session.
    pub async fn retry(&self, id: SessionId) -> Result<(), SessionError> {
        let session_arc = self.get(id).await?;
        let session = session_arc.lock().await;

        let resume = match &session.state {
            SessionState::Failed { resume, .. } => match resume {
                ResumeData::Save {
                    retries_left: 0, ..
                } => return Err(SessionError::RetryExhausted(id)),
                ResumeData::Save {
                    meeting,
                    retries_left,
                } => ResumeData::Save {
                    meeting: meeting.clone(),
                    retries_left: retries_left - 1,
                },
                other => other.clone(),
            },
            _ => return Err(SessionError::NotRetryable(id)),
        };

        info!("Session {} retrying the {} stage", id, resume.stage());
        self.spawn_pipeline(id, &session_arc, resume).await;
        Ok(())
    }

    /// Discard a session and whatever stage it is in. Aborting a pipeline
    /// queued on the model manager leaves no side effects.
    pub async fn abandon(&self, id: SessionId) -> Result<(), SessionError> {
        let mut inner = self.inner.write().await;

        let channel = inner
            .index
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        inner.by_channel.remove(&channel);

        if let Some(task) = inner.tasks.remove(&id) {
            task.abort();
        }

        info!("Session {} abandoned", id);
        Ok(())
    }

    /// Number of live sessions.
    pub async fn active_count(&self) -> usize {
        self.inner.read().await.by_channel.len()
    }

    /// Periodically auto-stop sessions that stopped receiving frames,
    /// mirroring the capacity ceiling. Disabled when the idle timeout is 0.
    pub fn start_idle_sweep(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            if self.idle_timeout.is_zero() {
                return;
            }

            let period = Duration::from_secs(self.idle_timeout.as_secs().div_ceil(4).max(1));
            let mut interval = tokio::time::interval(period);
            interval.tick().await;

            loop {
                interval.tick().await;
                self.sweep_idle().await;
            }
        })
    }

    async fn sweep_idle(&self) {
        let candidates: Vec<(SessionId, Arc<Mutex<Session>>)> = {
            let inner = self.inner.read().await;
            inner
                .index
                .iter()
                .filter_map(|(id, channel)| {
                    inner
                        .by_channel
                        .get(channel)
                        .map(|arc| (*id, Arc::clone(arc)))
                })
                .collect()
        };

        for (id, session_arc) in candidates {
            let mut session = session_arc.lock().await;

            if !matches!(session.state, SessionState::Recording(_)) {
                continue;
            }
            if session.last_frame_at.elapsed() < self.idle_timeout {
                continue;
            }

            warn!(
                "Session {} received no frames for {:?}, auto-stopping",
                id, self.idle_timeout
            );
            match self.finish_recording(id, &session_arc, &mut session).await {
                Ok(()) => {}
                Err(SessionError::EmptyRecording { .. }) => {
                    info!("Session {} discarded: idle with no usable audio", id);
                }
                Err(e) => warn!("Idle auto-stop failed for session {}: {}", id, e),
            }
        }
    }

    async fn get(&self, id: SessionId) -> Result<Arc<Mutex<Session>>, SessionError> {
        let inner = self.inner.read().await;
        let channel = inner
            .index
            .get(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        inner
            .by_channel
            .get(channel)
            .cloned()
            .ok_or(SessionError::UnknownSession(id))
    }

    /// Finalize the capture buffer and launch the pipeline. Callers hold
    /// the session lock; the lock order is always session before inner.
    async fn finish_recording(
        &self,
        id: SessionId,
        session_arc: &Arc<Mutex<Session>>,
        session: &mut Session,
    ) -> Result<(), SessionError> {
        let state = mem::replace(
            &mut session.state,
            SessionState::Transcribing {
                samples: Arc::new(Vec::new()),
            },
        );

        let capture = match state {
            SessionState::Recording(capture) => capture,
            other => {
                session.state = other;
                return Err(SessionError::NotRecording(id));
            }
        };

        if capture.below_minimum() {
            let got_secs = capture.duration_secs();
            let min_secs = capture.min_duration_secs();
            info!(
                "Session {} stopped with only {:.1}s of audio, discarding",
                id, got_secs
            );

            let mut inner = self.inner.write().await;
            if let Some(channel) = inner.index.remove(&id) {
                inner.by_channel.remove(&channel);
            }
            return Err(SessionError::EmptyRecording { got_secs, min_secs });
        }

        let captured_secs = capture.duration_secs();
        let samples = Arc::new(capture.finalize());

        session.captured_secs = captured_secs;
        session.stopped_at = Some(Utc::now());
        session.state = SessionState::Transcribing {
            samples: Arc::clone(&samples),
        };

        info!(
            "Session {} recording finished: {:.1}s captured",
            id, captured_secs
        );

        self.spawn_pipeline(id, session_arc, ResumeData::Transcribe { samples })
            .await;
        Ok(())
    }

    async fn spawn_pipeline(
        &self,
        id: SessionId,
        session_arc: &Arc<Mutex<Session>>,
        entry: ResumeData,
    ) {
        let task = tokio::spawn(
            Arc::clone(&self.pipeline).run(Arc::clone(session_arc), entry),
        );
        self.inner.write().await.tasks.insert(id, task);
    }
}
