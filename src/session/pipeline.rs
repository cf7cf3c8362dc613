use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info, warn};

use super::registry::RegistryInner;
use super::session::Session;
use super::state::{ChannelId, FailedStage, ResumeData, SessionId, SessionState};
use crate::audio::write_wav;
use crate::error::SessionError;
use crate::notes::NoteSynthesizer;
use crate::store::{Meeting, MeetingStore};
use crate::transcribe::Transcriber;

/// Persistence failures keep the meeting in memory for this many retries.
const SAVE_RETRY_BUDGET: u8 = 1;

/// Tuning for the processing stages, from the service config.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sample_rate: u32,
    pub inference_timeout: Duration,
    pub retention_days: u32,
    /// Finalized WAV kept here while the session is retryable
    pub artifacts_path: Option<PathBuf>,
}

/// Asynchronous completion callback payload delivered to the adapter.
#[derive(Debug)]
pub enum SessionEvent {
    /// The pipeline finished and the meeting is persisted.
    Completed {
        session_id: SessionId,
        channel: ChannelId,
        meeting: Meeting,
    },
    /// A stage failed; the session is parked in `Failed` awaiting
    /// `retry` or `abandon`.
    Failed {
        session_id: SessionId,
        channel: ChannelId,
        stage: FailedStage,
        error: SessionError,
    },
}

/// Drives a session through Transcribing → Synthesizing → Saving.
///
/// The session lock is held only for state updates; inference and I/O run
/// unlocked so frame ingestion on other sessions stays low-latency.
pub(crate) struct Pipeline {
    pub(crate) transcriber: Transcriber,
    pub(crate) synthesizer: NoteSynthesizer,
    pub(crate) store: Arc<dyn MeetingStore>,
    pub(crate) events: mpsc::Sender<SessionEvent>,
    /// Shared with the registry: completed sessions free their channel
    pub(crate) registry: Arc<tokio::sync::RwLock<RegistryInner>>,
    pub(crate) config: PipelineConfig,
}

impl Pipeline {
    /// Run the pipeline from the given entry point. A retry enters at the
    /// failed stage with the preserved data; nothing upstream re-runs.
    pub(crate) async fn run(self: Arc<Self>, session: Arc<Mutex<Session>>, entry: ResumeData) {
        let (session_id, channel, name, started_at, stopped_at) = {
            let s = session.lock().await;
            (
                s.id,
                s.channel.clone(),
                s.name.clone(),
                s.started_at,
                s.stopped_at.unwrap_or_else(Utc::now),
            )
        };

        let mut step = entry;
        loop {
            match step {
                ResumeData::Transcribe { samples } => {
                    self.write_artifact(session_id, &samples).await;
                    {
                        let mut s = session.lock().await;
                        s.state = SessionState::Transcribing {
                            samples: samples.clone(),
                        };
                    }

                    match self.transcriber.transcribe(&samples).await {
                        Ok(transcript) => {
                            step = ResumeData::Synthesize { transcript };
                        }
                        Err(e) => {
                            // Raw audio is preserved so retry skips re-capture
                            self.fail(
                                &session,
                                session_id,
                                &channel,
                                SessionError::TranscriptionFailed(e),
                                ResumeData::Transcribe { samples },
                            )
                            .await;
                            return;
                        }
                    }
                }

                ResumeData::Synthesize { transcript } => {
                    {
                        let mut s = session.lock().await;
                        s.state = SessionState::Synthesizing {
                            transcript: transcript.clone(),
                        };
                    }

                    match self.synthesizer.summarize(&transcript).await {
                        Ok(notes) => {
                            let retention = chrono::Duration::days(
                                self.config.retention_days as i64,
                            );
                            // The meeting id is the session id, so a
                            // retried save upserts the same document.
                            let meeting = Meeting {
                                id: session_id,
                                name: name.clone(),
                                channel: channel.clone(),
                                started_at,
                                ended_at: stopped_at,
                                transcript,
                                notes,
                                expires_at: stopped_at + retention,
                            };
                            step = ResumeData::Save {
                                meeting,
                                retries_left: SAVE_RETRY_BUDGET,
                            };
                        }
                        Err(e) => {
                            // Transcript preserved; retry skips transcription
                            self.fail(
                                &session,
                                session_id,
                                &channel,
                                SessionError::SynthesisFailed(e),
                                ResumeData::Synthesize { transcript },
                            )
                            .await;
                            return;
                        }
                    }
                }

                ResumeData::Save {
                    meeting,
                    retries_left,
                } => {
                    {
                        let mut s = session.lock().await;
                        s.state = SessionState::Saving {
                            meeting: meeting.clone(),
                        };
                    }

                    match self.store.save(&meeting).await {
                        Ok(meeting_id) => {
                            {
                                let mut s = session.lock().await;
                                s.state = SessionState::Complete { meeting_id };
                            }
                            self.remove_artifact(session_id).await;

                            // Terminal success frees the channel before the
                            // adapter hears about it, so a follow-up start
                            // cannot race AlreadyActive.
                            {
                                let mut inner = self.registry.write().await;
                                inner.index.remove(&session_id);
                                inner.by_channel.remove(&channel);
                                inner.tasks.remove(&session_id);
                            }

                            info!(
                                "Session {} complete: meeting {} persisted",
                                session_id, meeting_id
                            );
                            let _ = self
                                .events
                                .send(SessionEvent::Completed {
                                    session_id,
                                    channel,
                                    meeting,
                                })
                                .await;
                            return;
                        }
                        Err(e) => {
                            self.fail(
                                &session,
                                session_id,
                                &channel,
                                SessionError::PersistenceFailed(e),
                                ResumeData::Save {
                                    meeting,
                                    retries_left,
                                },
                            )
                            .await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn fail(
        &self,
        session: &Arc<Mutex<Session>>,
        session_id: SessionId,
        channel: &str,
        err: SessionError,
        resume: ResumeData,
    ) {
        let stage = resume.stage();
        error!("Session {} failed while {}: {}", session_id, stage, err);

        {
            let mut s = session.lock().await;
            s.state = SessionState::Failed {
                error: err.to_string(),
                resume,
            };
        }

        let _ = self
            .events
            .send(SessionEvent::Failed {
                session_id,
                channel: channel.to_string(),
                stage,
                error: err,
            })
            .await;
    }

    fn artifact_path(&self, session_id: SessionId) -> Option<PathBuf> {
        self.config
            .artifacts_path
            .as_ref()
            .map(|dir| dir.join(format!("recording-{}.wav", session_id)))
    }

    /// Keep the finalized buffer on disk while the session can still fail.
    /// Artifact trouble is logged, never fatal.
    async fn write_artifact(&self, session_id: SessionId, samples: &Arc<Vec<i16>>) {
        let Some(path) = self.artifact_path(session_id) else {
            return;
        };
        if path.exists() {
            return;
        }

        let samples = Arc::clone(samples);
        let sample_rate = self.config.sample_rate;
        let result = tokio::task::spawn_blocking(move || {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_wav(&path, &samples, sample_rate)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to write recording artifact: {}", e),
            Err(e) => warn!("Recording artifact task panicked: {}", e),
        }
    }

    async fn remove_artifact(&self, session_id: SessionId) {
        if let Some(path) = self.artifact_path(session_id) {
            let _ = tokio::fs::remove_file(path).await;
        }
    }
}
