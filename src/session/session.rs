use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::info;

use super::state::{ChannelId, SessionId, SessionState, SessionStatus};
use crate::audio::{AudioCapture, AudioFrame, CaptureConfig, PushOutcome};
use crate::error::SessionError;

/// One meeting's recording-to-notes pipeline instance.
///
/// Owned by the registry behind a mutex; the capture buffer, transcript,
/// and notes inside the state are never shared across sessions.
pub struct Session {
    pub id: SessionId,
    pub channel: ChannelId,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub(crate) state: SessionState,
    /// Set when recording finishes; the meeting's end timestamp
    pub(crate) stopped_at: Option<DateTime<Utc>>,
    /// Duration of the finalized buffer, for status after Recording
    pub(crate) captured_secs: f64,
    /// Feeds the idle auto-stop sweep
    pub(crate) last_frame_at: Instant,
}

impl Session {
    pub(crate) fn new(channel: ChannelId, name: Option<String>, capture: CaptureConfig) -> Self {
        let started_at = Utc::now();
        let name =
            name.unwrap_or_else(|| format!("Meeting-{}", started_at.format("%Y%m%d-%H%M%S")));
        let id = uuid::Uuid::new_v4();

        info!("Session {} created for channel {}: {}", id, channel, name);

        Self {
            id,
            channel,
            name,
            started_at,
            state: SessionState::Recording(AudioCapture::new(capture)),
            stopped_at: None,
            captured_secs: 0.0,
            last_frame_at: Instant::now(),
        }
    }

    /// Append a frame to the capture buffer. Only valid while recording.
    pub(crate) fn push_frame(&mut self, frame: &AudioFrame) -> Result<PushOutcome, SessionError> {
        let capture = match &mut self.state {
            SessionState::Recording(capture) => capture,
            _ => return Err(SessionError::NotRecording(self.id)),
        };

        let outcome = capture.push(frame)?;
        self.last_frame_at = Instant::now();
        Ok(outcome)
    }

    pub(crate) fn captured_secs(&self) -> f64 {
        match &self.state {
            SessionState::Recording(capture) => capture.duration_secs(),
            _ => self.captured_secs,
        }
    }

    pub(crate) fn status(&self) -> SessionStatus {
        let (failed_stage, error) = match &self.state {
            SessionState::Failed { error, resume } => {
                (Some(resume.stage()), Some(error.clone()))
            }
            _ => (None, None),
        };

        SessionStatus {
            id: self.id,
            channel: self.channel.clone(),
            name: self.name.clone(),
            phase: self.state.phase(),
            started_at: self.started_at,
            captured_secs: self.captured_secs(),
            failed_stage,
            error,
        }
    }
}
