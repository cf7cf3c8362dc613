use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audio::AudioCapture;
use crate::store::{Meeting, MeetingId};
use crate::transcribe::TimedSegment;

pub type ChannelId = String;
pub type SessionId = uuid::Uuid;

/// The pipeline stage a session failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    Transcribing,
    Synthesizing,
    Saving,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailedStage::Transcribing => write!(f, "transcribing"),
            FailedStage::Synthesizing => write!(f, "synthesizing"),
            FailedStage::Saving => write!(f, "saving"),
        }
    }
}

/// Everything needed to re-run a stage without re-deriving upstream work:
/// the raw audio for transcription, the transcript for synthesis, the
/// built meeting for persistence.
#[derive(Debug, Clone)]
pub enum ResumeData {
    Transcribe {
        samples: Arc<Vec<i16>>,
    },
    Synthesize {
        transcript: Vec<TimedSegment>,
    },
    Save {
        meeting: Meeting,
        /// Remaining persistence retries before only abandon is left
        retries_left: u8,
    },
}

impl ResumeData {
    pub fn stage(&self) -> FailedStage {
        match self {
            ResumeData::Transcribe { .. } => FailedStage::Transcribing,
            ResumeData::Synthesize { .. } => FailedStage::Synthesizing,
            ResumeData::Save { .. } => FailedStage::Saving,
        }
    }
}

/// Session state, tagged with the data each stage owns.
pub enum SessionState {
    Recording(AudioCapture),
    Transcribing { samples: Arc<Vec<i16>> },
    Synthesizing { transcript: Vec<TimedSegment> },
    Saving { meeting: Meeting },
    Failed { error: String, resume: ResumeData },
    Complete { meeting_id: MeetingId },
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            SessionState::Recording(_) => SessionPhase::Recording,
            SessionState::Transcribing { .. } => SessionPhase::Transcribing,
            SessionState::Synthesizing { .. } => SessionPhase::Synthesizing,
            SessionState::Saving { .. } => SessionPhase::Saving,
            SessionState::Failed { .. } => SessionPhase::Failed,
            SessionState::Complete { .. } => SessionPhase::Complete,
        }
    }
}

/// Externally visible phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Recording,
    Transcribing,
    Synthesizing,
    Saving,
    Failed,
    Complete,
}

/// Status snapshot returned by the `status` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub id: SessionId,
    pub channel: ChannelId,
    pub name: String,
    pub phase: SessionPhase,
    pub started_at: DateTime<Utc>,
    pub captured_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<FailedStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
