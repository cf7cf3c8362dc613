//! Typed error taxonomy for the orchestration core.
//!
//! Stage-local failures are surfaced to the adapter with enough detail to
//! decide retry vs. abandon; they never cross sessions and never take the
//! process down.

use thiserror::Error;

use crate::models::ModelKind;
use crate::session::{ChannelId, SessionId};
use crate::store::MeetingId;

/// Errors from the model layer (loading, inference, timeouts).
#[derive(Debug, Error)]
pub enum ModelError {
    /// Weight files missing or incompatible. Fatal for the stage, not the process.
    #[error("failed to load {kind} model: {reason}")]
    Load { kind: ModelKind, reason: String },

    #[error("{kind} inference failed: {reason}")]
    Inference { kind: ModelKind, reason: String },

    /// Best-effort inference deadline elapsed.
    #[error("{kind} inference timed out after {seconds}s")]
    Timeout { kind: ModelKind, seconds: u64 },
}

/// Errors from the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("meeting {0} not found")]
    NotFound(MeetingId),

    #[error("storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt meeting document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors surfaced by the session state machine.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a meeting is already being recorded in channel {0}")]
    AlreadyActive(ChannelId),

    #[error("no active session {0}")]
    UnknownSession(SessionId),

    /// Less than the minimum duration of audio was captured; the session
    /// returns to idle without invoking transcription.
    #[error("recording too short: {got_secs:.1}s captured, minimum is {min_secs:.1}s")]
    EmptyRecording { got_secs: f64, min_secs: f64 },

    /// Frames must arrive in sequence order; reordering is an upstream defect.
    #[error("frame {got} arrived out of order (expected {expected})")]
    OutOfOrderFrame { expected: u64, got: u64 },

    /// A frame arrived after recording finished for this session.
    #[error("session {0} is no longer recording")]
    NotRecording(SessionId),

    #[error("session {0} is not in a retryable state")]
    NotRetryable(SessionId),

    /// The persistence retry budget is spent; only abandon remains.
    #[error("session {0} has exhausted its retry budget")]
    RetryExhausted(SessionId),

    #[error("transcription failed: {0}")]
    TranscriptionFailed(#[source] ModelError),

    #[error("note synthesis failed: {0}")]
    SynthesisFailed(#[source] ModelError),

    #[error("failed to persist meeting: {0}")]
    PersistenceFailed(#[source] StoreError),
}
