use super::state::AppState;
use crate::audio::AudioFrame;
use crate::error::{SessionError, StoreError};
use crate::session::{FrameAck, SessionId, SessionStatus};
use crate::store::{MeetingId, MeetingStore};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Voice channel to record
    pub channel: String,

    /// Optional meeting name (if not provided, one is generated)
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: SessionId,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct PushFrameRequest {
    /// Position in the frame stream, starting at 0
    pub sequence: u64,

    /// Base64-encoded little-endian i16 PCM
    pub pcm: String,

    pub sample_rate: u32,
    pub channels: u16,
    pub speaker: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: SessionId,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListMeetingsQuery {
    pub channel: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn session_error_response(err: SessionError) -> axum::response::Response {
    let status = match &err {
        SessionError::AlreadyActive(_)
        | SessionError::NotRecording(_)
        | SessionError::NotRetryable(_)
        | SessionError::RetryExhausted(_) => StatusCode::CONFLICT,
        SessionError::UnknownSession(_) => StatusCode::NOT_FOUND,
        SessionError::EmptyRecording { .. } | SessionError::OutOfOrderFrame { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::TranscriptionFailed(_)
        | SessionError::SynthesisFailed(_)
        | SessionError::PersistenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Start recording a meeting in a channel
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    info!("Starting session for channel: {}", req.channel);

    match state.registry.start(req.channel, req.name).await {
        Ok(session_id) => (
            StatusCode::OK,
            Json(StartSessionResponse {
                session_id,
                status: "recording".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start session: {}", e);
            session_error_response(e)
        }
    }
}

/// POST /sessions/:session_id/frames
/// Push one audio frame into a recording session
pub async fn push_frame(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    Json(req): Json<PushFrameRequest>,
) -> impl IntoResponse {
    let pcm_bytes = match base64::engine::general_purpose::STANDARD.decode(&req.pcm) {
        Ok(bytes) => bytes,
        Err(e) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: format!("Invalid base64 PCM: {}", e),
                }),
            )
                .into_response();
        }
    };

    if pcm_bytes.len() % 2 != 0 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "PCM byte length must be even (16-bit samples)".to_string(),
            }),
        )
            .into_response();
    }

    let samples: Vec<i16> = pcm_bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect();

    let frame = AudioFrame {
        samples,
        sample_rate: req.sample_rate,
        channels: req.channels,
        sequence: req.sequence,
        speaker: req.speaker,
    };

    match state.registry.push_frame(session_id, frame).await {
        Ok(ack) => (StatusCode::OK, Json::<FrameAck>(ack)).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /sessions/:session_id/stop
/// Stop recording; the meeting is delivered on the completion channel
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> impl IntoResponse {
    info!("Stopping session: {}", session_id);

    match state.registry.stop(session_id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(StopSessionResponse {
                session_id,
                status: "processing".to_string(),
                message: "Recording stopped, generating meeting notes".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error_response(e),
    }
}

/// GET /sessions/:session_id
/// Status snapshot of a session
pub async fn session_status(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> impl IntoResponse {
    match state.registry.status(session_id).await {
        Ok(status) => (StatusCode::OK, Json::<SessionStatus>(status)).into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /sessions/:session_id/retry
/// Re-run the failed stage of a parked session
pub async fn retry_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> impl IntoResponse {
    info!("Retrying session: {}", session_id);

    match state.registry.retry(session_id).await {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(StopSessionResponse {
                session_id,
                status: "processing".to_string(),
                message: "Retrying failed stage".to_string(),
            }),
        )
            .into_response(),
        Err(e) => session_error_response(e),
    }
}

/// POST /sessions/:session_id/abandon
/// Discard a session and all of its state
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
) -> impl IntoResponse {
    match state.registry.abandon(session_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => session_error_response(e),
    }
}

/// GET /meetings/:meeting_id
/// Load a persisted meeting
pub async fn get_meeting(
    State(state): State<AppState>,
    Path(meeting_id): Path<MeetingId>,
) -> impl IntoResponse {
    match state.store.load(meeting_id).await {
        Ok(meeting) => (StatusCode::OK, Json(meeting)).into_response(),
        Err(StoreError::NotFound(id)) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Meeting {} not found", id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to load meeting: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to load meeting: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /meetings?channel=...&limit=...
/// Most recent meetings for a channel
pub async fn list_meetings(
    State(state): State<AppState>,
    Query(query): Query<ListMeetingsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(5);

    match state.store.list_recent(&query.channel, limit).await {
        Ok(meetings) => (StatusCode::OK, Json(meetings)).into_response(),
        Err(e) => {
            error!("Failed to list meetings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to list meetings: {}", e),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
