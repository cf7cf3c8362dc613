//! Speech-to-text stage.
//!
//! Wraps the speech engine behind the model manager and enforces the
//! segment contract: non-overlapping segments, monotonically
//! non-decreasing start offsets, full coverage of the input span with
//! silence as empty-text segments.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ModelError;
use crate::models::{ModelKind, ModelManager, SpeechEngine};

/// A time-bounded unit of transcribed text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
    pub speaker: Option<String>,
}

impl TimedSegment {
    pub fn is_silence(&self) -> bool {
        self.text.is_empty()
    }
}

/// Format seconds as an MM:SS transcript timestamp.
pub fn format_timestamp(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

pub struct Transcriber {
    manager: Arc<ModelManager>,
    sample_rate: u32,
    timeout: Duration,
}

impl Transcriber {
    pub fn new(manager: Arc<ModelManager>, sample_rate: u32, timeout: Duration) -> Self {
        Self {
            manager,
            sample_rate,
            timeout,
        }
    }

    /// Transcribe a finalized capture buffer into ordered segments.
    ///
    /// Queues on the model manager (FIFO across sessions), so concurrent
    /// sessions serialize here rather than inside the engine.
    pub async fn transcribe(&self, samples: &[i16]) -> Result<Vec<TimedSegment>, ModelError> {
        let duration_secs = samples.len() as f64 / self.sample_rate as f64;
        info!("Transcribing {:.1}s of audio", duration_secs);

        let mut guard = self.manager.acquire(ModelKind::Speech).await?;

        let segments = tokio::time::timeout(
            self.timeout,
            guard.speech().transcribe(samples, self.sample_rate),
        )
        .await
        .map_err(|_| ModelError::Timeout {
            kind: ModelKind::Speech,
            seconds: self.timeout.as_secs(),
        })??;

        let segments = enforce_contract(segments, duration_secs);
        info!("Transcription complete: {} segments", segments.len());
        Ok(segments)
    }
}

/// Repair minor contract violations from the engine and guarantee the
/// output covers `[0, duration]` with non-decreasing, non-overlapping
/// segments.
fn enforce_contract(raw: Vec<TimedSegment>, duration_secs: f64) -> Vec<TimedSegment> {
    // Gaps shorter than this are merged into the neighboring boundary
    // rather than materialized as silence.
    const GAP_EPSILON: f64 = 0.25;

    let mut out: Vec<TimedSegment> = Vec::with_capacity(raw.len() + 2);
    let mut cursor = 0.0_f64;

    for mut seg in raw {
        if seg.start_secs < cursor {
            warn!(
                "segment start {:.2}s behind cursor {:.2}s, clamping",
                seg.start_secs, cursor
            );
            seg.start_secs = cursor;
        }
        seg.start_secs = seg.start_secs.min(duration_secs);
        seg.end_secs = seg.end_secs.clamp(seg.start_secs, duration_secs);

        if seg.start_secs - cursor > GAP_EPSILON {
            out.push(TimedSegment {
                start_secs: cursor,
                end_secs: seg.start_secs,
                text: String::new(),
                speaker: None,
            });
        } else if seg.start_secs > cursor {
            seg.start_secs = cursor;
        }

        cursor = seg.end_secs;
        out.push(seg);
    }

    if duration_secs - cursor > GAP_EPSILON {
        out.push(TimedSegment {
            start_secs: cursor,
            end_secs: duration_secs,
            text: String::new(),
            speaker: None,
        });
    } else if let Some(last) = out.last_mut() {
        last.end_secs = duration_secs;
    }

    out
}
