use serde::{Deserialize, Serialize};

/// Raw audio pushed in by the chat adapter (16-bit PCM, interleaved).
///
/// Frames carry whatever rate/channel layout the platform delivers; the
/// capture buffer normalizes them. Sequence numbers must be contiguous
/// per session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Position in the session's frame stream, starting at 0
    pub sequence: u64,
    /// Source identity (speaker tag), when the platform provides one
    pub speaker: Option<String>,
}
