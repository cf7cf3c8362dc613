use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::frame::AudioFrame;
use crate::error::SessionError;

/// Capture limits, taken from the audio section of the service config.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Normalized rate of the accumulated buffer
    pub sample_rate: u32,
    /// Hard ceiling on accumulated audio
    pub max_duration_secs: u64,
    /// Below this the recording counts as empty
    pub min_duration_secs: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            max_duration_secs: 3600,
            min_duration_secs: 1.0,
        }
    }
}

/// Outcome of appending one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Frame stored, capacity remains
    Stored,
    /// The duration ceiling was reached while storing this frame; the
    /// session must stop now. Excess samples past the ceiling are dropped.
    CeilingReached,
}

/// Accumulates incoming frames into a normalized mono buffer.
///
/// The ceiling is enforced by counting accumulated samples, not wall-clock
/// time, so backlogged delivery cannot silently exceed the limit. Frames
/// must arrive in sequence order; reordering is not repaired here.
pub struct AudioCapture {
    config: CaptureConfig,
    samples: Vec<i16>,
    max_samples: usize,
    next_sequence: u64,
}

impl AudioCapture {
    pub fn new(config: CaptureConfig) -> Self {
        let max_samples = config.max_duration_secs as usize * config.sample_rate as usize;
        Self {
            config,
            samples: Vec::new(),
            max_samples,
            next_sequence: 0,
        }
    }

    /// Append a frame, normalizing it to the target rate and mono layout.
    pub fn push(&mut self, frame: &AudioFrame) -> Result<PushOutcome, SessionError> {
        if frame.sequence != self.next_sequence {
            return Err(SessionError::OutOfOrderFrame {
                expected: self.next_sequence,
                got: frame.sequence,
            });
        }
        self.next_sequence += 1;

        let mono = downmix_to_mono(&frame.samples, frame.channels);
        let normalized = resample(&mono, frame.sample_rate, self.config.sample_rate);

        let remaining = self.max_samples.saturating_sub(self.samples.len());
        if normalized.len() >= remaining {
            self.samples.extend_from_slice(&normalized[..remaining]);
            debug!(
                "capture ceiling reached at {} samples ({}s)",
                self.samples.len(),
                self.config.max_duration_secs
            );
            return Ok(PushOutcome::CeilingReached);
        }

        self.samples.extend_from_slice(&normalized);
        Ok(PushOutcome::Stored)
    }

    /// Duration of the accumulated buffer in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.config.sample_rate as f64
    }

    /// Whether the buffer is below the minimum usable duration.
    pub fn below_minimum(&self) -> bool {
        self.duration_secs() < self.config.min_duration_secs
    }

    pub fn min_duration_secs(&self) -> f64 {
        self.config.min_duration_secs
    }

    /// Consume the capture and hand back the normalized buffer.
    pub fn finalize(self) -> Vec<i16> {
        self.samples
    }
}

/// Write a finalized mono buffer as a 16-bit WAV file.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    for &sample in samples {
        writer
            .write_sample(sample)
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;
    Ok(())
}

/// Sum interleaved channels down to mono with clipping.
pub(crate) fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / channels);

    for chunk in samples.chunks_exact(channels) {
        let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    mono
}

/// Resample a mono buffer by nearest-sample index mapping.
///
/// Duration is preserved exactly in the output sample count, which the
/// ceiling accounting depends on.
pub(crate) fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src = (i as u64 * from_rate as u64 / to_rate as u64) as usize;
        out.push(samples[src.min(samples.len() - 1)]);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence: u64, samples: Vec<i16>, sample_rate: u32, channels: u16) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate,
            channels,
            sequence,
            speaker: None,
        }
    }

    #[test]
    fn test_downmix_stereo_sums_channels() {
        let mono = downmix_to_mono(&[100, 50, 200, 100, 300, 150], 2);
        assert_eq!(mono, vec![150, 300, 450]);
    }

    #[test]
    fn test_downmix_clips_at_i16_range() {
        let mono = downmix_to_mono(&[i16::MAX - 100, 200], 2);
        assert_eq!(mono, vec![i16::MAX]);
    }

    #[test]
    fn test_resample_halves_sample_count() {
        let out = resample(&[1, 2, 3, 4, 5, 6, 7, 8], 32000, 16000);
        assert_eq!(out.len(), 4);
        assert_eq!(out, vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_resample_non_integer_ratio_preserves_duration() {
        // 1 second at 44.1kHz must become 1 second at 16kHz
        let input = vec![0i16; 44100];
        let out = resample(&input, 44100, 16000);
        assert_eq!(out.len(), 16000);
    }

    #[test]
    fn test_push_rejects_out_of_order_frames() {
        let mut capture = AudioCapture::new(CaptureConfig::default());
        capture.push(&frame(0, vec![0; 160], 16000, 1)).unwrap();

        let err = capture.push(&frame(2, vec![0; 160], 16000, 1)).unwrap_err();
        assert!(matches!(
            err,
            SessionError::OutOfOrderFrame { expected: 1, got: 2 }
        ));
    }

    #[test]
    fn test_push_truncates_at_ceiling() {
        let config = CaptureConfig {
            sample_rate: 16000,
            max_duration_secs: 1,
            min_duration_secs: 0.5,
        };
        let mut capture = AudioCapture::new(config);

        // 0.9s fits, the next 0.2s frame crosses the ceiling
        assert_eq!(
            capture.push(&frame(0, vec![0; 14400], 16000, 1)).unwrap(),
            PushOutcome::Stored
        );
        assert_eq!(
            capture.push(&frame(1, vec![0; 3200], 16000, 1)).unwrap(),
            PushOutcome::CeilingReached
        );

        let samples = capture.finalize();
        assert_eq!(samples.len(), 16000, "buffer never exceeds the ceiling");
    }

    #[test]
    fn test_duration_tracks_normalized_samples() {
        let mut capture = AudioCapture::new(CaptureConfig::default());

        // 48kHz stereo frame: 9600 interleaved samples = 100ms
        capture.push(&frame(0, vec![0; 9600], 48000, 2)).unwrap();
        assert!((capture.duration_secs() - 0.1).abs() < 1e-6);
    }
}
