use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use hound::WavReader;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::info;

use super::capture::{downmix_to_mono, resample};

/// A decoded on-disk recording, used by the offline ingest path.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    /// Decode an audio file. WAV goes through hound; everything else
    /// (M4A, MP3, FLAC, OGG) through symphonia.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        let (samples, sample_rate, channels) = if is_wav {
            Self::decode_wav(path)?
        } else {
            Self::decode_compressed(path)?
        };

        let duration_seconds =
            samples.len() as f64 / (sample_rate as f64 * channels.max(1) as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            sample_rate,
            channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate,
            channels,
            samples,
        })
    }

    /// Normalized copy of the samples, ready for the transcription stage.
    pub fn to_mono_16khz(&self) -> Vec<i16> {
        let mono = downmix_to_mono(&self.samples, self.channels);
        resample(&mono, self.sample_rate, 16000)
    }

    fn decode_wav(path: &Path) -> Result<(Vec<i16>, u32, u16)> {
        let reader = WavReader::open(path).context("Failed to open WAV file")?;
        let spec = reader.spec();

        let samples: Vec<i16> = match spec.sample_format {
            hound::SampleFormat::Int => reader
                .into_samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
        };

        Ok((samples, spec.sample_rate, spec.channels))
    }

    fn decode_compressed(path: &Path) -> Result<(Vec<i16>, u32, u16)> {
        let src = File::open(path).context("Failed to open audio file")?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unrecognized audio container")?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No decodable audio track")?;
        let track_id = track.id;

        let sample_rate = track
            .codec_params
            .sample_rate
            .context("Track has no sample rate")?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create decoder")?;

        let mut samples: Vec<i16> = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => bail!("Failed to read packet: {}", e),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buf =
                        SampleBuffer::<i16>::new(decoded.capacity() as u64, *decoded.spec());
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                // Recoverable decode errors skip the packet
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => bail!("Decode failure: {}", e),
            }
        }

        if samples.is_empty() {
            bail!("Audio file contains no samples");
        }

        Ok((samples, sample_rate, channels))
    }
}
