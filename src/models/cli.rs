//! Sidecar engines driving whisper.cpp and llama.cpp binaries.
//!
//! Inference runs in a child process per call, exchanging WAV/JSON files
//! through the system temp directory. `load` validates the binary and
//! weight paths and claims residency; the weights themselves are mapped
//! by the sidecar for the duration of each invocation.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info};

use super::engine::{LanguageEngine, SpeechEngine};
use super::ModelKind;
use crate::audio::write_wav;
use crate::config::{LanguageModelConfig, SpeechModelConfig};
use crate::error::ModelError;
use crate::transcribe::TimedSegment;

fn check_paths(kind: ModelKind, binary: &str, model: &str) -> Result<(), ModelError> {
    if !Path::new(binary).exists() {
        return Err(ModelError::Load {
            kind,
            reason: format!("sidecar binary not found: {}", binary),
        });
    }
    if !Path::new(model).exists() {
        return Err(ModelError::Load {
            kind,
            reason: format!("model weights not found: {}", model),
        });
    }
    Ok(())
}

fn scratch_path(prefix: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}.{}", prefix, uuid::Uuid::new_v4(), ext))
}

// ---------------------------------------------------------------------------
// whisper.cpp
// ---------------------------------------------------------------------------

/// whisper.cpp JSON output (`-oj`): offsets are milliseconds.
#[derive(Debug, Deserialize)]
struct WhisperOutput {
    transcription: Vec<WhisperSegment>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    offsets: WhisperOffsets,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

pub struct WhisperCliEngine {
    config: SpeechModelConfig,
    loaded: bool,
}

impl WhisperCliEngine {
    pub fn new(config: SpeechModelConfig) -> Self {
        Self {
            config,
            loaded: false,
        }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for WhisperCliEngine {
    async fn load(&mut self) -> Result<(), ModelError> {
        if self.loaded {
            return Ok(());
        }
        check_paths(
            ModelKind::Speech,
            &self.config.binary_path,
            &self.config.model_path,
        )?;
        info!("Speech model ready: {}", self.config.model_path);
        self.loaded = true;
        Ok(())
    }

    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Vec<TimedSegment>, ModelError> {
        let inference = |reason: String| ModelError::Inference {
            kind: ModelKind::Speech,
            reason,
        };

        if !self.loaded {
            return Err(inference("engine not loaded".to_string()));
        }

        let wav_path = scratch_path("scribe-audio", "wav");
        write_wav(&wav_path, samples, sample_rate)
            .map_err(|e| inference(format!("failed to stage audio: {}", e)))?;

        // `-of` takes the output prefix; `-oj` appends .json
        let out_prefix = scratch_path("scribe-transcript", "out");
        let output = Command::new(&self.config.binary_path)
            .arg("-m")
            .arg(&self.config.model_path)
            .arg("-f")
            .arg(&wav_path)
            .arg("-l")
            .arg(&self.config.language)
            .arg("-t")
            .arg(self.config.threads.to_string())
            .arg("-oj")
            .arg("-of")
            .arg(&out_prefix)
            .output()
            .await
            .map_err(|e| inference(format!("failed to run whisper sidecar: {}", e)))?;

        let _ = tokio::fs::remove_file(&wav_path).await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(inference(format!("whisper sidecar failed: {}", stderr)));
        }

        let json_path = out_prefix.with_extension("out.json");
        let raw = tokio::fs::read_to_string(&json_path)
            .await
            .map_err(|e| inference(format!("missing transcript output: {}", e)))?;
        let _ = tokio::fs::remove_file(&json_path).await;

        let parsed: WhisperOutput = serde_json::from_str(&raw)
            .map_err(|e| inference(format!("unparseable transcript output: {}", e)))?;

        let segments = parsed
            .transcription
            .into_iter()
            .map(|s| TimedSegment {
                start_secs: s.offsets.from as f64 / 1000.0,
                end_secs: s.offsets.to as f64 / 1000.0,
                text: s.text.trim().to_string(),
                speaker: None,
            })
            .collect();

        debug!("whisper sidecar produced transcript");
        Ok(segments)
    }

    fn unload(&mut self) {
        if self.loaded {
            info!("Released speech model");
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn name(&self) -> &str {
        "whisper-cli"
    }
}

// ---------------------------------------------------------------------------
// llama.cpp
// ---------------------------------------------------------------------------

pub struct LlamaCliEngine {
    config: LanguageModelConfig,
    loaded: bool,
}

impl LlamaCliEngine {
    pub fn new(config: LanguageModelConfig) -> Self {
        Self {
            config,
            loaded: false,
        }
    }
}

#[async_trait::async_trait]
impl LanguageEngine for LlamaCliEngine {
    async fn load(&mut self) -> Result<(), ModelError> {
        if self.loaded {
            return Ok(());
        }
        check_paths(
            ModelKind::Language,
            &self.config.binary_path,
            &self.config.model_path,
        )?;
        info!("Language model ready: {}", self.config.model_path);
        self.loaded = true;
        Ok(())
    }

    async fn complete(&mut self, prompt: &str) -> Result<String, ModelError> {
        let inference = |reason: String| ModelError::Inference {
            kind: ModelKind::Language,
            reason,
        };

        if !self.loaded {
            return Err(inference("engine not loaded".to_string()));
        }

        // Prompt goes through a file; transcripts overflow argv limits
        let prompt_path = scratch_path("scribe-prompt", "txt");
        tokio::fs::write(&prompt_path, prompt)
            .await
            .map_err(|e| inference(format!("failed to stage prompt: {}", e)))?;

        let output = Command::new(&self.config.binary_path)
            .arg("-m")
            .arg(&self.config.model_path)
            .arg("-f")
            .arg(&prompt_path)
            .arg("-n")
            .arg(self.config.max_tokens.to_string())
            .arg("-c")
            .arg(self.config.context_window.to_string())
            .arg("-ngl")
            .arg(self.config.gpu_layers.to_string())
            .arg("-t")
            .arg(self.config.threads.to_string())
            .arg("--temp")
            .arg(self.config.temperature.to_string())
            .arg("--no-display-prompt")
            .output()
            .await
            .map_err(|e| inference(format!("failed to run llama sidecar: {}", e)))?;

        let _ = tokio::fs::remove_file(&prompt_path).await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(inference(format!("llama sidecar failed: {}", stderr)));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            return Err(inference("sidecar produced no output".to_string()));
        }

        debug!("llama sidecar produced {} chars", text.len());
        Ok(text)
    }

    fn unload(&mut self) {
        if self.loaded {
            info!("Released language model");
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn name(&self) -> &str {
        "llama-cli"
    }
}
