use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub models: ModelsConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Target sample rate for the capture buffer (Whisper expects 16kHz)
    #[serde(default = "defaults::sample_rate")]
    pub sample_rate: u32,

    /// Hard capture ceiling, counted in accumulated samples
    #[serde(default = "defaults::max_duration_secs")]
    pub max_duration_secs: u64,

    /// Recordings shorter than this are discarded as empty
    #[serde(default = "defaults::min_duration_secs")]
    pub min_duration_secs: f64,

    /// Auto-stop a session after this long without an incoming frame.
    /// 0 disables the idle sweep.
    #[serde(default = "defaults::idle_timeout_secs")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub speech: SpeechModelConfig,
    pub language: LanguageModelConfig,

    /// Best-effort deadline for a single inference call
    #[serde(default = "defaults::inference_timeout_secs")]
    pub inference_timeout_secs: u64,

    /// Keep the last-used engine warm until the opposite kind needs the
    /// memory budget, instead of unloading at refcount zero.
    #[serde(default)]
    pub keep_resident: bool,
}

/// Opaque tuning values handed to the speech engine.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechModelConfig {
    /// whisper.cpp sidecar binary
    pub binary_path: String,
    /// GGML/GGUF weight file
    pub model_path: String,
    #[serde(default = "defaults::language")]
    pub language: String,
    #[serde(default = "defaults::threads")]
    pub threads: u32,
}

/// Opaque tuning values handed to the language engine.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageModelConfig {
    /// llama.cpp sidecar binary
    pub binary_path: String,
    /// GGUF weight file
    pub model_path: String,
    #[serde(default = "defaults::context_window")]
    pub context_window: u32,
    #[serde(default = "defaults::gpu_layers")]
    pub gpu_layers: u32,
    #[serde(default = "defaults::threads")]
    pub threads: u32,
    #[serde(default = "defaults::max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "defaults::temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory for persisted meeting documents
    pub path: String,

    /// Finished meetings are kept this many days before pruning
    #[serde(default = "defaults::retention_days")]
    pub retention_days: u32,

    /// Where to keep the finalized WAV while a session is retryable.
    /// Unset disables recording artifacts.
    #[serde(default)]
    pub artifacts_path: Option<String>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::sample_rate(),
            max_duration_secs: defaults::max_duration_secs(),
            min_duration_secs: defaults::min_duration_secs(),
            idle_timeout_secs: defaults::idle_timeout_secs(),
        }
    }
}

mod defaults {
    pub fn sample_rate() -> u32 {
        16000
    }
    pub fn max_duration_secs() -> u64 {
        3600
    }
    pub fn min_duration_secs() -> f64 {
        1.0
    }
    pub fn idle_timeout_secs() -> u64 {
        120
    }
    pub fn inference_timeout_secs() -> u64 {
        600
    }
    pub fn language() -> String {
        "en".to_string()
    }
    pub fn threads() -> u32 {
        8
    }
    pub fn context_window() -> u32 {
        2048
    }
    pub fn gpu_layers() -> u32 {
        1
    }
    pub fn max_tokens() -> u32 {
        800
    }
    pub fn temperature() -> f32 {
        0.3
    }
    pub fn retention_days() -> u32 {
        30
    }
}
