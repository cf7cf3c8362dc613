use crate::error::ModelError;
use crate::transcribe::TimedSegment;

/// Speech-to-text capability contract.
///
/// Weight formats and GPU offload mechanics stay inside the
/// implementation; the core only drives this lifecycle.
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Make the model resident. Idempotent.
    async fn load(&mut self) -> Result<(), ModelError>;

    /// Transcribe a normalized mono buffer into ordered segments.
    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Vec<TimedSegment>, ModelError>;

    /// Release the weights. Idempotent.
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &str;
}

/// Language-model capability contract.
#[async_trait::async_trait]
pub trait LanguageEngine: Send + Sync {
    /// Make the model resident. Idempotent.
    async fn load(&mut self) -> Result<(), ModelError>;

    /// Run one completion over the prompt and return the raw model text.
    async fn complete(&mut self, prompt: &str) -> Result<String, ModelError>;

    /// Release the weights. Idempotent.
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    /// Engine name for logging
    fn name(&self) -> &str;
}
