use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::engine::{LanguageEngine, SpeechEngine};
use super::ModelKind;
use crate::error::ModelError;

struct Engines {
    speech: Box<dyn SpeechEngine>,
    language: Box<dyn LanguageEngine>,
    resident: Option<ModelKind>,
    refs: usize,
}

impl Engines {
    fn unload(&mut self, kind: ModelKind) {
        match kind {
            ModelKind::Speech => self.speech.unload(),
            ModelKind::Language => self.language.unload(),
        }
    }
}

/// Process-wide arbiter for the two heavyweight models.
///
/// `acquire` waits on a fair mutex, so concurrent requests from different
/// sessions are served in arrival order and at most one inference runs at
/// a time. At most one model kind is resident: acquiring one kind evicts
/// the other before loading. Dropping the guard releases the reference;
/// at refcount zero the engine is unloaded immediately unless
/// `keep_resident` keeps it warm for the next same-kind acquisition.
pub struct ModelManager {
    engines: Arc<Mutex<Engines>>,
    keep_resident: bool,
}

impl ModelManager {
    pub fn new(
        speech: Box<dyn SpeechEngine>,
        language: Box<dyn LanguageEngine>,
        keep_resident: bool,
    ) -> Self {
        Self {
            engines: Arc::new(Mutex::new(Engines {
                speech,
                language,
                resident: None,
                refs: 0,
            })),
            keep_resident,
        }
    }

    /// Wait for the model slot, ensure `kind` is resident, and return an
    /// exclusive guard over its engine.
    ///
    /// Cancellation-safe: a waiter dropped before the lock is granted
    /// leaves no side effects.
    pub async fn acquire(&self, kind: ModelKind) -> Result<ModelGuard, ModelError> {
        let mut engines = self.engines.clone().lock_owned().await;

        if engines.resident != Some(kind) {
            if let Some(previous) = engines.resident.take() {
                info!("Unloading {} model to make room for {}", previous, kind);
                engines.unload(previous);
            }

            match kind {
                ModelKind::Speech => {
                    info!("Loading {} model ({})", kind, engines.speech.name());
                    engines.speech.load().await?;
                }
                ModelKind::Language => {
                    info!("Loading {} model ({})", kind, engines.language.name());
                    engines.language.load().await?;
                }
            }
            engines.resident = Some(kind);
        } else {
            debug!("{} model already resident", kind);
        }

        engines.refs += 1;

        Ok(ModelGuard {
            engines,
            kind,
            eager_unload: !self.keep_resident,
        })
    }

    /// Which model is currently resident, if any.
    pub async fn resident(&self) -> Option<ModelKind> {
        self.engines.lock().await.resident
    }
}

/// Exclusive access to a loaded engine. Holding the guard holds the model
/// slot; dropping it releases the reference and, under the eager policy,
/// unloads the engine.
pub struct ModelGuard {
    engines: OwnedMutexGuard<Engines>,
    kind: ModelKind,
    eager_unload: bool,
}

impl ModelGuard {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// The speech engine. Panics if the guard was acquired for the
    /// language kind; callers always match the acquire kind.
    pub fn speech(&mut self) -> &mut dyn SpeechEngine {
        assert_eq!(self.kind, ModelKind::Speech);
        &mut *self.engines.speech
    }

    /// The language engine. Panics if the guard was acquired for the
    /// speech kind.
    pub fn language(&mut self) -> &mut dyn LanguageEngine {
        assert_eq!(self.kind, ModelKind::Language);
        &mut *self.engines.language
    }
}

impl Drop for ModelGuard {
    fn drop(&mut self) {
        self.engines.refs = self.engines.refs.saturating_sub(1);

        if self.engines.refs == 0 && self.eager_unload {
            debug!("Eagerly unloading {} model", self.kind);
            let kind = self.kind;
            self.engines.unload(kind);
            self.engines.resident = None;
        }
    }
}
