//! Model lifecycle management.
//!
//! Two heavyweight models share one memory budget. Engines implement the
//! load/infer/unload contract; the manager arbitrates which one is
//! resident and serializes inference across sessions.

pub mod cli;
pub mod engine;
pub mod manager;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use cli::{LlamaCliEngine, WhisperCliEngine};
pub use engine::{LanguageEngine, SpeechEngine};
pub use manager::{ModelGuard, ModelManager};

/// The two resource classes arbitrated by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Speech,
    Language,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Speech => write!(f, "speech"),
            ModelKind::Language => write!(f, "language"),
        }
    }
}
