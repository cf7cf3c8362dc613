pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod notes;
pub mod session;
pub mod store;
pub mod transcribe;

pub use audio::{AudioCapture, AudioFile, AudioFrame, CaptureConfig};
pub use config::Config;
pub use error::{ModelError, SessionError, StoreError};
pub use http::{create_router, AppState};
pub use models::{LanguageEngine, ModelKind, ModelManager, SpeechEngine};
pub use notes::{ActionItem, MeetingNotes, NoteSynthesizer};
pub use session::{
    FrameAck, PipelineConfig, SessionEvent, SessionId, SessionRegistry, SessionStatus,
};
pub use store::{FsMeetingStore, Meeting, MeetingId, MeetingStore};
pub use transcribe::{TimedSegment, Transcriber};
