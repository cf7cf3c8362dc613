//! Session orchestration.
//!
//! The registry holds one live session per channel and drives each
//! through Recording → Transcribing → Synthesizing → Saving, with
//! `Failed` reachable from every processing stage and retry re-entering
//! only the failed stage.

mod pipeline;
mod registry;
mod session;
mod state;

pub use pipeline::{PipelineConfig, SessionEvent};
pub use registry::{FrameAck, SessionRegistry};
pub use session::Session;
pub use state::{
    ChannelId, FailedStage, ResumeData, SessionId, SessionPhase, SessionState, SessionStatus,
};
