pub mod capture;
pub mod file;
pub mod frame;

pub use capture::{write_wav, AudioCapture, CaptureConfig, PushOutcome};
pub use file::AudioFile;
pub use frame::AudioFrame;
