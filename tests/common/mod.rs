// Shared test doubles: scripted inference engines and an in-memory store.
//
// The engines cover every orchestration path without real model weights:
// failure flags the test can flip, call counters, and configurable delays
// for observing in-flight state.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use meeting_scribe::error::{ModelError, StoreError};
use meeting_scribe::models::{LanguageEngine, ModelKind, ModelManager, SpeechEngine};
use meeting_scribe::session::{PipelineConfig, SessionEvent, SessionRegistry};
use meeting_scribe::store::{Meeting, MeetingId, MeetingStore, MeetingSummary};
use meeting_scribe::transcribe::TimedSegment;
use meeting_scribe::AudioFrame;
use meeting_scribe::config::AudioConfig;
use tokio::sync::{mpsc, Mutex};

/// Observable counters shared between a test and its engines.
#[derive(Default)]
pub struct EngineProbe {
    pub loads: AtomicUsize,
    pub unloads: AtomicUsize,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail: AtomicBool,
}

impl EngineProbe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn unloads(&self) -> usize {
        self.unloads.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MockSpeechEngine {
    probe: Arc<EngineProbe>,
    delay: Duration,
    loaded: bool,
}

impl MockSpeechEngine {
    pub fn new(probe: Arc<EngineProbe>, delay: Duration) -> Self {
        Self {
            probe,
            delay,
            loaded: false,
        }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for MockSpeechEngine {
    async fn load(&mut self) -> Result<(), ModelError> {
        self.probe.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded = true;
        Ok(())
    }

    async fn transcribe(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<Vec<TimedSegment>, ModelError> {
        self.probe.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.probe.exit();
        self.probe.calls.fetch_add(1, Ordering::SeqCst);

        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(ModelError::Inference {
                kind: ModelKind::Speech,
                reason: "scripted failure".to_string(),
            });
        }

        let duration = samples.len() as f64 / sample_rate as f64;
        Ok(vec![TimedSegment {
            start_secs: 0.0,
            end_secs: duration,
            text: "We agreed to ship the release on Friday.".to_string(),
            speaker: Some("ana".to_string()),
        }])
    }

    fn unload(&mut self) {
        if self.loaded {
            self.probe.unloads.fetch_add(1, Ordering::SeqCst);
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn name(&self) -> &str {
        "mock-speech"
    }
}

pub struct MockLanguageEngine {
    probe: Arc<EngineProbe>,
    delay: Duration,
    loaded: bool,
}

impl MockLanguageEngine {
    pub fn new(probe: Arc<EngineProbe>, delay: Duration) -> Self {
        Self {
            probe,
            delay,
            loaded: false,
        }
    }
}

#[async_trait::async_trait]
impl LanguageEngine for MockLanguageEngine {
    async fn load(&mut self) -> Result<(), ModelError> {
        self.probe.loads.fetch_add(1, Ordering::SeqCst);
        self.loaded = true;
        Ok(())
    }

    async fn complete(&mut self, _prompt: &str) -> Result<String, ModelError> {
        self.probe.enter();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.probe.exit();
        self.probe.calls.fetch_add(1, Ordering::SeqCst);

        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(ModelError::Inference {
                kind: ModelKind::Language,
                reason: "scripted failure".to_string(),
            });
        }

        Ok("Summary: The team agreed on the release plan.\n\n\
            Decisions:\n- Ship the release on Friday\n\n\
            Action Items:\n- Write the changelog (Sam)\n"
            .to_string())
    }

    fn unload(&mut self) {
        if self.loaded {
            self.probe.unloads.fetch_add(1, Ordering::SeqCst);
        }
        self.loaded = false;
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn name(&self) -> &str {
        "mock-language"
    }
}

/// In-memory store with a scripted failure flag.
#[derive(Default)]
pub struct MockStore {
    meetings: Mutex<HashMap<MeetingId, Meeting>>,
    pub saves: AtomicUsize,
    pub fail: AtomicBool,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn count(&self) -> usize {
        self.meetings.lock().await.len()
    }
}

#[async_trait::async_trait]
impl MeetingStore for MockStore {
    async fn save(&self, meeting: &Meeting) -> Result<MeetingId, StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("scripted failure")));
        }

        self.meetings
            .lock()
            .await
            .insert(meeting.id, meeting.clone());
        Ok(meeting.id)
    }

    async fn load(&self, id: MeetingId) -> Result<Meeting, StoreError> {
        self.meetings
            .lock()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn list_recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<MeetingSummary>, StoreError> {
        let meetings = self.meetings.lock().await;
        let mut summaries: Vec<MeetingSummary> = meetings
            .values()
            .filter(|m| m.channel == channel)
            .map(|m| MeetingSummary {
                id: m.id,
                name: m.name.clone(),
                started_at: m.started_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn prune_expired(&self) -> Result<usize, StoreError> {
        let mut meetings = self.meetings.lock().await;
        let before = meetings.len();
        meetings.retain(|_, m| m.expires_at > chrono::Utc::now());
        Ok(before - meetings.len())
    }
}

/// Everything a pipeline test needs in one bundle.
pub struct Harness {
    pub registry: Arc<SessionRegistry>,
    pub events: mpsc::Receiver<SessionEvent>,
    pub store: Arc<MockStore>,
    pub speech: Arc<EngineProbe>,
    pub language: Arc<EngineProbe>,
}

pub struct HarnessOptions {
    pub audio: AudioConfig,
    pub engine_delay: Duration,
    pub inference_timeout: Duration,
    pub keep_resident: bool,
    pub artifacts_path: Option<std::path::PathBuf>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            engine_delay: Duration::ZERO,
            inference_timeout: Duration::from_secs(600),
            keep_resident: false,
            artifacts_path: None,
        }
    }
}

pub fn harness(options: HarnessOptions) -> Harness {
    let speech = EngineProbe::new();
    let language = EngineProbe::new();
    let store = MockStore::new();

    let manager = Arc::new(ModelManager::new(
        Box::new(MockSpeechEngine::new(Arc::clone(&speech), options.engine_delay)),
        Box::new(MockLanguageEngine::new(
            Arc::clone(&language),
            options.engine_delay,
        )),
        options.keep_resident,
    ));

    let (registry, events) = SessionRegistry::new(
        &options.audio,
        manager,
        store.clone() as Arc<dyn MeetingStore>,
        PipelineConfig {
            sample_rate: options.audio.sample_rate,
            inference_timeout: options.inference_timeout,
            retention_days: 30,
            artifacts_path: options.artifacts_path.clone(),
        },
    );

    Harness {
        registry,
        events,
        store,
        speech,
        language,
    }
}

/// A frame of silence-ish audio at the given rate/channels.
pub fn frame(sequence: u64, duration_secs: f64, sample_rate: u32, channels: u16) -> AudioFrame {
    let count = (duration_secs * sample_rate as f64) as usize * channels as usize;
    AudioFrame {
        samples: vec![100i16; count],
        sample_rate,
        channels,
        sequence,
        speaker: None,
    }
}

/// Push `secs` seconds of 16kHz mono audio, one frame per second.
pub async fn push_audio(
    registry: &SessionRegistry,
    id: meeting_scribe::SessionId,
    secs: u64,
) -> meeting_scribe::FrameAck {
    let mut last = None;
    for i in 0..secs {
        let ack = registry
            .push_frame(id, frame(i, 1.0, 16000, 1))
            .await
            .expect("push frame");
        last = Some(ack);
    }
    last.expect("at least one frame")
}
