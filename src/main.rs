use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use meeting_scribe::models::{LlamaCliEngine, WhisperCliEngine};
use meeting_scribe::notes::NoteSynthesizer;
use meeting_scribe::session::{PipelineConfig, SessionEvent, SessionRegistry};
use meeting_scribe::store::{FsMeetingStore, Meeting, MeetingStore};
use meeting_scribe::transcribe::Transcriber;
use meeting_scribe::{create_router, AppState, AudioFile, Config, ModelManager};

#[derive(Parser)]
#[command(name = "meeting-scribe", version, about = "Voice-channel meeting recorder and note taker")]
struct Cli {
    /// Config file path (extension resolved by the config loader)
    #[arg(long, default_value = "config/meeting-scribe")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP control surface (default)
    Serve,
    /// Transcribe and summarize a recorded audio file
    Ingest {
        file: PathBuf,

        /// Channel to file the meeting under
        #[arg(long, default_value = "offline")]
        channel: String,

        /// Meeting name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete meetings past their retention expiry
    Prune,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config))?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ingest {
            file,
            channel,
            name,
        } => ingest(config, file, channel, name).await,
        Command::Prune => prune(config).await,
    }
}

fn build_manager(config: &Config) -> Arc<ModelManager> {
    Arc::new(ModelManager::new(
        Box::new(WhisperCliEngine::new(config.models.speech.clone())),
        Box::new(LlamaCliEngine::new(config.models.language.clone())),
        config.models.keep_resident,
    ))
}

async fn serve(config: Config) -> Result<()> {
    info!("{} starting", config.service.name);

    let store = Arc::new(FsMeetingStore::new(&config.storage.path)?);
    match store.prune_expired().await {
        Ok(0) => {}
        Ok(n) => info!("Startup retention sweep removed {} meetings", n),
        Err(e) => error!("Startup retention sweep failed: {}", e),
    }

    let manager = build_manager(&config);
    let pipeline = PipelineConfig {
        sample_rate: config.audio.sample_rate,
        inference_timeout: Duration::from_secs(config.models.inference_timeout_secs),
        retention_days: config.storage.retention_days,
        artifacts_path: config.storage.artifacts_path.clone().map(PathBuf::from),
    };

    let (registry, mut events) = SessionRegistry::new(
        &config.audio,
        manager,
        store.clone() as Arc<dyn MeetingStore>,
        pipeline,
    );

    Arc::clone(&registry).start_idle_sweep();

    // Completion callback consumer. A chat adapter would deliver the
    // notes back to the platform here; the reference surface logs them.
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Completed {
                    session_id,
                    channel,
                    meeting,
                } => {
                    info!(
                        "Meeting \"{}\" ready for channel {} (session {}): {} decisions, {} action items",
                        meeting.name,
                        channel,
                        session_id,
                        meeting.notes.decisions.len(),
                        meeting.notes.actions.len()
                    );
                }
                SessionEvent::Failed {
                    session_id,
                    channel,
                    stage,
                    error,
                } => {
                    error!(
                        "Session {} in channel {} failed while {}: {}",
                        session_id, channel, stage, error
                    );
                }
            }
        }
    });

    let app = create_router(AppState::new(registry, store));
    let addr = format!("{}:{}", config.service.http.bind, config.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP control surface listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ingest(config: Config, file: PathBuf, channel: String, name: Option<String>) -> Result<()> {
    let audio = AudioFile::open(&file)?;
    let samples = audio.to_mono_16khz();

    let manager = build_manager(&config);
    let timeout = Duration::from_secs(config.models.inference_timeout_secs);
    let transcriber = Transcriber::new(Arc::clone(&manager), config.audio.sample_rate, timeout);
    let synthesizer = NoteSynthesizer::new(manager, timeout);

    let transcript = transcriber.transcribe(&samples).await?;
    let notes = synthesizer.summarize(&transcript).await?;

    let name = name.unwrap_or_else(|| {
        file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Ingested meeting".to_string())
    });

    let ended_at = Utc::now();
    let started_at =
        ended_at - chrono::Duration::milliseconds((audio.duration_seconds * 1000.0) as i64);

    let meeting = Meeting {
        id: uuid::Uuid::new_v4(),
        name,
        channel,
        started_at,
        ended_at,
        transcript,
        notes,
        expires_at: ended_at + chrono::Duration::days(config.storage.retention_days as i64),
    };

    let store = FsMeetingStore::new(&config.storage.path)?;
    store.save(&meeting).await?;

    println!("{}", meeting.notes.render_markdown(&meeting.name));
    println!("Saved meeting {}", meeting.id);

    Ok(())
}

async fn prune(config: Config) -> Result<()> {
    let store = FsMeetingStore::new(&config.storage.path)?;
    let pruned = store.prune_expired().await?;
    println!("Pruned {} expired meetings", pruned);
    Ok(())
}
