//! Meeting-note synthesis.
//!
//! Renders the transcript into a fixed prompt, runs the language engine,
//! and parses the output into structured notes. Unparseable output
//! degrades to a raw-text summary instead of failing the stage.

pub mod parser;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ModelError;
use crate::models::{LanguageEngine, ModelKind, ModelManager};
use crate::transcribe::{format_timestamp, TimedSegment};

/// One action item, with its owner when the model names one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub text: String,
    pub owner: Option<String>,
}

/// Structured output of note synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingNotes {
    pub summary: String,
    pub decisions: Vec<String>,
    pub actions: Vec<ActionItem>,
}

impl MeetingNotes {
    /// Render as markdown for delivery by the adapter.
    pub fn render_markdown(&self, meeting_name: &str) -> String {
        let mut out = format!("# Meeting Notes: {}\n\n{}\n", meeting_name, self.summary);

        if !self.decisions.is_empty() {
            out.push_str("\n## Decisions\n");
            for d in &self.decisions {
                out.push_str(&format!("- {}\n", d));
            }
        }

        if !self.actions.is_empty() {
            out.push_str("\n## Action Items\n");
            for a in &self.actions {
                match &a.owner {
                    Some(owner) => out.push_str(&format!("- {} (owner: {})\n", a.text, owner)),
                    None => out.push_str(&format!("- {}\n", a.text)),
                }
            }
        }

        out
    }
}

pub struct NoteSynthesizer {
    manager: Arc<ModelManager>,
    timeout: Duration,
}

impl NoteSynthesizer {
    pub fn new(manager: Arc<ModelManager>, timeout: Duration) -> Self {
        Self { manager, timeout }
    }

    /// Summarize a transcript into structured meeting notes.
    pub async fn summarize(&self, transcript: &[TimedSegment]) -> Result<MeetingNotes, ModelError> {
        let rendered = render_transcript(transcript);
        let prompt = build_prompt(&rendered);
        info!("Synthesizing notes from {} transcript chars", rendered.len());

        let mut guard = self.manager.acquire(ModelKind::Language).await?;

        let raw = tokio::time::timeout(self.timeout, guard.language().complete(&prompt))
            .await
            .map_err(|_| ModelError::Timeout {
                kind: ModelKind::Language,
                seconds: self.timeout.as_secs(),
            })??;

        let notes = match parser::parse(&raw) {
            Some(notes) => notes,
            None => {
                // Degraded output: keep the raw text rather than dropping it
                warn!("model output had no discernible structure, keeping raw text as summary");
                MeetingNotes {
                    summary: raw.trim().to_string(),
                    decisions: Vec::new(),
                    actions: Vec::new(),
                }
            }
        };

        info!(
            "Notes synthesized: {} decisions, {} action items",
            notes.decisions.len(),
            notes.actions.len()
        );
        Ok(notes)
    }
}

/// Timestamped transcript lines, skipping silence segments.
pub fn render_transcript(segments: &[TimedSegment]) -> String {
    let mut lines = Vec::new();
    for seg in segments {
        if seg.is_silence() {
            continue;
        }
        let stamp = format_timestamp(seg.start_secs);
        match &seg.speaker {
            Some(speaker) => lines.push(format!("[{}] {}: {}", stamp, speaker, seg.text)),
            None => lines.push(format!("[{}] {}", stamp, seg.text)),
        }
    }
    lines.join("\n")
}

fn build_prompt(transcript: &str) -> String {
    format!(
        "[INST] <<SYS>>\n\
         You are an AI assistant specialized in summarizing meeting transcripts.\n\
         Your task is to analyze the provided meeting transcript and generate comprehensive meeting notes.\n\
         Structure your answer in three sections:\n\
         Summary: a short paragraph covering the substance of the meeting.\n\
         Decisions: key decisions made during the meeting, one bullet point each.\n\
         Action Items: tasks with assignees if mentioned, one bullet point each.\n\
         Be concise, clear, and organized. Ignore small talk and focus on substantive discussion.\n\
         <</SYS>>\n\n\
         Here is the meeting transcript:\n\n\
         {}\n\n\
         Please generate structured meeting notes for this transcript including the summary, key decisions, and action items. [/INST]\n",
        transcript
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_transcript_skips_silence() {
        let segments = vec![
            TimedSegment {
                start_secs: 0.0,
                end_secs: 4.0,
                text: String::new(),
                speaker: None,
            },
            TimedSegment {
                start_secs: 4.0,
                end_secs: 9.0,
                text: "let's get started".to_string(),
                speaker: Some("ana".to_string()),
            },
            TimedSegment {
                start_secs: 61.0,
                end_secs: 65.0,
                text: "agreed".to_string(),
                speaker: None,
            },
        ];

        let rendered = render_transcript(&segments);
        assert_eq!(rendered, "[00:04] ana: let's get started\n[01:01] agreed");
    }

    #[test]
    fn test_markdown_render_includes_owners() {
        let notes = MeetingNotes {
            summary: "Short sync.".to_string(),
            decisions: vec!["Ship on Friday".to_string()],
            actions: vec![ActionItem {
                text: "Write the changelog".to_string(),
                owner: Some("sam".to_string()),
            }],
        };

        let md = notes.render_markdown("Weekly Sync");
        assert!(md.starts_with("# Meeting Notes: Weekly Sync"));
        assert!(md.contains("- Ship on Friday"));
        assert!(md.contains("- Write the changelog (owner: sam)"));
    }
}
