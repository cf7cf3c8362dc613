use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use super::{Meeting, MeetingId, MeetingStore, MeetingSummary};
use crate::error::StoreError;

/// File-backed meeting store: one JSON document per meeting.
///
/// Writes go through a temp file and rename, so a retried save replaces
/// the document in place and a crash never leaves a half-written meeting
/// behind.
pub struct FsMeetingStore {
    dir: PathBuf,
}

impl FsMeetingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Meeting store at {}", dir.display());
        Ok(Self { dir })
    }

    fn document_path(&self, id: MeetingId) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    async fn read_document(&self, path: &Path) -> Result<Meeting, StoreError> {
        let raw = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[async_trait::async_trait]
impl MeetingStore for FsMeetingStore {
    async fn save(&self, meeting: &Meeting) -> Result<MeetingId, StoreError> {
        let path = self.document_path(meeting.id);
        let tmp = path.with_extension("json.tmp");

        let body = serde_json::to_vec_pretty(meeting)?;
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        info!(
            "Saved meeting {} ({} transcript segments)",
            meeting.id,
            meeting.transcript.len()
        );
        Ok(meeting.id)
    }

    async fn load(&self, id: MeetingId) -> Result<Meeting, StoreError> {
        let path = self.document_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound(id));
        }

        let meeting = self.read_document(&path).await?;
        if meeting.expires_at <= Utc::now() {
            // Expired but not yet pruned reads the same as pruned
            return Err(StoreError::NotFound(id));
        }

        Ok(meeting)
    }

    async fn list_recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<MeetingSummary>, StoreError> {
        let now = Utc::now();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut summaries = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match self.read_document(&path).await {
                Ok(meeting) => {
                    if meeting.channel == channel && meeting.expires_at > now {
                        summaries.push(MeetingSummary {
                            id: meeting.id,
                            name: meeting.name,
                            started_at: meeting.started_at,
                        });
                    }
                }
                Err(e) => warn!("Skipping unreadable document {}: {}", path.display(), e),
            }
        }

        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries.truncate(limit);
        Ok(summaries)
    }

    async fn prune_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut pruned = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let expired = match self.read_document(&path).await {
                Ok(meeting) => meeting.expires_at <= now,
                Err(e) => {
                    warn!("Skipping unreadable document {}: {}", path.display(), e);
                    false
                }
            };

            if expired {
                tokio::fs::remove_file(&path).await?;
                pruned += 1;
            }
        }

        if pruned > 0 {
            info!("Pruned {} expired meetings", pruned);
        }
        Ok(pruned)
    }
}
