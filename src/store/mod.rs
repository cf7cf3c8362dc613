//! Meeting persistence.
//!
//! The core only sees the `MeetingStore` contract: upsert by id, load,
//! recent listing, and retention pruning. Expired meetings simply become
//! `NotFound`.

pub mod fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::notes::MeetingNotes;
use crate::transcribe::TimedSegment;

pub use fs::FsMeetingStore;

pub type MeetingId = uuid::Uuid;

/// The unit of persistence. Immutable once saved, except for
/// retention-driven deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub name: String,
    pub channel: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub transcript: Vec<TimedSegment>,
    pub notes: MeetingNotes,
    /// Retention expiry; the store prunes past this point
    pub expires_at: DateTime<Utc>,
}

/// Listing entry for recent meetings in a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub id: MeetingId,
    pub name: String,
    pub started_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait MeetingStore: Send + Sync {
    /// Persist a meeting. Upsert semantics keyed by id: saving the same
    /// id again overwrites, never duplicates.
    async fn save(&self, meeting: &Meeting) -> Result<MeetingId, StoreError>;

    /// Load a meeting by id. Expired or never-saved ids are `NotFound`.
    async fn load(&self, id: MeetingId) -> Result<Meeting, StoreError>;

    /// Most recent meetings for a channel, newest first.
    async fn list_recent(
        &self,
        channel: &str,
        limit: usize,
    ) -> Result<Vec<MeetingSummary>, StoreError>;

    /// Delete meetings past their retention expiry. Returns the count.
    async fn prune_expired(&self) -> Result<usize, StoreError>;
}
