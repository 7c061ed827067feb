mod runner;
mod store;

pub use runner::{JobPlan, JobRunner};
pub use store::JobStore;

use crate::utils::round2;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Single,
    Playlist,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Cancelled) | (Running, Completed | Failed | Cancelled)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked download. Only the store hands out `&mut Job`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub url: String,
    pub kind: JobKind,
    pub title: String,
    pub state: JobState,
    pub quality: String,
    pub download_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items_total: u64,
    pub items_completed: u64,
    pub failure_reason: Option<String>,
    pub bytes_downloaded: Option<u64>,
    pub bytes_total: Option<u64>,
}

impl Job {
    pub fn new(url: &str, kind: JobKind, quality: &str, download_path: PathBuf) -> Self {
        let (title, items_total) = match kind {
            JobKind::Single => ("Preparing download...", 1),
            JobKind::Playlist => ("Preparing playlist download...", 0),
        };

        Self {
            id: JobId::new(),
            url: url.to_string(),
            kind,
            title: title.to_string(),
            state: JobState::Pending,
            quality: quality.to_string(),
            download_path,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            items_total,
            items_completed: 0,
            failure_reason: None,
            bytes_downloaded: None,
            bytes_total: None,
        }
    }

    /// Moves to `next` if the state machine allows it, stamping the matching timestamp.
    /// Returns false and leaves the job untouched otherwise.
    fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }

        // keep timestamps ordered even if the wall clock steps back
        let floor = self.started_at.unwrap_or(self.created_at);
        let now = Utc::now().max(floor);

        match next {
            JobState::Running => self.started_at = Some(now),
            JobState::Completed | JobState::Failed | JobState::Cancelled => {
                self.finished_at = Some(now)
            }
            JobState::Pending => {}
        }
        self.state = next;
        true
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.items_total == 0 {
            return 0.0;
        }
        let ratio = self.items_completed as f64 / self.items_total as f64;
        round2((ratio * 100.0).clamp(0.0, 100.0))
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            url: self.url.clone(),
            kind: self.kind,
            is_playlist: self.kind == JobKind::Playlist,
            title: self.title.clone(),
            status: self.state,
            quality: self.quality.clone(),
            download_path: self.download_path.to_string_lossy().into_owned(),
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            items_total: self.items_total,
            items_completed: self.items_completed,
            progress_percentage: self.progress_percentage(),
            failure_reason: self.failure_reason.clone(),
            bytes_downloaded: self.bytes_downloaded,
            bytes_total: self.bytes_total,
        }
    }
}

/// Read-only copy of a job, as handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub url: String,
    pub kind: JobKind,
    pub is_playlist: bool,
    pub title: String,
    pub status: JobState,
    pub quality: String,
    /// Lossy so that non-UTF-8 directories still serialize.
    pub download_path: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub items_total: u64,
    pub items_completed: u64,
    pub progress_percentage: f64,
    pub failure_reason: Option<String>,
    pub bytes_downloaded: Option<u64>,
    pub bytes_total: Option<u64>,
}
