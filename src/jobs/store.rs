use super::{Job, JobId, JobSnapshot, JobState};
use crate::{error::ServiceError, media::ByteProgress};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::watch;
use tracing::info;

struct Entry {
    job: Job,
    seq: u64,
    cancel: watch::Sender<bool>,
}

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Entry>,
    next_seq: u64,
}

/// Every job the process has seen, behind a single lock. Nothing is ever evicted.
#[derive(Clone, Default)]
pub struct JobStore {
    inner: Arc<Mutex<Inner>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new pending job and returns the receiving end of its cancellation signal.
    pub fn insert(&self, job: Job) -> watch::Receiver<bool> {
        let (cancel, cancelled) = watch::channel(false);
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.jobs.insert(job.id, Entry { job, seq, cancel });
        cancelled
    }

    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    pub fn snapshot(&self, id: &JobId) -> Option<JobSnapshot> {
        self.inner.lock().jobs.get(id).map(|e| e.job.snapshot())
    }

    /// Newest first; jobs created in the same instant keep reverse insertion order.
    pub fn list(&self) -> Vec<JobSnapshot> {
        let inner = self.inner.lock();
        let mut entries: Vec<&Entry> = inner.jobs.values().collect();
        entries.sort_by(|a, b| {
            b.job
                .created_at
                .cmp(&a.job.created_at)
                .then(b.seq.cmp(&a.seq))
        });
        entries.into_iter().map(|e| e.job.snapshot()).collect()
    }

    /// pending -> running. False when the job is gone or was cancelled first.
    pub fn start(&self, id: &JobId) -> bool {
        self.with_job(id, |job| job.transition(JobState::Running))
            .unwrap_or(false)
    }

    pub fn set_metadata(&self, id: &JobId, title: &str, items_total: u64) {
        self.with_running(id, |job| {
            job.title = title.to_string();
            job.items_total = items_total;
            if items_total > 0 {
                job.items_completed = job.items_completed.min(items_total);
            }
        });
    }

    pub fn record_bytes(&self, id: &JobId, progress: ByteProgress) {
        self.with_running(id, |job| {
            job.bytes_downloaded = Some(progress.downloaded);
            job.bytes_total = progress.total;
        });
    }

    /// Counts one more finished item, never beyond `items_total` once known.
    pub fn record_item_done(&self, id: &JobId) {
        self.with_running(id, |job| {
            let next = job.items_completed + 1;
            job.items_completed = if job.items_total > 0 {
                next.min(job.items_total)
            } else {
                next
            };
            job.bytes_downloaded = None;
            job.bytes_total = None;
        });
    }

    /// running -> completed. No-op when the job already left `running`.
    pub fn complete(&self, id: &JobId) -> bool {
        self.with_job(id, |job| {
            if !job.transition(JobState::Completed) {
                return false;
            }
            job.items_completed = job.items_total;
            job.bytes_downloaded = None;
            job.bytes_total = None;
            true
        })
        .unwrap_or(false)
    }

    /// running -> failed with `reason`. Items already counted stay counted.
    pub fn fail(&self, id: &JobId, reason: &str) -> bool {
        self.with_job(id, |job| {
            if !job.transition(JobState::Failed) {
                return false;
            }
            job.failure_reason = Some(reason.to_string());
            true
        })
        .unwrap_or(false)
    }

    /// pending|running -> cancelled, and raises the job's cancellation signal.
    pub fn cancel(&self, id: &JobId) -> Result<JobSnapshot, ServiceError> {
        let mut inner = self.inner.lock();
        let entry = inner
            .jobs
            .get_mut(id)
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        let state = entry.job.state;
        if !entry.job.transition(JobState::Cancelled) {
            return Err(ServiceError::Rejected {
                job_id: id.to_string(),
                state,
            });
        }

        // receivers may already be gone if the worker finished its last transfer
        let _ = entry.cancel.send(true);
        info!("Job {} cancelled (was {})", id, state);
        Ok(entry.job.snapshot())
    }

    fn with_job<T>(&self, id: &JobId, f: impl FnOnce(&mut Job) -> T) -> Option<T> {
        self.inner.lock().jobs.get_mut(id).map(|e| f(&mut e.job))
    }

    fn with_running(&self, id: &JobId, f: impl FnOnce(&mut Job)) {
        self.with_job(id, |job| {
            if job.state == JobState::Running {
                f(job);
            }
        });
    }
}
