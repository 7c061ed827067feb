use super::{JobId, JobKind, JobStore};
use crate::{
    error::ExtractionError,
    media::{metadata, ByteProgress, Extractor, ItemFilter, Quality, TransferRequest},
    utils::format_duration,
};
use serde_json::Value;
use std::{any::Any, path::PathBuf, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, error, info};

const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";
const PLAYLIST_TEMPLATE: &str = "%(playlist_index)s - %(title)s.%(ext)s";

/// Everything a worker needs to carry out one accepted request.
#[derive(Debug, Clone)]
pub struct JobPlan {
    pub id: JobId,
    pub url: String,
    pub kind: JobKind,
    pub quality: Quality,
    pub download_dir: PathBuf,
}

impl JobPlan {
    fn transfer_request(&self, items: ItemFilter) -> TransferRequest {
        let template = match self.kind {
            JobKind::Single => SINGLE_TEMPLATE,
            JobKind::Playlist => PLAYLIST_TEMPLATE,
        };
        TransferRequest {
            url: self.url.clone(),
            output_template: self.download_dir.join(template),
            quality: self.quality.clone(),
            items,
        }
    }
}

/// Starts one background task per job; no pool, no queue.
#[derive(Clone)]
pub struct JobRunner {
    store: JobStore,
    extractor: Arc<dyn Extractor>,
}

impl JobRunner {
    pub fn new(store: JobStore, extractor: Arc<dyn Extractor>) -> Self {
        Self { store, extractor }
    }

    /// Must be called from within a tokio runtime. Returns immediately.
    pub fn spawn(&self, plan: JobPlan, cancel: watch::Receiver<bool>) -> JoinHandle<()> {
        let store = self.store.clone();
        let extractor = self.extractor.clone();

        tokio::spawn(async move {
            let id = plan.id;
            let work = tokio::spawn(run_job(store.clone(), extractor, plan, cancel));

            let reason = match work.await {
                Ok(Ok(())) => return,
                Ok(Err(ExtractionError::Cancelled)) => {
                    info!("Job {} stopped after cancellation", id);
                    return;
                }
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => panic_message(e.into_panic()),
                Err(e) => e.to_string(),
            };

            if store.fail(&id, &reason) {
                error!("Job {} failed: {}", id, reason);
            }
        })
    }
}

async fn run_job(
    store: JobStore,
    extractor: Arc<dyn Extractor>,
    plan: JobPlan,
    cancel: watch::Receiver<bool>,
) -> Result<(), ExtractionError> {
    let id = plan.id;
    if !store.start(&id) {
        info!("Job {} was cancelled before it started", id);
        return Ok(());
    }
    info!("Job {} running with {}: {}", id, extractor.name(), plan.url);

    let is_playlist = plan.kind == JobKind::Playlist;
    let raw = extractor.inspect(&plan.url, is_playlist).await?;
    let (title, items_total) = resolve_target(&raw, plan.kind);
    store.set_metadata(&id, &title, items_total);
    match raw["duration"].as_f64() {
        Some(duration) if !is_playlist => {
            info!("Job {}: '{}' ({})", id, title, format_duration(duration as u64))
        }
        _ => info!("Job {}: '{}' ({} items)", id, title, items_total),
    }

    let progress = {
        let store = store.clone();
        move |p: ByteProgress| store.record_bytes(&id, p)
    };

    let items: Vec<ItemFilter> = match plan.kind {
        JobKind::Single => vec![ItemFilter::NoPlaylist],
        // count unknown: let the extractor walk the list in one go
        JobKind::Playlist if items_total == 0 => vec![ItemFilter::WholePlaylist],
        JobKind::Playlist => (1..=items_total).map(ItemFilter::PlaylistItem).collect(),
    };

    for filter in items {
        if *cancel.borrow() {
            return Err(ExtractionError::Cancelled);
        }

        let request = plan.transfer_request(filter);
        extractor
            .transfer(&request, &progress, cancel.clone())
            .await?;

        debug!("Job {}: finished {:?}", id, filter);
        if filter != ItemFilter::WholePlaylist {
            store.record_item_done(&id);
        }
    }

    if store.complete(&id) {
        info!("Job {} completed", id);
    }
    Ok(())
}

fn resolve_target(raw: &Value, kind: JobKind) -> (String, u64) {
    match kind {
        JobKind::Single => (
            raw["title"].as_str().unwrap_or("Untitled video").to_string(),
            1,
        ),
        JobKind::Playlist => (
            raw["title"].as_str().unwrap_or("Untitled playlist").to_string(),
            metadata::playlist_count(raw),
        ),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Download worker panicked".to_string()
    }
}
