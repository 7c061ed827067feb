use super::{
    extractor::{Extractor, ProgressFn},
    types::{ByteProgress, ItemFilter, TransferRequest},
};
use crate::error::ExtractionError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

/// Scripted stand-in for yt-dlp.
pub struct FakeExtractor {
    inspect_result: Result<Value, ExtractionError>,
    fail_on_item: Option<u64>,
    panic_on_transfer: bool,
    gate: Option<Arc<Notify>>,
    inspect_gate: Option<Arc<Notify>>,
    transfers: Mutex<Vec<ItemFilter>>,
}

impl FakeExtractor {
    pub fn with_inspect(inspect_result: Result<Value, ExtractionError>) -> Self {
        Self {
            inspect_result,
            fail_on_item: None,
            panic_on_transfer: false,
            gate: None,
            inspect_gate: None,
            transfers: Mutex::new(Vec::new()),
        }
    }

    pub fn video(title: &str) -> Self {
        Self::with_inspect(Ok(json!({
            "id": "abc123",
            "title": title,
            "duration": 212,
            "uploader": "Uploader",
            "view_count": 1000,
            "upload_date": "20240102",
            "description": "A description",
            "thumbnail": "https://example.com/thumb.jpg",
        })))
    }

    pub fn playlist(title: &str, count: u64) -> Self {
        let entries: Vec<Value> = (1..=count).map(|i| json!({ "id": format!("item{i}") })).collect();
        Self::with_inspect(Ok(json!({
            "_type": "playlist",
            "title": title,
            "playlist_count": count,
            "entries": entries,
        })))
    }

    /// Fails the transfer of the given 1-based item (1 for single videos).
    pub fn failing_on(mut self, item: u64) -> Self {
        self.fail_on_item = Some(item);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic_on_transfer = true;
        self
    }

    /// Each transfer waits for one permit on `gate` (or for cancellation).
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Each inspection waits for one permit on `gate`.
    pub fn slow_inspect(mut self, gate: Arc<Notify>) -> Self {
        self.inspect_gate = Some(gate);
        self
    }

    pub fn transfers(&self) -> Vec<ItemFilter> {
        self.transfers.lock().clone()
    }
}

#[async_trait]
impl Extractor for FakeExtractor {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn inspect(&self, _url: &str, _playlist: bool) -> Result<Value, ExtractionError> {
        if let Some(gate) = &self.inspect_gate {
            gate.notified().await;
        }
        self.inspect_result.clone()
    }

    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: ProgressFn<'_>,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<Value, ExtractionError> {
        self.transfers.lock().push(request.items);
        if self.panic_on_transfer {
            panic!("fake extractor panicked");
        }

        progress(ByteProgress {
            downloaded: 50,
            total: Some(100),
        });

        if let Some(gate) = &self.gate {
            let cancelled = async {
                loop {
                    if *cancel.borrow() {
                        return;
                    }
                    if cancel.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            };
            tokio::select! {
                _ = gate.notified() => {}
                _ = cancelled => return Err(ExtractionError::Cancelled),
            }
        }

        let item = match request.items {
            ItemFilter::PlaylistItem(index) => index,
            ItemFilter::NoPlaylist | ItemFilter::WholePlaylist => 1,
        };
        if self.fail_on_item == Some(item) {
            return Err(ExtractionError::Failed(format!(
                "ERROR: item {} unavailable",
                item
            )));
        }

        Ok(json!({ "url": request.url, "item": item }))
    }

    async fn check_availability(&self) -> bool {
        true
    }
}
