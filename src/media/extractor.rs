use super::types::{ByteProgress, TransferRequest};
use crate::error::ExtractionError;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::watch;

pub type ProgressFn<'a> = &'a (dyn Fn(ByteProgress) + Send + Sync);

/// The media extraction tool the job runner delegates all fetching to.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Human-readable name of the extractor
    fn name(&self) -> &'static str;

    /// Resolve metadata without transferring any media. With `playlist` set, a URL
    /// naming both an item and a playlist resolves to the playlist.
    async fn inspect(&self, url: &str, playlist: bool) -> Result<Value, ExtractionError>;

    /// Download the requested items, reporting byte progress as it goes.
    /// Returns early with `ExtractionError::Cancelled` once `cancel` turns true.
    async fn transfer(
        &self,
        request: &TransferRequest,
        progress: ProgressFn<'_>,
        cancel: watch::Receiver<bool>,
    ) -> Result<Value, ExtractionError>;

    /// Test if the extractor is usable on this system
    async fn check_availability(&self) -> bool;
}
