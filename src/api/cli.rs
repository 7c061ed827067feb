//! One-shot download from the command line: inspect, download, report.

use crate::{
    jobs::{JobKind, JobSnapshot, JobState},
    service::DownloadService,
    utils::format_duration,
};
use anyhow::{bail, Result};
use std::time::Duration;
use tracing::info;

pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Downloads a single video and waits for it. Errors when the job does not complete.
pub async fn download(
    service: &DownloadService,
    url: &str,
    quality: Option<&str>,
    poll: Duration,
) -> Result<JobSnapshot> {
    info!("Fetching video info for: {}", url);
    let (_, metadata) = service.fetch_metadata(url).await?;
    info!("Title: {}", metadata.title);
    if metadata.duration > 0 {
        info!("Duration: {}", format_duration(metadata.duration));
    }

    let id = service.submit(url, JobKind::Single, quality)?.to_string();
    info!("Download started as job {}", id);

    let snapshot = loop {
        let snapshot = service.get_status(&id)?;
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        tokio::time::sleep(poll).await;
    };

    match snapshot.status {
        JobState::Completed => {
            info!("Download completed, saved to {}", snapshot.download_path);
            Ok(snapshot)
        }
        JobState::Failed => bail!(
            "Download failed: {}",
            snapshot.failure_reason.as_deref().unwrap_or("unknown error")
        ),
        state => bail!("Download ended as {}", state),
    }
}
