use crate::{
    config::DownloadsConfig,
    error::{ServiceError, ValidationError},
    jobs::{Job, JobId, JobKind, JobPlan, JobRunner, JobSnapshot, JobStore},
    media::{fetch_metadata, Extractor, LinkKind, MediaMetadata, Quality, UrlClassifier, YtDlpExtractor},
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// The one implementation behind both front ends.
#[derive(Clone)]
pub struct DownloadService {
    classifier: Arc<UrlClassifier>,
    extractor: Arc<dyn Extractor>,
    store: JobStore,
    runner: JobRunner,
    download_dir: PathBuf,
    default_quality: String,
}

impl DownloadService {
    pub fn new(config: &DownloadsConfig, extractor: Arc<dyn Extractor>) -> Self {
        let store = JobStore::new();
        let runner = JobRunner::new(store.clone(), extractor.clone());

        Self {
            classifier: Arc::new(UrlClassifier::new(&config.supported_hosts)),
            extractor,
            store,
            runner,
            download_dir: config.directory.clone(),
            default_quality: config.default_quality.clone(),
        }
    }

    pub fn from_config(config: &DownloadsConfig) -> Self {
        Self::new(config, Arc::new(YtDlpExtractor::new(config.ytdlp_path.clone())))
    }

    pub fn classify(&self, url: &str) -> LinkKind {
        self.classifier.classify(url)
    }

    /// Blocks for as long as the extractor takes; callers wanting a bound add their own timeout.
    pub async fn fetch_metadata(&self, url: &str) -> Result<(LinkKind, MediaMetadata), ServiceError> {
        let kind = self.supported(url)?;
        let metadata = fetch_metadata(self.extractor.as_ref(), url).await?;
        Ok((kind, metadata))
    }

    /// Accepts a download request and starts it in the background.
    /// Must be called from within a tokio runtime.
    pub fn submit(
        &self,
        url: &str,
        kind: JobKind,
        quality: Option<&str>,
    ) -> Result<JobId, ServiceError> {
        let link = self.supported(url)?;
        match (kind, link) {
            (JobKind::Single, LinkKind::Playlist) => return Err(ValidationError::PlaylistUrl.into()),
            (JobKind::Playlist, LinkKind::SingleItem) => {
                return Err(ValidationError::NotAPlaylist.into())
            }
            _ => {}
        }

        let quality = Quality::parse(quality.unwrap_or(&self.default_quality))?;
        let url = url.trim();

        let job = Job::new(url, kind, &quality.label, self.download_dir.clone());
        let id = job.id;
        let cancel = self.store.insert(job);

        info!(
            "Job {} accepted: {:?} {} at {} ({} jobs tracked)",
            id,
            kind,
            url,
            quality.label,
            self.store.len()
        );
        self.runner.spawn(
            JobPlan {
                id,
                url: url.to_string(),
                kind,
                quality,
                download_dir: self.download_dir.clone(),
            },
            cancel,
        );

        Ok(id)
    }

    pub fn get_status(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let id = parse_id(job_id)?;
        self.store
            .snapshot(&id)
            .ok_or_else(|| ServiceError::NotFound(job_id.to_string()))
    }

    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.store.list()
    }

    /// Marks the job cancelled right away; an in-flight yt-dlp process is killed
    /// by the worker shortly after.
    pub fn cancel(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let id = parse_id(job_id)?;
        self.store.cancel(&id)
    }

    pub async fn check_extractor(&self) -> bool {
        self.extractor.check_availability().await
    }

    fn supported(&self, url: &str) -> Result<LinkKind, ValidationError> {
        if url.trim().is_empty() {
            return Err(ValidationError::MissingUrl);
        }
        match self.classify(url) {
            LinkKind::NotSupported => Err(ValidationError::UnsupportedUrl(url.to_string())),
            kind => Ok(kind),
        }
    }
}

fn parse_id(job_id: &str) -> Result<JobId, ServiceError> {
    job_id
        .parse()
        .map_err(|_| ServiceError::NotFound(job_id.to_string()))
}
