use super::{cancelled_body, error_body, submitted_body, SERVER_VERSION, TOOLS};
use crate::{
    error::ServiceError,
    jobs::{JobKind, JobSnapshot},
    service::DownloadService,
};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
struct UrlRequest {
    url: Option<String>,
    quality: Option<String>,
}

struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": message }),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let status = match &err {
            ServiceError::Validation(_) | ServiceError::Rejected { .. } => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Extraction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: error_body(&err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = std::result::Result<Json<Value>, ApiError>;

pub fn router(service: DownloadService) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/download_video", post(download_video))
        .route("/download_playlist", post(download_playlist))
        .route("/status/:job_id", get(status))
        .route("/cancel/:job_id", post(cancel))
        .route("/downloads", get(list_downloads))
        .route("/metadata", post(metadata))
        .with_state(service)
}

pub async fn serve(service: DownloadService, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down HTTP server");
        })
        .await
        .context("HTTP server error")
}

fn parse_url_request(body: &Bytes) -> std::result::Result<(String, Option<String>), ApiError> {
    let request: UrlRequest = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("A JSON body with a url field is required"))?;
    match request.url {
        Some(url) if !url.trim().is_empty() => Ok((url, request.quality)),
        _ => Err(ApiError::bad_request("URL is required")),
    }
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "tubejobs HTTP server",
        "version": SERVER_VERSION,
        "tools": TOOLS,
    }))
}

async fn download_video(State(service): State<DownloadService>, body: Bytes) -> ApiResult {
    submit(&service, &body, JobKind::Single, "Video download started")
}

async fn download_playlist(State(service): State<DownloadService>, body: Bytes) -> ApiResult {
    submit(&service, &body, JobKind::Playlist, "Playlist download started")
}

fn submit(service: &DownloadService, body: &Bytes, kind: JobKind, message: &str) -> ApiResult {
    let (url, quality) = parse_url_request(body)?;
    let id = service.submit(&url, kind, quality.as_deref())?;
    Ok(Json(submitted_body(&id.to_string(), message)))
}

async fn status(
    State(service): State<DownloadService>,
    Path(job_id): Path<String>,
) -> Result<Json<JobSnapshot>, ApiError> {
    Ok(Json(service.get_status(&job_id)?))
}

async fn cancel(State(service): State<DownloadService>, Path(job_id): Path<String>) -> ApiResult {
    service.cancel(&job_id)?;
    Ok(Json(cancelled_body(&job_id)))
}

async fn list_downloads(State(service): State<DownloadService>) -> Json<Value> {
    let jobs = service.list_jobs();
    Json(json!({
        "total_jobs": jobs.len(),
        "jobs": jobs,
    }))
}

async fn metadata(State(service): State<DownloadService>, body: Bytes) -> ApiResult {
    let (url, _) = parse_url_request(&body)?;
    let (kind, metadata) = service.fetch_metadata(&url).await?;
    Ok(Json(json!({
        "url": url,
        "type": kind,
        "metadata": metadata,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ExtractionError,
        media::testing::FakeExtractor,
        service::tests::{service_with, wait_terminal},
    };
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn call(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_index_lists_tools() {
        let app = router(service_with(FakeExtractor::video("A video")));
        let (status, body) = call(app, "GET", "/", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tools"].as_array().unwrap().len(), TOOLS.len());
    }

    #[tokio::test]
    async fn test_download_video_then_status() {
        let service = service_with(FakeExtractor::video("A video"));
        let app = router(service.clone());

        let (status, body) = call(
            app.clone(),
            "POST",
            "/download_video",
            Some(json!({ "url": "https://example.com/watch?v=abc123", "quality": "360p" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        let job_id = body["job_id"].as_str().unwrap().to_string();

        wait_terminal(&service, &job_id).await;
        let (status, body) = call(app, "GET", &format!("/status/{}", job_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["title"], "A video");
        assert_eq!(body["quality"], "360p");
        assert_eq!(body["progress_percentage"], 100.0);
    }

    #[tokio::test]
    async fn test_download_validation_errors() {
        let service = service_with(FakeExtractor::video("A video"));
        let app = router(service.clone());

        let cases = [
            ("/download_video", Some(json!({}))),
            ("/download_video", None),
            ("/download_video", Some(json!({ "url": "https://notsupported.test/video" }))),
            ("/download_video", Some(json!({ "url": "https://example.com/playlist?list=XYZ" }))),
            ("/download_video", Some(json!({ "url": "https://example.com/watch?list=XYZ" }))),
            ("/download_playlist", Some(json!({ "url": "https://example.com/watch?v=abc" }))),
        ];
        for (uri, body) in cases {
            let (status, response) = call(app.clone(), "POST", uri, body.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body:?}");
            assert!(response["error"].is_string());
        }

        let (_, body) = call(app, "GET", "/downloads", None).await;
        assert_eq!(body["total_jobs"], 0);
    }

    #[tokio::test]
    async fn test_status_and_cancel_unknown() {
        let app = router(service_with(FakeExtractor::video("A video")));
        let (status, _) = call(app.clone(), "GET", "/status/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(app, "POST", "/cancel/does-not-exist", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Job ID not found: does-not-exist");
    }

    #[tokio::test]
    async fn test_cancel_finished_job_is_rejected() {
        let service = service_with(FakeExtractor::video("A video"));
        let app = router(service.clone());
        let id = service
            .submit("https://example.com/watch?v=abc123", JobKind::Single, None)
            .unwrap()
            .to_string();
        wait_terminal(&service, &id).await;

        let (status, body) = call(app, "POST", &format!("/cancel/{}", id), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot cancel a job with state: completed");
    }

    #[tokio::test]
    async fn test_downloads_newest_first() {
        let service = service_with(FakeExtractor::playlist("Mix", 2));
        let app = router(service.clone());

        let first = service
            .submit("https://example.com/playlist?list=A", JobKind::Playlist, None)
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = service
            .submit("https://example.com/playlist?list=B", JobKind::Playlist, None)
            .unwrap();

        let (status, body) = call(app, "GET", "/downloads", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_jobs"], 2);
        assert_eq!(body["jobs"][0]["job_id"], second.to_string());
        assert_eq!(body["jobs"][1]["job_id"], first.to_string());
    }

    #[tokio::test]
    async fn test_metadata() {
        let app = router(service_with(FakeExtractor::playlist("Mix", 3)));
        let (status, body) = call(
            app,
            "POST",
            "/metadata",
            Some(json!({ "url": "https://example.com/playlist?list=XYZ" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["type"], "playlist");
        assert_eq!(body["metadata"]["is_playlist"], true);
        assert_eq!(body["metadata"]["playlist_count"], 3);
    }

    #[tokio::test]
    async fn test_metadata_extraction_failure_is_500() {
        let app = router(service_with(FakeExtractor::with_inspect(Err(
            ExtractionError::Failed("ERROR: Private video".to_string()),
        ))));
        let (status, body) = call(
            app,
            "POST",
            "/metadata",
            Some(json!({ "url": "https://example.com/watch?v=private" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch metadata: ERROR: Private video");
    }
}
