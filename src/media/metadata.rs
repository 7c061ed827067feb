use super::{extractor::Extractor, types::MediaMetadata};
use crate::{error::ExtractionError, utils::truncate_with_marker};
use serde_json::Value;
use tracing::debug;

pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Inspects `url` without downloading and normalizes what comes back.
pub async fn fetch_metadata(
    extractor: &dyn Extractor,
    url: &str,
) -> Result<MediaMetadata, ExtractionError> {
    let raw = extractor.inspect(url, true).await?;
    let metadata = normalize_metadata(&raw);
    debug!(
        "Metadata for {}: {} (playlist: {})",
        url, metadata.title, metadata.is_playlist
    );
    Ok(metadata)
}

pub fn normalize_metadata(raw: &Value) -> MediaMetadata {
    let is_playlist = is_playlist(raw);

    MediaMetadata {
        title: raw["title"].as_str().unwrap_or("Untitled").to_string(),
        duration: raw["duration"].as_f64().map(|d| d.max(0.0) as u64).unwrap_or(0),
        uploader: raw["uploader"]
            .as_str()
            .or(raw["channel"].as_str())
            .unwrap_or("Unknown uploader")
            .to_string(),
        view_count: raw["view_count"].as_u64().unwrap_or(0),
        upload_date: raw["upload_date"].as_str().unwrap_or_default().to_string(),
        description: raw["description"]
            .as_str()
            .filter(|d| !d.is_empty())
            .map(|d| truncate_with_marker(d, DESCRIPTION_MAX_CHARS))
            .unwrap_or_default(),
        thumbnail: thumbnail(raw),
        is_playlist,
        playlist_count: if is_playlist { playlist_count(raw) } else { 0 },
    }
}

pub fn is_playlist(raw: &Value) -> bool {
    raw.get("entries").is_some() || raw["_type"].as_str() == Some("playlist")
}

/// Number of entries a playlist blob reports, 0 when unknown.
pub fn playlist_count(raw: &Value) -> u64 {
    raw["playlist_count"]
        .as_u64()
        .or_else(|| raw["entries"].as_array().map(|e| e.len() as u64))
        .unwrap_or(0)
}

fn thumbnail(raw: &Value) -> String {
    if let Some(url) = raw["thumbnail"].as_str() {
        return url.to_string();
    }

    // flat playlists only carry a thumbnails list
    raw["thumbnails"]
        .as_array()
        .and_then(|t| t.last())
        .and_then(|t| t["url"].as_str())
        .unwrap_or_default()
        .to_string()
}
