use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a URL points at, as far as its shape tells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    NotSupported,
    SingleItem,
    Playlist,
    ItemInPlaylist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub view_count: u64,
    pub upload_date: String,
    pub description: String,
    pub thumbnail: String,
    pub is_playlist: bool,
    pub playlist_count: u64,
}

/// Maximum video height, parsed from labels like `720p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quality {
    pub label: String,
    pub max_height: u32,
}

impl Quality {
    pub fn parse(label: &str) -> Result<Self, ValidationError> {
        let trimmed = label.trim();
        let max_height = trimmed
            .strip_suffix('p')
            .or_else(|| trimmed.strip_suffix('P'))
            .and_then(|digits| digits.parse::<u32>().ok())
            .filter(|height| *height > 0)
            .ok_or_else(|| ValidationError::InvalidQuality(label.to_string()))?;

        Ok(Self {
            label: trimmed.to_lowercase(),
            max_height,
        })
    }

    pub fn format_selector(&self) -> String {
        format!("best[height<={}]", self.max_height)
    }
}

/// Which entries of the target a transfer covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemFilter {
    /// Only the pinned item, even if the URL also names a playlist
    NoPlaylist,
    /// One playlist entry, 1-based
    PlaylistItem(u64),
    WholePlaylist,
}

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub url: String,
    pub output_template: PathBuf,
    pub quality: Quality,
    pub items: ItemFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteProgress {
    pub downloaded: u64,
    pub total: Option<u64>,
}
