//! Media items and the immutable playlist handed to the controller.

use anyhow::{Context, Result};
use std::ops::Index;
use std::path::Path;
use std::sync::Arc;

/// Kind of media an item holds.
///
/// `Image` and `Gif` are loaded and displayed the same way; the distinction
/// only matters to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Video,
    Image,
    Gif,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Video => "video",
            MediaType::Image => "image",
            MediaType::Gif => "gif",
        }
    }

    /// Check if this is a video media type.
    pub fn is_video(&self) -> bool {
        matches!(self, MediaType::Video)
    }

    /// Check if this type goes through the image pipeline.
    pub fn is_still(&self) -> bool {
        matches!(self, MediaType::Image | MediaType::Gif)
    }
}

/// Represents a media item from the playlist.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,
    pub src: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub rank: Option<f64>,
}

impl MediaItem {
    pub fn new(id: impl Into<String>, src: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            src: src.into(),
            media_type,
            redirect_url: None,
            rank: None,
        }
    }

    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }

    /// Redirect target, if present and non-empty.
    pub fn link(&self) -> Option<&str> {
        self.redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// Ordered, fixed list of media items.
///
/// Cloning is cheap; the items are shared.
#[derive(Debug, Clone, Default)]
pub struct MediaList {
    items: Arc<[MediaItem]>,
}

impl MediaList {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Build a list, dropping items whose source is blank.
    pub fn sanitized(items: Vec<MediaItem>) -> Self {
        let total = items.len();
        let kept: Vec<MediaItem> = items
            .into_iter()
            .filter(|item| !item.src.trim().is_empty())
            .collect();
        if kept.len() != total {
            tracing::warn!("Dropped {} media items with empty source", total - kept.len());
        }
        Self::new(kept)
    }

    /// Parse a JSON array of items.
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<MediaItem> =
            serde_json::from_str(json).context("Failed to parse media list")?;
        Ok(Self::sanitized(items))
    }

    /// Read a JSON array of items from disk.
    pub async fn from_file(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read media list {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Fetch a JSON array of items over HTTP.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<Self> {
        let res = client.get(url).send().await?.error_for_status()?;
        let items: Vec<MediaItem> = res.json().await.context("Invalid media list response")?;
        Ok(Self::sanitized(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaItem> {
        self.items.get(index)
    }

    /// Index after `current`, wrapping to the start.
    pub fn next_index(&self, current: usize) -> usize {
        if self.is_empty() {
            0
        } else {
            (current + 1) % self.len()
        }
    }

    /// Index before `current`, wrapping to the end.
    pub fn prev_index(&self, current: usize) -> usize {
        if self.is_empty() {
            0
        } else {
            (current + self.len() - 1) % self.len()
        }
    }
}

impl Index<usize> for MediaList {
    type Output = MediaItem;

    fn index(&self, index: usize) -> &MediaItem {
        &self.items[index]
    }
}
