//! Image and gif loading.
//!
//! Fetches a source over HTTP or from disk, decodes it fully off the async
//! runtime, and keeps recently decoded frames in an LRU so revisiting an item
//! in the carousel does not hit the network again.

use super::{EventSender, ImageLoader, LoadHandle, LoadRequest, LoaderEvent};
use crate::error::MediaLoadError;
use anyhow::{Context, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Decoded RGBA pixels of an image or the first frame of a gif.
#[derive(Clone)]
pub struct DecodedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

type DecodedCache = Arc<Mutex<LruCache<String, Arc<DecodedImage>>>>;

/// Image loader backed by reqwest, tokio fs, and the `image` crate.
pub struct HttpImageLoader {
    client: reqwest::Client,
    decoded: DecodedCache,
}

impl HttpImageLoader {
    /// Create a loader with its own HTTP client.
    pub fn new(cache_entries: usize, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(client, cache_entries))
    }

    pub fn with_client(client: reqwest::Client, cache_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            decoded: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Previously decoded image for `src`, for the presentation layer.
    pub fn decoded(&self, src: &str) -> Option<Arc<DecodedImage>> {
        self.decoded.lock().ok()?.get(src).cloned()
    }
}

impl ImageLoader for HttpImageLoader {
    fn load(&mut self, request: LoadRequest, events: EventSender) -> LoadHandle {
        let cached = self
            .decoded
            .lock()
            .map(|mut cache| cache.get(&request.src).is_some())
            .unwrap_or(false);
        if cached {
            tracing::debug!("Image cache hit: {}", request.src);
            events.loader(request.ticket, LoaderEvent::Ready);
            return LoadHandle::detached();
        }

        let client = self.client.clone();
        let decoded = self.decoded.clone();
        let task = tokio::spawn(async move {
            let LoadRequest { ticket, src } = request;
            match fetch_and_decode(&client, &src).await {
                Ok(image) => {
                    tracing::debug!("Decoded {} ({}x{})", src, image.width, image.height);
                    if let Ok(mut cache) = decoded.lock() {
                        cache.put(src, Arc::new(image));
                    }
                    events.loader(ticket, LoaderEvent::Ready);
                }
                Err(e) => {
                    tracing::warn!("Image failed to load: {}", e);
                    events.loader(ticket, LoaderEvent::Failed(e));
                }
            }
        });

        LoadHandle::from_task(task.abort_handle())
    }
}

async fn fetch_and_decode(
    client: &reqwest::Client,
    src: &str,
) -> std::result::Result<DecodedImage, MediaLoadError> {
    let bytes = fetch_bytes(client, src).await?;

    let owned_src = src.to_string();
    tokio::task::spawn_blocking(move || decode(&owned_src, &bytes))
        .await
        .map_err(|e| MediaLoadError::decode(src, e))?
}

async fn fetch_bytes(
    client: &reqwest::Client,
    src: &str,
) -> std::result::Result<Vec<u8>, MediaLoadError> {
    if src.starts_with("http://") || src.starts_with("https://") {
        let res = client
            .get(src)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|e| MediaLoadError::fetch(src, e))?;
        let bytes = res.bytes().await.map_err(|e| MediaLoadError::fetch(src, e))?;
        Ok(bytes.to_vec())
    } else {
        let path = local_path(src)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| MediaLoadError::fetch(src, e))
    }
}

fn local_path(src: &str) -> std::result::Result<PathBuf, MediaLoadError> {
    if src.starts_with("file://") {
        url::Url::parse(src)
            .ok()
            .and_then(|url| url.to_file_path().ok())
            .ok_or_else(|| MediaLoadError::fetch(src, "invalid file URL"))
    } else {
        Ok(PathBuf::from(src))
    }
}

fn decode(src: &str, bytes: &[u8]) -> std::result::Result<DecodedImage, MediaLoadError> {
    let rgba = ::image::load_from_memory(bytes)
        .map_err(|e| MediaLoadError::decode(src, e))?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: rgba.into_raw(),
        width,
        height,
    })
}
