//! Cache-first asset fetching for the front-end.
//!
//! A versioned container is filled with a fixed set of assets on install,
//! older containers are purged on activate, and every other fetch is served
//! from the cache when possible and cached opportunistically when not.

mod cache;
mod fetcher;

use std::future::Future;
use std::sync::Mutex;

use anyhow::{Context, Result, bail};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

pub use cache::CacheStorage;
pub use fetcher::HttpFetcher;

/// Current container name. Bump the version when the precached assets change.
pub const CACHE_NAME: &str = "mealbook-cache-v12";

pub const PRECACHE_ASSETS: &[&str] = &[
    "./index.html",
    "./manifest.json",
    "./icons/192.png",
    "./icons/512.png",
    "./audio/finish.mp3",
    "./audio/interval.mp3",
];

/// How a response relates to the origin it was requested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    /// Same-origin response.
    Basic,
    /// Cross-origin response.
    Cors,
}

#[derive(Debug)]
pub struct AssetResponse {
    pub url: String,
    pub status: u16,
    pub kind: ResponseKind,
    pub content_type: Option<String>,
    body: Vec<u8>,
}

impl AssetResponse {
    pub fn new(
        url: String,
        status: u16,
        kind: ResponseKind,
        content_type: Option<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            url,
            status,
            kind,
            content_type,
            body,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Independent copy for the cache; the original goes back to the caller.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            url: self.url.clone(),
            status: self.status,
            kind: self.kind,
            content_type: self.content_type.clone(),
            body: self.body.clone(),
        }
    }

    fn is_cacheable(&self) -> bool {
        self.status == 200 && self.kind == ResponseKind::Basic
    }
}

/// Network access for the offline cache.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<AssetResponse>> + Send;
}

pub struct OfflineCache<F> {
    fetcher: F,
    storage: CacheStorage,
    origin: Url,
    cache_name: String,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl<F: Fetcher> OfflineCache<F> {
    pub fn new(fetcher: F, storage: CacheStorage, origin: Url, cache_name: &str) -> Self {
        Self {
            fetcher,
            storage,
            origin,
            cache_name: cache_name.to_string(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn storage(&self) -> &CacheStorage {
        &self.storage
    }

    /// Resolve an asset path such as `./index.html` against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .with_context(|| format!("Invalid asset path '{path}'"))
    }

    /// Fill the current container with every precached asset.
    ///
    /// All assets are fetched before anything is stored; one failed fetch
    /// fails the install and leaves the container untouched.
    pub async fn install(&self) -> Result<usize> {
        let cache = self.storage.open(&self.cache_name).await?;

        let mut fetched = Vec::with_capacity(PRECACHE_ASSETS.len());
        for path in PRECACHE_ASSETS {
            let url = self.resolve(path)?;
            let response = self
                .fetcher
                .fetch(&url)
                .await
                .with_context(|| format!("Install failed fetching {url}"))?;
            if !response.is_ok() {
                bail!(
                    "Install failed: {url} returned status {}",
                    response.status
                );
            }
            fetched.push((url, response));
        }

        let count = fetched.len();
        for (url, response) in fetched {
            cache.put(url.as_str(), response).await?;
        }
        tracing::info!(cache = %self.cache_name, assets = count, "offline cache installed");
        Ok(count)
    }

    /// Delete every container except the current one. Returns the deleted names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name != self.cache_name && self.storage.delete(&name).await? {
                tracing::info!(cache = %name, "deleted stale offline cache");
                deleted.push(name);
            }
        }
        Ok(deleted)
    }

    /// Serve `url` from the current container, falling back to the network.
    ///
    /// Same-origin 200 responses are copied into the cache by a background
    /// task; the caller gets the original without waiting for the write.
    pub async fn fetch(&self, url: &Url) -> Result<AssetResponse> {
        let cache = self.storage.open(&self.cache_name).await?;
        match cache.match_url(url.as_str()).await {
            Ok(Some(hit)) => return Ok(hit),
            Ok(None) => {}
            Err(e) => tracing::warn!(%url, "ignoring unreadable cache entry: {e:#}"),
        }

        let response = self.fetcher.fetch(url).await?;
        if !response.is_cacheable() {
            return Ok(response);
        }

        let copy = response.duplicate();
        let key = url.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = cache.put(&key, copy).await {
                tracing::warn!(url = %key, "failed to cache response: {e:#}");
            }
        });
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Finished writes have already logged their outcome
        pending.retain(|h| !h.is_finished());
        pending.push(handle);

        Ok(response)
    }

    /// Wait for background cache writes started by [`Self::fetch`].
    pub async fn flush(&self) {
        let handles: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!("cache write task failed: {e}");
            }
        }
    }

    pub async fn cached_urls(&self) -> Result<Vec<String>> {
        self.storage.open(&self.cache_name).await?.urls().await
    }
}
