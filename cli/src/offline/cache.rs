use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{AssetResponse, ResponseKind};

/// Named cache containers kept on disk, one directory per container.
#[derive(Debug, Clone)]
pub struct CacheStorage {
    root: PathBuf,
}

impl CacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open a container, creating it if it does not exist yet.
    pub async fn open(&self, name: &str) -> Result<Cache> {
        validate_cache_name(name)?;
        let dir = self.root.join(name);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;
        Ok(Cache { dir })
    }

    /// Names of all existing containers, sorted.
    pub async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to list cache directory: {}", self.root.display())
                });
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove a container and everything in it. Returns false if it did not exist.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        validate_cache_name(name)?;
        let dir = self.root.join(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to delete cache: {}", dir.display()))
            }
        }
    }
}

fn validate_cache_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
    {
        bail!("Invalid cache name '{name}'");
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    url: String,
    status: u16,
    kind: ResponseKind,
    content_type: Option<String>,
}

/// One cache container. Each entry is a body file plus a metadata file,
/// both named after the SHA-256 of the request URL.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    fn entry_paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let digest = Sha256::digest(url.as_bytes());
        let stem: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        (
            self.dir.join(format!("{stem}.json")),
            self.dir.join(format!("{stem}.body")),
        )
    }

    pub async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>> {
        let (meta_path, body_path) = self.entry_paths(url);
        let meta = match tokio::fs::read(&meta_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", meta_path.display()));
            }
        };
        let meta: EntryMeta = serde_json::from_slice(&meta)
            .with_context(|| format!("Corrupt cache entry: {}", meta_path.display()))?;
        let body = tokio::fs::read(&body_path)
            .await
            .with_context(|| format!("Failed to read {}", body_path.display()))?;

        Ok(Some(AssetResponse {
            url: meta.url,
            status: meta.status,
            kind: meta.kind,
            content_type: meta.content_type,
            body,
        }))
    }

    /// Store `response` under `url`, replacing any previous entry.
    ///
    /// The body is written before the metadata, so a half-written entry is
    /// never matched.
    pub async fn put(&self, url: &str, response: AssetResponse) -> Result<()> {
        let (meta_path, body_path) = self.entry_paths(url);
        let meta = EntryMeta {
            url: url.to_string(),
            status: response.status,
            kind: response.kind,
            content_type: response.content_type,
        };

        tokio::fs::write(&body_path, &response.body)
            .await
            .with_context(|| format!("Failed to write {}", body_path.display()))?;
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(&meta)?)
            .await
            .with_context(|| format!("Failed to write {}", meta_path.display()))?;
        Ok(())
    }

    /// Request URLs of every complete entry, sorted.
    pub async fn urls(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to list cache: {}", self.dir.display()))?;

        let mut urls = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(meta) = read_meta(&path).await {
                urls.push(meta.url);
            }
        }
        urls.sort();
        Ok(urls)
    }
}

async fn read_meta(path: &Path) -> Option<EntryMeta> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> AssetResponse {
        AssetResponse {
            url: "http://localhost:3006/index.html".to_string(),
            status: 200,
            kind: ResponseKind::Basic,
            content_type: Some("text/html".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_put_then_match() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path());
        let cache = storage.open("v1").await.unwrap();

        let url = "http://localhost:3006/index.html";
        assert!(cache.match_url(url).await.unwrap().is_none());

        cache.put(url, response("<h1>hi</h1>")).await.unwrap();
        let hit = cache.match_url(url).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.kind, ResponseKind::Basic);
        assert_eq!(hit.content_type.as_deref(), Some("text/html"));
        assert_eq!(hit.body(), b"<h1>hi</h1>");

        // Survives reopening
        let reopened = CacheStorage::new(dir.path()).open("v1").await.unwrap();
        assert!(reopened.match_url(url).await.unwrap().is_some());
        assert_eq!(reopened.urls().await.unwrap(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_keys_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path().join("offline"));
        assert!(storage.keys().await.unwrap().is_empty());

        storage.open("v2").await.unwrap();
        storage.open("v1").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["v1", "v2"]);

        assert!(storage.delete("v1").await.unwrap());
        assert!(!storage.delete("v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["v2"]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(dir.path());
        assert!(storage.open("../escape").await.is_err());
        assert!(storage.open("").await.is_err());
        assert!(storage.delete("..").await.is_err());
    }
}
