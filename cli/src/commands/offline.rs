use std::io::Write;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::Serialize;

use crate::config::Config;
use crate::offline::{CacheStorage, HttpFetcher, OfflineCache};

fn controller(config: &Config, origin: &str, cache_name: &str) -> Result<OfflineCache<HttpFetcher>> {
    let origin = Url::parse(origin).with_context(|| format!("Invalid origin URL '{origin}'"))?;
    let fetcher = HttpFetcher::new(origin.clone())?;
    let storage = CacheStorage::new(config.offline_dir());
    Ok(OfflineCache::new(fetcher, storage, origin, cache_name))
}

pub(crate) async fn cmd_offline_install(
    config: &Config,
    origin: &str,
    cache_name: &str,
    json: bool,
) -> Result<()> {
    let offline = controller(config, origin, cache_name)?;
    let count = offline.install().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "cache": offline.cache_name(), "assets": count })
        );
    } else {
        println!("Installed {count} assets into {}", offline.cache_name());
    }
    Ok(())
}

pub(crate) async fn cmd_offline_activate(
    config: &Config,
    origin: &str,
    cache_name: &str,
    json: bool,
) -> Result<()> {
    let offline = controller(config, origin, cache_name)?;
    let deleted = offline.activate().await?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "cache": offline.cache_name(), "deleted": deleted })
        );
    } else if deleted.is_empty() {
        println!("No stale caches");
    } else {
        for name in &deleted {
            println!("Deleted {name}");
        }
    }
    Ok(())
}

pub(crate) async fn cmd_offline_fetch(
    config: &Config,
    origin: &str,
    cache_name: &str,
    path: &str,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    struct FetchResult<'a> {
        url: &'a str,
        status: u16,
        kind: crate::offline::ResponseKind,
        content_type: Option<&'a str>,
        bytes: usize,
    }

    let offline = controller(config, origin, cache_name)?;
    let url = offline.resolve(path)?;
    let response = offline.fetch(&url).await;
    offline.flush().await;
    let response = response?;

    if json {
        let result = FetchResult {
            url: &response.url,
            status: response.status,
            kind: response.kind,
            content_type: response.content_type.as_deref(),
            bytes: response.body().len(),
        };
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        std::io::stdout()
            .lock()
            .write_all(&response.into_body())
            .context("Failed to write response body")?;
    }
    Ok(())
}

pub(crate) async fn cmd_offline_list(
    config: &Config,
    origin: &str,
    cache_name: &str,
    json: bool,
) -> Result<()> {
    #[derive(Serialize)]
    struct CacheListing {
        current: String,
        caches: Vec<String>,
        entries: Vec<String>,
    }

    let offline = controller(config, origin, cache_name)?;
    let caches = offline.storage().keys().await?;
    let entries = if caches.iter().any(|c| c == offline.cache_name()) {
        offline.cached_urls().await?
    } else {
        Vec::new()
    };

    if json {
        let listing = CacheListing {
            current: offline.cache_name().to_string(),
            caches,
            entries,
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if caches.is_empty() {
        println!("No offline caches");
        return Ok(());
    }
    for name in &caches {
        let marker = if name == offline.cache_name() { "*" } else { " " };
        println!("{marker} {name}");
    }
    if !entries.is_empty() {
        println!("\n{} entries in {}:", entries.len(), offline.cache_name());
        for url in &entries {
            println!("  {url}");
        }
    }
    Ok(())
}
