use anyhow::{Context, Result};
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;

use super::{AssetResponse, Fetcher, ResponseKind};

/// Fetches assets over HTTP, classifying responses against one origin.
pub struct HttpFetcher {
    client: reqwest::Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(origin: Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!(
                "mealbook/{} (offline cache)",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(std::time::Duration::from_secs(10))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, origin })
    }

    fn classify(&self, final_url: &Url) -> ResponseKind {
        if final_url.origin() == self.origin.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<AssetResponse> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        // Redirects are followed, so the kind depends on where we ended up
        let kind = self.classify(resp.url());
        let status = resp.status().as_u16();
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;

        Ok(AssetResponse::new(
            url.to_string(),
            status,
            kind,
            content_type,
            body.to_vec(),
        ))
    }
}
