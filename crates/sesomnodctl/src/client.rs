//! Thin HTTP client for the daemon API.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::time::Duration;

pub struct EngineClient {
    client: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            // Sync analysis fetches five leagues upstream
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("is the daemon running at {}?", self.base_url))?;
        Self::into_json(resp).await
    }

    pub async fn post(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("is the daemon running at {}?", self.base_url))?;
        Self::into_json(resp).await
    }

    async fn into_json(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("daemon returned {}: {}", status, body);
        }
        serde_json::from_str(&body).context("invalid JSON from daemon")
    }
}
