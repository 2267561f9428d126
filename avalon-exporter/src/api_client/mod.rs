//! HTTP client for the exporter API, used by `avalon-cli`.

pub mod types;

use anyhow::Result;

use types::{DebugInfo, VersionResponse};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9100";

/// Thin wrapper over reqwest with a configurable base URL.
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn get_version(&self) -> Result<VersionResponse> {
        let url = format!("{}/version", self.base_url);
        Ok(self.http.get(url).send().await?.error_for_status()?.json().await?)
    }

    pub async fn get_debug(&self) -> Result<DebugInfo> {
        let url = format!("{}/debug", self.base_url);
        Ok(self.http.get(url).send().await?.error_for_status()?.json().await?)
    }

    pub async fn get_metrics(&self) -> Result<String> {
        let url = format!("{}/metrics", self.base_url);
        Ok(self.http.get(url).send().await?.error_for_status()?.text().await?)
    }
}
