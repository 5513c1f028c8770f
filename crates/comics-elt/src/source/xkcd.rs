//! HTTP client for the xkcd JSON API

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{ComicSource, FetchOutcome, RawRecord, SourceError, SourceResult};
use crate::config::SourceConfig;

/// Fetches `{base_url}/{num}/info.0.json`, one comic per request
pub struct XkcdClient {
    client: Client,
    base_url: String,
}

impl XkcdClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("comics-elt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &SourceConfig) -> SourceResult<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    pub fn comic_url(&self, num: i64) -> String {
        format!("{}/{}/info.0.json", self.base_url, num)
    }
}

#[async_trait]
impl ComicSource for XkcdClient {
    async fn fetch(&self, num: i64) -> SourceResult<FetchOutcome> {
        let url = self.comic_url(num);
        debug!(num, url = %url, "Fetching comic");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Transport {
                num,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Ok(FetchOutcome::NotFound {
                status: status.as_u16(),
            });
        }

        let body: Value = response.json().await.map_err(|e| SourceError::Decode {
            num,
            message: e.to_string(),
        })?;

        RawRecord::from_json(num, body).map(FetchOutcome::Found)
    }
}
