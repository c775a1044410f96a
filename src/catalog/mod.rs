use anyhow::{Context, Result};
use reqwest::Client;

use crate::{
    error::{FeedError, FeedResult},
    models::CatalogItem,
    settings::FeedConfig,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const BUNDLED_CATALOG: &str = include_str!("bundled.json");

/// Static catalog shipped with the binary so the feed is never empty.
pub fn bundled() -> Vec<CatalogItem> {
    match serde_json::from_str(BUNDLED_CATALOG) {
        Ok(items) => items,
        Err(err) => {
            log_error!("bundled catalog is malformed: {err}");
            Vec::new()
        }
    }
}

pub struct CatalogClient {
    client: Client,
    posts_url: String,
}

impl CatalogClient {
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build catalog http client")?;
        Ok(Self {
            client,
            posts_url: config.endpoint("posts"),
        })
    }

    /// `GET /posts`. Any transport, status or decoding failure is reported as
    /// `NetworkUnavailable`.
    pub async fn fetch(&self) -> FeedResult<Vec<CatalogItem>> {
        let unavailable = |err: reqwest::Error| FeedError::NetworkUnavailable(err.to_string());

        self.client
            .get(&self.posts_url)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?
            .json::<Vec<CatalogItem>>()
            .await
            .map_err(unavailable)
    }

    /// Remote catalog, or the bundled one when the remote is unreachable or
    /// returns nothing.
    pub async fn load(&self) -> Vec<CatalogItem> {
        match self.fetch().await {
            Ok(items) if !items.is_empty() => {
                log_info!("fetched {} posts from {}", items.len(), self.posts_url);
                items
            }
            Ok(_) => {
                log_warn!("{} returned no posts, using bundled catalog", self.posts_url);
                bundled()
            }
            Err(err) => {
                log_warn!("{err}; using bundled catalog");
                bundled()
            }
        }
    }
}
