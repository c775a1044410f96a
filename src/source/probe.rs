use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Existence check for a streaming endpoint.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    /// `Ok(())` when the endpoint exists and answered with a success status.
    async fn probe(&self, uri: &str) -> Result<()>;
}

pub struct HttpStreamProbe {
    client: Client,
}

impl HttpStreamProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build probe http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StreamProbe for HttpStreamProbe {
    async fn probe(&self, uri: &str) -> Result<()> {
        self.client
            .head(uri)
            .send()
            .await
            .with_context(|| format!("HEAD {uri}"))?
            .error_for_status()
            .with_context(|| format!("HEAD {uri} non-2xx"))?;
        Ok(())
    }
}
