use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::MediaPlayer;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Player for running the feed without a screen.
///
/// `load` checks that the URI answers a `HEAD` request, which is enough to
/// exercise the source fallback chain end to end. Play and pause only log.
pub struct HeadlessPlayer {
    label: String,
    client: Client,
    loaded: Mutex<Option<String>>,
}

impl HeadlessPlayer {
    pub fn new(label: impl Into<String>, client: Client) -> Self {
        Self {
            label: label.into(),
            client,
            loaded: Mutex::new(None),
        }
    }

    fn loaded_uri(&self) -> Option<String> {
        self.loaded.lock().map(|g| g.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl MediaPlayer for HeadlessPlayer {
    async fn load(&self, uri: &str) -> Result<()> {
        self.client
            .head(uri)
            .send()
            .await
            .with_context(|| format!("[{}] fetch {uri}", self.label))?
            .error_for_status()
            .with_context(|| format!("[{}] {uri} not playable", self.label))?;

        *self
            .loaded
            .lock()
            .map_err(|_| anyhow!("player state poisoned"))? = Some(uri.to_string());
        log_info!("[{}] loaded {}", self.label, uri);
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        let uri = self
            .loaded_uri()
            .ok_or_else(|| anyhow!("[{}] play before load", self.label))?;
        log_info!("[{}] playing {}", self.label, uri);
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        log_info!("[{}] paused", self.label);
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        if let Ok(mut guard) = self.loaded.lock() {
            guard.take();
        }
        log_info!("[{}] released", self.label);
        Ok(())
    }
}
