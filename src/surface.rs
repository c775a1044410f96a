use std::{collections::BTreeMap, ops::Range, sync::Arc};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    analytics::SurveyResponse,
    feed::{AppLifecycle, FeedController, RenderWindow},
    models::{CatalogItem, ViewabilityRecord},
    playback::{HeadlessPlayer, PlaybackHandle},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// One line of input for the headless surface, JSON encoded.
///
/// ```text
/// {"type":"viewability","changes":[{"itemId":"p1","index":0,"isViewable":true,"visibleFraction":0.9}]}
/// {"type":"appState","state":"background"}
/// {"type":"buffering","itemId":"p1","buffering":true}
/// {"type":"survey","responses":[{"questionId":"q1","answer":"yes"}]}
/// {"type":"metrics"}
/// {"type":"reset"}
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SurfaceEvent {
    Viewability {
        changes: Vec<ViewabilityRecord>,
    },
    AppState {
        state: AppLifecycle,
    },
    Buffering {
        #[serde(rename = "itemId")]
        item_id: String,
        buffering: bool,
    },
    Survey {
        responses: Vec<SurveyResponse>,
    },
    Metrics,
    Reset,
}

/// Stands in for the on-screen list: keeps the render window mounted around
/// the active item and forwards surface events to the controller.
pub struct HeadlessSurface {
    controller: FeedController,
    items: Vec<CatalogItem>,
    window: RenderWindow,
    client: Client,
    mounted: BTreeMap<usize, Arc<PlaybackHandle>>,
    range: Range<usize>,
}

impl HeadlessSurface {
    pub async fn start(
        controller: FeedController,
        items: Vec<CatalogItem>,
        window: RenderWindow,
        client: Client,
    ) -> Self {
        let range = window.initial(items.len());
        let mut surface = Self {
            controller,
            items,
            window,
            client,
            mounted: BTreeMap::new(),
            range: 0..0,
        };
        surface.apply_range(range).await;
        surface
    }

    pub fn mounted_range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Handles one event. Returns a JSON line to print, if the event asks
    /// for output.
    pub async fn handle(&mut self, event: SurfaceEvent) -> Result<Option<String>> {
        match event {
            SurfaceEvent::Viewability { changes } => {
                self.controller.on_viewability_changed(&changes).await;
                self.follow_focus().await;
                Ok(None)
            }
            SurfaceEvent::AppState { state } => {
                let transition = self.controller.on_app_state_changed(state).await;
                log_debug!("app state {:?}: {:?}", state, transition);
                Ok(None)
            }
            SurfaceEvent::Buffering { item_id, buffering } => {
                match self.mounted.values().find(|h| h.item_id() == item_id) {
                    Some(handle) => handle.on_buffering(buffering),
                    None => log_warn!("buffering report for unmounted item {item_id}"),
                }
                Ok(None)
            }
            SurfaceEvent::Survey { responses } => {
                let delivered = self.controller.submit_survey(responses).await;
                Ok(Some(serde_json::json!({ "surveyDelivered": delivered }).to_string()))
            }
            SurfaceEvent::Metrics => {
                let snapshot = self.controller.snapshot().await;
                Ok(Some(
                    serde_json::to_string(&snapshot).context("failed to encode metrics")?,
                ))
            }
            SurfaceEvent::Reset => {
                self.controller.reset().await;
                Ok(None)
            }
        }
    }

    /// Reads JSON lines until EOF, writing any responses to `output`.
    pub async fn drive<R, W>(&mut self, input: R, mut output: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await.context("failed to read event")? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event = match serde_json::from_str::<SurfaceEvent>(line) {
                Ok(event) => event,
                Err(err) => {
                    log_warn!("skipping malformed event: {err}");
                    continue;
                }
            };

            if let Some(reply) = self.handle(event).await? {
                output.write_all(reply.as_bytes()).await?;
                output.write_all(b"\n").await?;
                output.flush().await?;
            }
        }
        Ok(())
    }

    /// Unmounts every item.
    pub async fn shutdown(&mut self) {
        let mounted = std::mem::take(&mut self.mounted);
        for handle in mounted.values() {
            self.controller.unmount_item(handle).await;
        }
        self.range = 0..0;
    }

    async fn follow_focus(&mut self) {
        let Some(session) = self.controller.active_session().await else {
            return;
        };
        let next = self
            .window
            .step(self.range.clone(), session.index, self.items.len());
        self.apply_range(next).await;
    }

    async fn apply_range(&mut self, next: Range<usize>) {
        let leaving: Vec<usize> = self
            .mounted
            .keys()
            .copied()
            .filter(|index| !next.contains(index))
            .collect();
        for index in leaving {
            if let Some(handle) = self.mounted.remove(&index) {
                log_debug!("unmounting {} at {}", handle.item_id(), index);
                self.controller.unmount_item(&handle).await;
            }
        }

        for index in next.clone() {
            if self.mounted.contains_key(&index) {
                continue;
            }
            let Some(item) = self.items.get(index).cloned() else {
                continue;
            };
            let player = HeadlessPlayer::new(item.id.clone(), self.client.clone());
            let handle = self.controller.mount_item(item, Box::new(player)).await;

            let loader = handle.clone();
            tokio::spawn(async move {
                match loader.load().await {
                    Ok(status) => log_debug!("{} settled at {:?}", loader.item_id(), status),
                    Err(err) => log_warn!("{err}"),
                }
            });
            self.mounted.insert(index, handle);
        }

        if next != self.range {
            log_info!("render window {:?} -> {:?}", self.range, next);
        }
        self.range = next;
    }
}
