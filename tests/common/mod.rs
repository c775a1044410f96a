#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use reelfeed_lib::{
    analytics::{ActivityEvent, AnalyticsSink, SurveySubmission},
    error::{FeedError, FeedResult},
    feed::FeedController,
    models::CatalogItem,
    playback::MediaPlayer,
    settings::FeedConfig,
    source::{SourceResolver, StreamProbe},
    ManualClock,
};

pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Player that records every call as `"<label> <op>"`.
pub struct RecordingPlayer {
    label: String,
    failing_uris: Vec<String>,
    log: CallLog,
}

impl RecordingPlayer {
    pub fn new(label: &str, log: &CallLog) -> Self {
        Self {
            label: label.to_string(),
            failing_uris: Vec::new(),
            log: log.clone(),
        }
    }

    pub fn failing(mut self, uri: &str) -> Self {
        self.failing_uris.push(uri.to_string());
        self
    }

    fn push(&self, op: &str) {
        self.log.lock().unwrap().push(format!("{} {}", self.label, op));
    }
}

#[async_trait]
impl MediaPlayer for RecordingPlayer {
    async fn load(&self, uri: &str) -> Result<()> {
        self.push("load");
        if self.failing_uris.iter().any(|f| f == uri) {
            return Err(anyhow!("cannot decode {uri}"));
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        self.push("play");
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        self.push("pause");
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.push("release");
        Ok(())
    }
}

pub fn count(log: &CallLog, entry: &str) -> usize {
    log.lock().unwrap().iter().filter(|e| *e == entry).count()
}

pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

pub fn clear(log: &CallLog) {
    log.lock().unwrap().clear();
}

pub struct NotFoundProbe;

#[async_trait]
impl StreamProbe for NotFoundProbe {
    async fn probe(&self, uri: &str) -> Result<()> {
        Err(anyhow!("HEAD {uri}: 404 Not Found"))
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub activities: Mutex<Vec<ActivityEvent>>,
    pub surveys: Mutex<Vec<SurveySubmission>>,
    pub fail: bool,
}

#[async_trait]
impl AnalyticsSink for RecordingSink {
    async fn record_activity(&self, event: &ActivityEvent) -> FeedResult<()> {
        if self.fail {
            return Err(FeedError::SinkUnavailable("offline".into()));
        }
        self.activities.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn submit_survey(&self, submission: &SurveySubmission) -> FeedResult<()> {
        if self.fail {
            return Err(FeedError::SinkUnavailable("offline".into()));
        }
        self.surveys.lock().unwrap().push(submission.clone());
        Ok(())
    }
}

pub fn resolver() -> SourceResolver {
    SourceResolver::new(Arc::new(NotFoundProbe), "https://stream.example/{id}/playlist.m3u8")
}

pub struct Harness {
    pub controller: FeedController,
    pub clock: ManualClock,
    pub sink: Arc<RecordingSink>,
    pub log: CallLog,
}

pub fn harness() -> Harness {
    harness_with_sink(RecordingSink::default())
}

pub fn harness_with_sink(sink: RecordingSink) -> Harness {
    let clock = ManualClock::new();
    let sink = Arc::new(sink);
    let controller = FeedController::new(
        &FeedConfig::default(),
        resolver(),
        sink.clone(),
        Arc::new(clock.clone()),
    );
    Harness {
        controller,
        clock,
        sink,
        log: Arc::new(Mutex::new(Vec::new())),
    }
}

/// A streaming item that resolves on its primary tier without probing.
pub fn stream_item(id: &str) -> CatalogItem {
    CatalogItem::new(id, format!("https://cdn.example/{id}.m3u8")).streaming()
}
