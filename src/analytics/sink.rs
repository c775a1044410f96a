use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::{
    error::{FeedError, FeedResult},
    settings::FeedConfig,
};

use super::types::{ActivityEvent, SurveySubmission};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Remote analytics endpoints. Failures surface as `SinkUnavailable` and
/// callers drop them; local metrics are never affected.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_activity(&self, event: &ActivityEvent) -> FeedResult<()>;
    async fn submit_survey(&self, submission: &SurveySubmission) -> FeedResult<()>;
}

pub struct HttpAnalyticsSink {
    client: Client,
    activity_url: String,
    survey_url: String,
}

impl HttpAnalyticsSink {
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build analytics http client")?;
        Ok(Self {
            client,
            activity_url: config.endpoint("analytics/activity"),
            survey_url: config.endpoint("analytics/survey"),
        })
    }

    async fn post<T: serde::Serialize + Sync>(&self, url: &str, body: &T) -> FeedResult<()> {
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map(|_| ())
            .map_err(|err| FeedError::SinkUnavailable(format!("POST {url}: {err}")))
    }
}

#[async_trait]
impl AnalyticsSink for HttpAnalyticsSink {
    async fn record_activity(&self, event: &ActivityEvent) -> FeedResult<()> {
        self.post(&self.activity_url, event).await
    }

    async fn submit_survey(&self, submission: &SurveySubmission) -> FeedResult<()> {
        self.post(&self.survey_url, submission).await
    }
}

/// Sink for runs with analytics switched off.
pub struct NoopSink;

#[async_trait]
impl AnalyticsSink for NoopSink {
    async fn record_activity(&self, _event: &ActivityEvent) -> FeedResult<()> {
        Ok(())
    }

    async fn submit_survey(&self, _submission: &SurveySubmission) -> FeedResult<()> {
        Ok(())
    }
}

/// Fire-and-forget activity log. Never retried, never awaited by the caller.
pub fn dispatch_activity(sink: Arc<dyn AnalyticsSink>, event: ActivityEvent) {
    tokio::spawn(async move {
        match sink.record_activity(&event).await {
            Ok(()) => log_debug!("activity {:?} delivered", event.kind),
            Err(err) => log_warn!("dropping activity {:?}: {err}", event.kind),
        }
    });
}
