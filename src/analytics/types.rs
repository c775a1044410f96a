use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{metrics::AggregateMetrics, models::ClosedViewSession};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ActivityKind {
    /// One closed view session.
    View,
    /// Metrics snapshot pushed when the app leaves the foreground.
    Flush,
}

/// Body of `POST /analytics/activity`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub session_id: Uuid,
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<AggregateMetrics>,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn view(session_id: Uuid, closed: &ClosedViewSession) -> Self {
        Self {
            session_id,
            kind: ActivityKind::View,
            content_id: Some(closed.content_id.clone()),
            duration_ms: Some(closed.duration_ms),
            metrics: None,
            timestamp: Utc::now(),
        }
    }

    pub fn flush(metrics: AggregateMetrics) -> Self {
        Self {
            session_id: metrics.session_id,
            kind: ActivityKind::Flush,
            content_id: None,
            duration_ms: None,
            metrics: Some(metrics),
            timestamp: Utc::now(),
        }
    }
}

/// One answered survey question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub question_id: String,
    pub answer: String,
    #[serde(default = "answered_now")]
    pub timestamp: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

fn answered_now() -> DateTime<Utc> {
    Utc::now()
}

/// Body of `POST /analytics/survey`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SurveySubmission {
    pub session_id: Uuid,
    pub responses: Vec<SurveyResponse>,
    pub metrics: AggregateMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn survey_payload_uses_wire_field_names() {
        let metrics = AggregateMetrics {
            session_id: Uuid::nil(),
            time_spent: BTreeMap::from([("x".to_string(), 1_200)]),
            max_scroll_depth: 3,
            activation_count: 5,
            background_triggers: 0,
        };
        let submission = SurveySubmission {
            session_id: Uuid::nil(),
            responses: vec![SurveyResponse::new("q1", "yes")],
            metrics,
        };

        let value = serde_json::to_value(&submission).unwrap();
        let response = &value["responses"][0];
        assert_eq!(response["questionId"], "q1");
        assert_eq!(response["answer"], "yes");
        assert!(response["timestamp"].is_string());
        assert_eq!(value["metrics"]["timeSpent"]["x"], 1_200);
        assert_eq!(value["metrics"]["maxScrollDepth"], 3);
    }
}
