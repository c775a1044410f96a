use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Point-in-time copy of the feed's engagement counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateMetrics {
    pub session_id: Uuid,
    /// Milliseconds credited per item, from closed view sessions only.
    pub time_spent: BTreeMap<String, u64>,
    pub max_scroll_depth: usize,
    pub activation_count: u64,
    pub background_triggers: u64,
}

impl AggregateMetrics {
    pub fn total_time_ms(&self) -> u64 {
        self.time_spent.values().sum()
    }

    pub fn time_for(&self, item_id: &str) -> u64 {
        self.time_spent.get(item_id).copied().unwrap_or(0)
    }
}

/// Signal asking the surface to present the survey.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum SurveyTrigger {
    /// The activation count crossed a multiple of the subscriber's interval.
    Activations { count: u64 },
    /// The app left the foreground.
    Backgrounded { count: u64 },
}
