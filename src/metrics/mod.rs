mod types;

pub use types::{AggregateMetrics, SurveyTrigger};

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Feed-scoped engagement accumulator.
///
/// The only writer of watch time, scroll depth and activation counts. All
/// mutations are additive or max-combining; `reset` is the single exception
/// and is reserved for a full feed remount.
pub struct EngagementAggregator {
    inner: Arc<Mutex<AggregatorState>>,
}

struct AggregatorState {
    session_id: Uuid,
    enabled: bool,
    time_spent: HashMap<String, u64>,
    max_scroll_depth: usize,
    activation_count: u64,
    background_triggers: u64,
    subscribers: Vec<TriggerSubscriber>,
}

struct TriggerSubscriber {
    every_n: u64,
    tx: mpsc::UnboundedSender<SurveyTrigger>,
}

impl AggregatorState {
    fn notify(&mut self, trigger: SurveyTrigger) {
        self.subscribers.retain(|sub| {
            let due = match trigger {
                SurveyTrigger::Activations { count } => count % sub.every_n == 0,
                SurveyTrigger::Backgrounded { .. } => true,
            };
            !due || sub.tx.send(trigger).is_ok()
        });
    }
}

impl EngagementAggregator {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AggregatorState {
                session_id: Uuid::new_v4(),
                enabled,
                time_spent: HashMap::new(),
                max_scroll_depth: 0,
                activation_count: 0,
                background_triggers: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub async fn is_enabled(&self) -> bool {
        self.inner.lock().await.enabled
    }

    pub async fn session_id(&self) -> Uuid {
        self.inner.lock().await.session_id
    }

    /// Counts one activation at list position `index` and returns the new
    /// activation count. Subscribers whose interval divides the new count are
    /// signalled exactly once for this crossing.
    pub async fn record_activation(&self, index: usize) -> u64 {
        let mut state = self.inner.lock().await;
        if !state.enabled {
            return state.activation_count;
        }

        state.activation_count += 1;
        state.max_scroll_depth = state.max_scroll_depth.max(index);
        let count = state.activation_count;
        log_debug!("activation #{count} at index {index}");

        state.notify(SurveyTrigger::Activations { count });
        count
    }

    /// Credits a closed view session's duration to `item_id`.
    pub async fn record_duration(&self, item_id: &str, ms: u64) {
        let mut state = self.inner.lock().await;
        if !state.enabled {
            return;
        }
        let total = state.time_spent.entry(item_id.to_string()).or_insert(0);
        *total = total.saturating_add(ms);
    }

    /// Fires the survey signal for an app leaving the foreground. Counted
    /// separately from activations, so both may fire close together.
    pub async fn fire_background_trigger(&self) {
        let mut state = self.inner.lock().await;
        if !state.enabled {
            return;
        }
        state.background_triggers += 1;
        let count = state.background_triggers;
        log_info!("survey trigger: app backgrounded (#{count})");
        state.notify(SurveyTrigger::Backgrounded { count });
    }

    pub async fn subscribe_to_trigger(
        &self,
        every_n_activations: u64,
    ) -> mpsc::UnboundedReceiver<SurveyTrigger> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().await.subscribers.push(TriggerSubscriber {
            every_n: every_n_activations.max(1),
            tx,
        });
        rx
    }

    pub async fn snapshot(&self) -> AggregateMetrics {
        let state = self.inner.lock().await;
        AggregateMetrics {
            session_id: state.session_id,
            time_spent: state
                .time_spent
                .iter()
                .map(|(id, ms)| (id.clone(), *ms))
                .collect::<BTreeMap<_, _>>(),
            max_scroll_depth: state.max_scroll_depth,
            activation_count: state.activation_count,
            background_triggers: state.background_triggers,
        }
    }

    /// Zeroes every counter and starts a new analytics session id.
    /// Trigger subscriptions survive.
    pub async fn reset(&self) {
        let mut state = self.inner.lock().await;
        state.session_id = Uuid::new_v4();
        state.time_spent.clear();
        state.max_scroll_depth = 0;
        state.activation_count = 0;
        state.background_triggers = 0;
        log_info!("engagement metrics reset, new session {}", state.session_id);
    }
}

impl Default for EngagementAggregator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Clone for EngagementAggregator {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
