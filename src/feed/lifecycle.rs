use serde::{Deserialize, Serialize};

use crate::metrics::EngagementAggregator;

use super::scheduler::VisibilityScheduler;

const ENABLE_LOGS: bool = true;

use crate::log_info;

/// Application foreground state as reported by the host platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Active,
    Inactive,
    Background,
}

impl Default for AppLifecycle {
    fn default() -> Self {
        AppLifecycle::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransition {
    /// Left the foreground: active item paused, survey trigger fired.
    Suspended,
    /// Came back: active item resumed.
    Resumed,
    Unchanged,
}

/// Pauses and resumes the active item across app state changes.
///
/// The open view session is left untouched in both directions; its time is
/// credited only when the item is later scrolled away or unmounted.
#[derive(Debug, Default)]
pub struct LifecycleBridge {
    last: AppLifecycle,
}

impl LifecycleBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> AppLifecycle {
        self.last
    }

    pub async fn on_app_state_changed(
        &mut self,
        next: AppLifecycle,
        scheduler: &VisibilityScheduler,
        aggregator: &EngagementAggregator,
    ) -> LifecycleTransition {
        let previous = std::mem::replace(&mut self.last, next);

        match (previous, next) {
            (AppLifecycle::Active, AppLifecycle::Inactive | AppLifecycle::Background) => {
                log_info!("app {:?} -> {:?}: pausing active item", previous, next);
                scheduler.pause_active().await;
                aggregator.fire_background_trigger().await;
                LifecycleTransition::Suspended
            }
            (AppLifecycle::Inactive | AppLifecycle::Background, AppLifecycle::Active) => {
                log_info!("app {:?} -> active: resuming active item", previous);
                scheduler.resume_active().await;
                LifecycleTransition::Resumed
            }
            _ => LifecycleTransition::Unchanged,
        }
    }
}
