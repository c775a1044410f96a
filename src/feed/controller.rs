use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{mpsc, Mutex};

use crate::{
    analytics::{
        dispatch_activity, ActivityEvent, AnalyticsSink, HttpAnalyticsSink, NoopSink,
        SurveyResponse, SurveySubmission,
    },
    metrics::{AggregateMetrics, EngagementAggregator, SurveyTrigger},
    models::{ActiveViewSession, CatalogItem, ClosedViewSession, ViewabilityRecord},
    playback::{MediaPlayer, PlaybackHandle},
    settings::FeedConfig,
    source::SourceResolver,
    utils::{Clock, SystemClock},
};

use super::{
    lifecycle::{AppLifecycle, LifecycleBridge, LifecycleTransition},
    scheduler::VisibilityScheduler,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Single entry point for the list surface and the host app.
///
/// One instance per mounted feed. Viewability batches, mounts, unmounts and
/// app-state changes are serialized through one lock, so they apply strictly
/// in arrival order.
#[derive(Clone)]
pub struct FeedController {
    state: Arc<Mutex<FeedState>>,
    aggregator: EngagementAggregator,
    resolver: SourceResolver,
    sink: Arc<dyn AnalyticsSink>,
    survey_every: u64,
}

struct FeedState {
    scheduler: VisibilityScheduler,
    lifecycle: LifecycleBridge,
}

impl FeedController {
    pub fn new(
        config: &FeedConfig,
        resolver: SourceResolver,
        sink: Arc<dyn AnalyticsSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let aggregator = EngagementAggregator::new(config.analytics_enabled);
        let scheduler =
            VisibilityScheduler::new(config.viewability_threshold, clock, aggregator.clone());

        Self {
            state: Arc::new(Mutex::new(FeedState {
                scheduler,
                lifecycle: LifecycleBridge::new(),
            })),
            aggregator,
            resolver,
            sink,
            survey_every: config.survey_every,
        }
    }

    /// Controller wired to the HTTP probe and analytics endpoints in `config`.
    /// With analytics switched off nothing is sent anywhere.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let resolver = SourceResolver::from_config(config)?;
        let sink: Arc<dyn AnalyticsSink> = if config.analytics_enabled {
            Arc::new(HttpAnalyticsSink::from_config(config)?)
        } else {
            Arc::new(NoopSink)
        };
        Ok(Self::new(
            config,
            resolver,
            sink,
            Arc::new(SystemClock::new()),
        ))
    }

    /// Creates and registers the handle for a newly mounted item. The caller
    /// owns the returned handle and drives its `load`.
    ///
    /// If the item was already reported viewable before it mounted, its session
    /// is open and the handle is told to play right away; playback then starts
    /// as soon as `load` reaches `ready`.
    pub async fn mount_item(
        &self,
        item: CatalogItem,
        player: Box<dyn MediaPlayer>,
    ) -> Arc<PlaybackHandle> {
        let handle = PlaybackHandle::new(item, player, self.resolver.clone());
        let mut state = self.state.lock().await;
        state.scheduler.register(&handle);

        let already_active = state
            .scheduler
            .active_session()
            .is_some_and(|session| session.content_id == handle.item_id());
        if already_active {
            log_debug!("{} mounted while active, starting playback", handle.item_id());
            if let Err(err) = handle.play().await {
                log_warn!("play on mount failed for {}: {err}", handle.item_id());
            }
        }
        handle
    }

    /// Removes the item from the registry and releases its media. Time for an
    /// open session on this item is credited first.
    pub async fn unmount_item(&self, handle: &Arc<PlaybackHandle>) {
        let closed = self.state.lock().await.scheduler.unregister(handle).await;
        if let Some(closed) = closed {
            self.report(vec![closed]).await;
        }

        if let Err(err) = handle.unload().await {
            log_warn!("unload failed for {}: {err}", handle.item_id());
        }
    }

    pub async fn on_viewability_changed(&self, changes: &[ViewabilityRecord]) {
        let closed = {
            let mut state = self.state.lock().await;
            state.scheduler.on_viewability_changed(changes).await
        };
        self.report(closed).await;
    }

    pub async fn on_app_state_changed(&self, next: AppLifecycle) -> LifecycleTransition {
        let transition = {
            let mut state = self.state.lock().await;
            let FeedState {
                scheduler,
                lifecycle,
            } = &mut *state;
            lifecycle
                .on_app_state_changed(next, scheduler, &self.aggregator)
                .await
        };

        if transition == LifecycleTransition::Suspended && self.aggregator.is_enabled().await {
            let snapshot = self.aggregator.snapshot().await;
            dispatch_activity(self.sink.clone(), ActivityEvent::flush(snapshot));
        }
        transition
    }

    pub async fn app_state(&self) -> AppLifecycle {
        self.state.lock().await.lifecycle.current()
    }

    pub async fn active_session(&self) -> Option<ActiveViewSession> {
        self.state.lock().await.scheduler.active_session().cloned()
    }

    pub async fn snapshot(&self) -> AggregateMetrics {
        self.aggregator.snapshot().await
    }

    /// Survey signal at the configured activation interval, plus on every
    /// transition out of the foreground.
    pub async fn subscribe_to_survey(&self) -> mpsc::UnboundedReceiver<SurveyTrigger> {
        self.aggregator.subscribe_to_trigger(self.survey_every).await
    }

    /// Best-effort survey upload. Returns whether the sink accepted it; a
    /// failure is logged and otherwise ignored.
    pub async fn submit_survey(&self, responses: Vec<SurveyResponse>) -> bool {
        let metrics = self.aggregator.snapshot().await;
        let submission = SurveySubmission {
            session_id: metrics.session_id,
            responses,
            metrics,
        };

        match self.sink.submit_survey(&submission).await {
            Ok(()) => {
                log_info!("survey submitted ({} answers)", submission.responses.len());
                true
            }
            Err(err) => {
                log_warn!("dropping survey submission: {err}");
                false
            }
        }
    }

    /// Full remount: the open session is dropped without credit and every
    /// counter returns to zero.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.scheduler.discard_session().await;
        self.aggregator.reset().await;
    }

    async fn report(&self, closed: Vec<ClosedViewSession>) {
        if closed.is_empty() || !self.aggregator.is_enabled().await {
            return;
        }
        let session_id = self.aggregator.session_id().await;
        for session in &closed {
            dispatch_activity(self.sink.clone(), ActivityEvent::view(session_id, session));
        }
    }
}
