use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use crate::{
    error::FeedError,
    metrics::EngagementAggregator,
    models::{ActiveViewSession, ClosedViewSession, ViewabilityRecord},
    playback::PlaybackHandle,
    utils::Clock,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Pause,
}

/// Decides which single item plays as the list scrolls.
///
/// Holds weak references to the mounted items' handles, keyed by item id.
/// At most one [`ActiveViewSession`] exists at a time, and a session is always
/// closed before the next one opens.
pub struct VisibilityScheduler {
    threshold: f32,
    clock: Arc<dyn Clock>,
    aggregator: EngagementAggregator,
    handles: HashMap<String, Weak<PlaybackHandle>>,
    session: Option<ActiveViewSession>,
}

impl VisibilityScheduler {
    pub fn new(threshold: f32, clock: Arc<dyn Clock>, aggregator: EngagementAggregator) -> Self {
        Self {
            threshold,
            clock,
            aggregator,
            handles: HashMap::new(),
            session: None,
        }
    }

    pub fn register(&mut self, handle: &Arc<PlaybackHandle>) {
        self.handles
            .insert(handle.item_id().to_string(), Arc::downgrade(handle));
    }

    /// Drops the registry entry for `handle`. A newer handle registered under
    /// the same id by a rapid remount is left alone. If the item owned the
    /// open session, the session is closed and credited.
    pub async fn unregister(&mut self, handle: &Arc<PlaybackHandle>) -> Option<ClosedViewSession> {
        let item_id = handle.item_id();
        let same_entry = self
            .handles
            .get(item_id)
            .map(|weak| weak.ptr_eq(&Arc::downgrade(handle)) || weak.strong_count() == 0)
            .unwrap_or(false);
        if !same_entry {
            return None;
        }
        self.handles.remove(item_id);

        if self.is_active(item_id) {
            return self.close_session().await;
        }
        None
    }

    pub fn registered(&self) -> usize {
        self.handles.len()
    }

    pub fn is_registered(&self, item_id: &str) -> bool {
        self.handles.contains_key(item_id)
    }

    pub fn active_session(&self) -> Option<&ActiveViewSession> {
        self.session.as_ref()
    }

    pub fn active_handle(&self) -> Option<Arc<PlaybackHandle>> {
        let session = self.session.as_ref()?;
        self.handles.get(&session.content_id)?.upgrade()
    }

    /// Applies one viewability batch from the list surface and returns the
    /// sessions it closed, in closing order.
    pub async fn on_viewability_changed(
        &mut self,
        changes: &[ViewabilityRecord],
    ) -> Vec<ClosedViewSession> {
        let mut closed = Vec::new();

        for change in changes {
            if change.crosses(self.threshold) {
                if self.is_active(&change.item_id) {
                    continue;
                }

                if let Some(previous) = self.close_and_pause().await {
                    closed.push(previous);
                }

                let now = self.clock.now_ms();
                self.session = Some(ActiveViewSession::open(
                    change.item_id.clone(),
                    change.index,
                    now,
                ));
                log_info!(
                    "activated {} at index {} (t={}ms)",
                    change.item_id,
                    change.index,
                    now
                );
                self.send(&change.item_id, Command::Play).await;
                self.aggregator.record_activation(change.index).await;
            } else if !change.is_viewable && self.is_active(&change.item_id) {
                if let Some(previous) = self.close_and_pause().await {
                    closed.push(previous);
                }
            }
        }

        closed
    }

    /// Pauses the active item without closing its session.
    pub async fn pause_active(&self) {
        if let Some(session) = &self.session {
            self.send(&session.content_id, Command::Pause).await;
        }
    }

    /// Resumes the active item, if any.
    pub async fn resume_active(&self) {
        if let Some(session) = &self.session {
            self.send(&session.content_id, Command::Play).await;
        }
    }

    /// Drops the open session without crediting any time. The item is still
    /// paused, so nothing keeps playing without a session.
    pub async fn discard_session(&mut self) -> Option<ActiveViewSession> {
        let session = self.session.take()?;
        log_debug!("discarded open session for {}", session.content_id);
        self.send(&session.content_id, Command::Pause).await;
        Some(session)
    }

    fn is_active(&self, item_id: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.content_id == item_id)
    }

    async fn close_and_pause(&mut self) -> Option<ClosedViewSession> {
        let closed = self.close_session().await?;
        self.send(&closed.content_id, Command::Pause).await;
        Some(closed)
    }

    /// Credits the open session's duration. Does not touch the handle.
    async fn close_session(&mut self) -> Option<ClosedViewSession> {
        let session = self.session.take()?;
        let closed = session.close(self.clock.now_ms());

        self.aggregator
            .record_duration(&closed.content_id, closed.duration_ms)
            .await;
        log_debug!("closed {} after {}ms", closed.content_id, closed.duration_ms);
        Some(closed)
    }

    /// Failures are logged and swallowed so the rest of the batch proceeds.
    async fn send(&self, item_id: &str, command: Command) {
        let handle = self.handles.get(item_id).and_then(Weak::upgrade);
        let result = match handle {
            None => Err(FeedError::HandleUnavailable {
                item_id: item_id.to_string(),
            }),
            Some(handle) => match command {
                Command::Play => handle.play().await,
                Command::Pause => handle.pause().await,
            },
        };

        if let Err(err) = result {
            log_warn!("{command:?} for {item_id} failed: {err}");
        }
    }
}
