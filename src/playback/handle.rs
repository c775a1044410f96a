use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, MutexGuard,
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{FeedError, FeedResult},
    models::CatalogItem,
    source::{SourceResolver, SourceState, SourceStatus},
};

use super::MediaPlayer;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Per-item play/pause/unload capability.
///
/// Returned when an item mounts. The list surface owns it; the visibility
/// scheduler only keeps a weak reference. All three operations are
/// idempotent, and once unmounting has begun `play`/`pause` are no-ops.
pub struct PlaybackHandle {
    item: CatalogItem,
    player: Box<dyn MediaPlayer>,
    resolver: SourceResolver,
    source: Mutex<SourceState>,
    status_tx: watch::Sender<SourceStatus>,
    /// Set by `play`, cleared by `pause`; honoured once the source is ready.
    wants_playing: AtomicBool,
    is_playing: AtomicBool,
    mounted: CancellationToken,
    released: AtomicBool,
}

impl PlaybackHandle {
    pub fn new(
        item: CatalogItem,
        player: Box<dyn MediaPlayer>,
        resolver: SourceResolver,
    ) -> Arc<Self> {
        let (status_tx, _) = watch::channel(SourceStatus::Loading);
        Arc::new(Self {
            source: Mutex::new(SourceState::new(item.id.clone())),
            item,
            player,
            resolver,
            status_tx,
            wants_playing: AtomicBool::new(false),
            is_playing: AtomicBool::new(false),
            mounted: CancellationToken::new(),
            released: AtomicBool::new(false),
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item.id
    }

    pub fn item(&self) -> &CatalogItem {
        &self.item
    }

    pub fn status(&self) -> SourceStatus {
        self.source().status
    }

    pub fn source_state(&self) -> SourceState {
        self.source().clone()
    }

    /// Status feed for a loading indicator or permanent-error overlay.
    pub fn subscribe_status(&self) -> watch::Receiver<SourceStatus> {
        self.status_tx.subscribe()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::SeqCst)
    }

    pub fn is_unmounting(&self) -> bool {
        self.mounted.is_cancelled()
    }

    /// Resolves a source and loads it into the player, walking the tier chain
    /// on failure. Resolves to the final status (`ready`) or an error once the
    /// chain is exhausted or the item unmounts mid-load.
    pub async fn load(&self) -> FeedResult<SourceStatus> {
        if self.is_unmounting() {
            return Err(self.unavailable());
        }

        let resolved = tokio::select! {
            biased;
            _ = self.mounted.cancelled() => return Err(self.unavailable()),
            state = self.resolver.resolve(&self.item) => state,
        };
        self.store(resolved);

        loop {
            let uri = {
                let state = self.source();
                if state.is_exhausted() {
                    None
                } else {
                    state.active_uri.clone()
                }
            };
            let Some(uri) = uri else {
                return Err(FeedError::SourceExhausted {
                    item_id: self.item.id.clone(),
                });
            };

            let outcome = tokio::select! {
                biased;
                _ = self.mounted.cancelled() => return Err(self.unavailable()),
                outcome = self.player.load(&uri) => outcome,
            };

            // A result that lands after unmount began belongs to a dead item.
            if self.is_unmounting() {
                return Err(self.unavailable());
            }

            match outcome {
                Ok(()) => {
                    {
                        let mut state = self.source();
                        self.resolver.mark_ready(&mut state);
                        self.status_tx.send_replace(state.status);
                    }
                    log_debug!("item {} ready on {}", self.item.id, uri);
                    if self.wants_playing.load(Ordering::SeqCst) {
                        if let Err(err) = self.start_player().await {
                            log_warn!("deferred play failed for item {}: {err}", self.item.id);
                        }
                    }
                    return Ok(SourceStatus::Ready);
                }
                Err(err) => {
                    let transient = FeedError::TransientLoad {
                        item_id: self.item.id.clone(),
                        uri,
                        reason: format!("{err:#}"),
                    };
                    log_warn!("{transient}");

                    let current = self.source_state();
                    let next = tokio::select! {
                        biased;
                        _ = self.mounted.cancelled() => return Err(self.unavailable()),
                        next = self.resolver.on_load_error(&self.item, current) => next,
                    };
                    self.store(next);
                }
            }
        }
    }

    pub async fn play(&self) -> FeedResult<()> {
        if self.is_unmounting() {
            log_debug!("play ignored for unmounting item {}", self.item.id);
            return Ok(());
        }

        self.wants_playing.store(true, Ordering::SeqCst);

        let playable = {
            let state = self.source();
            if state.is_exhausted() {
                return Err(FeedError::SourceExhausted {
                    item_id: self.item.id.clone(),
                });
            }
            state.is_playable()
        };
        if !playable {
            // Picked up by `load` once a tier succeeds.
            return Ok(());
        }

        self.start_player().await
    }

    pub async fn pause(&self) -> FeedResult<()> {
        if self.is_unmounting() {
            log_debug!("pause ignored for unmounting item {}", self.item.id);
            return Ok(());
        }

        self.wants_playing.store(false, Ordering::SeqCst);
        if !self.is_playing.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(err) = self.player.pause().await {
            self.is_playing.store(true, Ordering::SeqCst);
            return Err(FeedError::Player(format!("{err:#}")));
        }
        Ok(())
    }

    /// Releases the media resource. Marks the item as unmounting first, so a
    /// probe or load still in flight is abandoned and its result discarded.
    pub async fn unload(&self) -> FeedResult<()> {
        self.mounted.cancel();
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.wants_playing.store(false, Ordering::SeqCst);
        self.is_playing.store(false, Ordering::SeqCst);
        {
            let mut state = self.source();
            state.reset();
            self.status_tx.send_replace(state.status);
        }

        self.player
            .release()
            .await
            .map_err(|err| FeedError::Player(format!("{err:#}")))
    }

    /// Player-reported buffering. Only moves between `ready` and `buffering`.
    pub fn on_buffering(&self, buffering: bool) {
        let mut state = self.source();
        match (buffering, state.status) {
            (true, SourceStatus::Ready) => state.set_status(SourceStatus::Buffering),
            (false, SourceStatus::Buffering) => state.set_status(SourceStatus::Ready),
            _ => return,
        }
        self.status_tx.send_replace(state.status);
    }

    async fn start_player(&self) -> FeedResult<()> {
        if self.is_playing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(err) = self.player.play().await {
            self.is_playing.store(false, Ordering::SeqCst);
            return Err(FeedError::Player(format!("{err:#}")));
        }
        Ok(())
    }

    fn store(&self, next: SourceState) {
        let mut state = self.source();
        *state = next;
        self.status_tx.send_replace(state.status);
    }

    fn source(&self) -> MutexGuard<'_, SourceState> {
        match self.source.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn unavailable(&self) -> FeedError {
        FeedError::HandleUnavailable {
            item_id: self.item.id.clone(),
        }
    }
}
