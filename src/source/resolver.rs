use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::Result;

use crate::{models::CatalogItem, settings::FeedConfig};

use super::{
    probe::{HttpStreamProbe, StreamProbe},
    state::{SourceState, SourceStatus, UriTier},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Walks an item's candidate URIs in tier order, each tier at most once.
///
/// Clones share the probe cache, so a stream found good for an item is reused
/// on remount within the same feed session without re-probing.
#[derive(Clone)]
pub struct SourceResolver {
    probe: Arc<dyn StreamProbe>,
    stream_endpoint: String,
    known_good: Arc<Mutex<HashMap<String, String>>>,
}

impl SourceResolver {
    pub fn new(probe: Arc<dyn StreamProbe>, stream_endpoint: impl Into<String>) -> Self {
        Self {
            probe,
            stream_endpoint: stream_endpoint.into(),
            known_good: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let probe = HttpStreamProbe::new(config.http_timeout())?;
        Ok(Self::new(Arc::new(probe), config.stream_endpoint.clone()))
    }

    /// Candidate URI for `tier`, or `None` when the item has nothing there.
    pub fn candidate(&self, item: &CatalogItem, tier: UriTier) -> Option<String> {
        match tier {
            UriTier::Primary => self
                .known_good_for(&item.id)
                .or_else(|| item.is_streaming.then(|| item.primary_uri.clone())),
            UriTier::Probed => {
                if self.stream_endpoint.is_empty() {
                    None
                } else {
                    Some(self.stream_endpoint.replace("{id}", &item.id))
                }
            }
            UriTier::Fallback => item.fallback_uri.clone(),
            UriTier::Original => item
                .original_uri
                .clone()
                .or_else(|| (!item.is_streaming).then(|| item.primary_uri.clone())),
        }
    }

    /// Initial state for a freshly rendered item.
    pub async fn resolve(&self, item: &CatalogItem) -> SourceState {
        self.advance(item, SourceState::new(item.id.clone())).await
    }

    /// Called after the active URI failed to load. Advances to the next
    /// untried tier or settles on `exhausted`.
    pub async fn on_load_error(&self, item: &CatalogItem, mut state: SourceState) -> SourceState {
        if state.is_exhausted() {
            return state;
        }

        if let (Some(tier), Some(uri)) = (state.active_tier, state.active_uri.as_deref()) {
            log_warn!(
                "source {} failed for item {} ({}), advancing",
                tier.as_str(),
                item.id,
                uri
            );
            if matches!(tier, UriTier::Primary | UriTier::Probed) {
                self.forget(&item.id, uri);
            }
        }

        state.set_status(SourceStatus::Error);
        self.advance(item, state).await
    }

    /// Records a successful load of the active URI.
    pub fn mark_ready(&self, state: &mut SourceState) {
        if let (Some(UriTier::Primary | UriTier::Probed), Some(uri)) =
            (state.active_tier, state.active_uri.as_ref())
        {
            self.remember(&state.item_id, uri.clone());
        }
        state.set_status(SourceStatus::Ready);
    }

    pub fn known_good_for(&self, item_id: &str) -> Option<String> {
        self.cache().get(item_id).cloned()
    }

    async fn advance(&self, item: &CatalogItem, mut state: SourceState) -> SourceState {
        for tier in UriTier::ORDER {
            if state.attempted.contains(&tier) {
                continue;
            }
            let Some(uri) = self.candidate(item, tier) else {
                continue;
            };
            if state.has_tried(&uri) {
                continue;
            }

            state.begin_attempt(tier, &uri);

            if tier == UriTier::Probed {
                if let Err(err) = self.probe.probe(&uri).await {
                    log_warn!("stream probe failed for item {}: {err:#}", item.id);
                    state.set_status(SourceStatus::Error);
                    continue;
                }
                log_debug!("stream probe ok for item {} at {}", item.id, uri);
                self.remember(&item.id, uri.clone());
            }

            state.activate(tier, uri);
            return state;
        }

        log_info!(
            "all sources exhausted for item {} after {:?}",
            item.id,
            state.attempted
        );
        state.exhaust();
        state
    }

    fn remember(&self, item_id: &str, uri: String) {
        self.cache().insert(item_id.to_string(), uri);
    }

    fn forget(&self, item_id: &str, uri: &str) {
        let mut cache = self.cache();
        if cache.get(item_id).map(String::as_str) == Some(uri) {
            cache.remove(item_id);
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.known_good.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProbe {
        ok: bool,
        calls: AtomicUsize,
    }

    impl FixedProbe {
        fn new(ok: bool) -> Arc<Self> {
            Arc::new(Self {
                ok,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StreamProbe for FixedProbe {
        async fn probe(&self, uri: &str) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.ok {
                Ok(())
            } else {
                Err(anyhow::anyhow!("404 for {uri}"))
            }
        }
    }

    fn item() -> CatalogItem {
        CatalogItem::new("z", "https://cdn.example/z.mp4")
            .with_fallback("https://cdn.example/z-fallback.mp4")
            .with_original("https://cdn.example/z-original.mov")
    }

    #[tokio::test]
    async fn failed_probe_advances_to_fallback() {
        let resolver = SourceResolver::new(FixedProbe::new(false), "https://stream.example/{id}");
        let state = resolver.resolve(&item()).await;

        assert_eq!(state.active_tier, Some(UriTier::Fallback));
        assert_eq!(state.status, SourceStatus::Loading);
        assert_eq!(
            state.attempted.iter().copied().collect::<Vec<_>>(),
            vec![UriTier::Probed, UriTier::Fallback]
        );
        assert_eq!(
            state.history(),
            &[SourceStatus::Loading, SourceStatus::Error, SourceStatus::Loading]
        );
    }

    #[tokio::test]
    async fn every_tier_failing_ends_exhausted_in_order() {
        let resolver = SourceResolver::new(FixedProbe::new(true), "https://stream.example/{id}");
        let item = item();

        let mut seen = Vec::new();
        let mut state = resolver.resolve(&item).await;
        while let Some(tier) = state.active_tier {
            seen.push(tier);
            state = resolver.on_load_error(&item, state).await;
        }

        assert_eq!(
            seen,
            vec![UriTier::Probed, UriTier::Fallback, UriTier::Original]
        );
        assert!(state.is_exhausted());

        // Exhausted is terminal.
        let again = resolver.on_load_error(&item, state).await;
        assert!(again.is_exhausted());
        assert_eq!(again.attempted.len(), 3);
    }

    #[tokio::test]
    async fn successful_probe_is_reused_without_reprobing() {
        let probe = FixedProbe::new(true);
        let resolver = SourceResolver::new(probe.clone(), "https://stream.example/{id}");
        let item = item();

        let mut first = resolver.resolve(&item).await;
        resolver.mark_ready(&mut first);
        assert_eq!(first.active_tier, Some(UriTier::Probed));

        let second = resolver.clone().resolve(&item).await;
        assert_eq!(second.active_tier, Some(UriTier::Primary));
        assert_eq!(
            second.active_uri.as_deref(),
            Some("https://stream.example/z")
        );
        assert_eq!(probe.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn declared_stream_is_used_first_and_not_reused_as_original() {
        let resolver = SourceResolver::new(FixedProbe::new(false), "");
        let item = CatalogItem::new("s", "https://cdn.example/s.m3u8").streaming();

        let state = resolver.resolve(&item).await;
        assert_eq!(state.active_tier, Some(UriTier::Primary));

        let state = resolver.on_load_error(&item, state).await;
        assert!(state.is_exhausted());
        assert_eq!(
            state.attempted.iter().copied().collect::<Vec<_>>(),
            vec![UriTier::Primary]
        );
    }
}
