use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One candidate in the ordered fallback chain.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "camelCase")]
pub enum UriTier {
    /// A streaming URI already known to be good (probe cache or declared stream).
    Primary,
    /// The per-item streaming endpoint, checked with `HEAD` before use.
    Probed,
    Fallback,
    Original,
}

impl UriTier {
    pub const ORDER: [UriTier; 4] = [
        UriTier::Primary,
        UriTier::Probed,
        UriTier::Fallback,
        UriTier::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UriTier::Primary => "primary",
            UriTier::Probed => "probed",
            UriTier::Fallback => "fallback",
            UriTier::Original => "original",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourceStatus {
    Loading,
    Ready,
    Buffering,
    Error,
    Exhausted,
}

impl Default for SourceStatus {
    fn default() -> Self {
        SourceStatus::Loading
    }
}

/// Per-item source bookkeeping, owned by the item's playback handle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceState {
    pub item_id: String,
    pub active_uri: Option<String>,
    pub active_tier: Option<UriTier>,
    pub attempted: BTreeSet<UriTier>,
    pub status: SourceStatus,
    /// Every distinct status the state has passed through, oldest first.
    history: Vec<SourceStatus>,
    #[serde(skip)]
    tried_uris: Vec<String>,
}

impl SourceState {
    pub fn new(item_id: impl Into<String>) -> Self {
        Self {
            item_id: item_id.into(),
            active_uri: None,
            active_tier: None,
            attempted: BTreeSet::new(),
            status: SourceStatus::Loading,
            history: vec![SourceStatus::Loading],
            tried_uris: Vec::new(),
        }
    }

    pub fn set_status(&mut self, status: SourceStatus) {
        if self.status != status {
            self.status = status;
            self.history.push(status);
        }
    }

    pub fn history(&self) -> &[SourceStatus] {
        &self.history
    }

    pub fn is_exhausted(&self) -> bool {
        self.status == SourceStatus::Exhausted
    }

    pub fn is_playable(&self) -> bool {
        matches!(self.status, SourceStatus::Ready | SourceStatus::Buffering)
    }

    pub(crate) fn has_tried(&self, uri: &str) -> bool {
        self.tried_uris.iter().any(|tried| tried == uri)
    }

    pub(crate) fn begin_attempt(&mut self, tier: UriTier, uri: &str) {
        self.attempted.insert(tier);
        self.tried_uris.push(uri.to_string());
        self.set_status(SourceStatus::Loading);
    }

    pub(crate) fn activate(&mut self, tier: UriTier, uri: String) {
        self.active_tier = Some(tier);
        self.active_uri = Some(uri);
    }

    pub(crate) fn exhaust(&mut self) {
        self.active_tier = None;
        self.active_uri = None;
        self.set_status(SourceStatus::Exhausted);
    }

    /// Back to a fresh `loading` state, as after the media resource is released.
    pub fn reset(&mut self) {
        self.active_uri = None;
        self.active_tier = None;
        self.attempted.clear();
        self.tried_uris.clear();
        self.set_status(SourceStatus::Loading);
    }
}
