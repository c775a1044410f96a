use serde::{Deserialize, Serialize};

/// One video post as returned by `GET /posts`.
///
/// Immutable once fetched. A remount fetches a fresh list rather than
/// patching this one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub primary_uri: String,
    #[serde(default)]
    pub fallback_uri: Option<String>,
    #[serde(default)]
    pub original_uri: Option<String>,
    #[serde(default)]
    pub is_streaming: bool,

    // Presentation-only fields, carried through untouched.
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub like_count: u64,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, primary_uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_uri: primary_uri.into(),
            fallback_uri: None,
            original_uri: None,
            is_streaming: false,
            caption: String::new(),
            source: String::new(),
            like_count: 0,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }

    pub fn with_fallback(mut self, uri: impl Into<String>) -> Self {
        self.fallback_uri = Some(uri.into());
        self
    }

    pub fn with_original(mut self, uri: impl Into<String>) -> Self {
        self.original_uri = Some(uri.into());
        self
    }
}
