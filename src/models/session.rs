use serde::{Deserialize, Serialize};

/// The one item currently considered actively viewed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActiveViewSession {
    pub content_id: String,
    pub index: usize,
    pub started_at_ms: u64,
}

impl ActiveViewSession {
    pub fn open(content_id: impl Into<String>, index: usize, now_ms: u64) -> Self {
        Self {
            content_id: content_id.into(),
            index,
            started_at_ms: now_ms,
        }
    }

    /// Consumes the session. A clock that went backwards yields zero.
    pub fn close(self, now_ms: u64) -> ClosedViewSession {
        ClosedViewSession {
            duration_ms: now_ms.saturating_sub(self.started_at_ms),
            content_id: self.content_id,
            index: self.index,
            started_at_ms: self.started_at_ms,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClosedViewSession {
    pub content_id: String,
    pub index: usize,
    pub started_at_ms: u64,
    pub duration_ms: u64,
}
