use thiserror::Error;

/// Failure taxonomy for the feed core.
///
/// None of these are fatal: each one degrades to a tier advance, the bundled
/// catalog, or a dropped analytics request.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("all sources exhausted for item {item_id}")]
    SourceExhausted { item_id: String },

    #[error("load failed for item {item_id} at {uri}: {reason}")]
    TransientLoad {
        item_id: String,
        uri: String,
        reason: String,
    },

    #[error("catalog unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("analytics sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("playback handle for item {item_id} is unavailable")]
    HandleUnavailable { item_id: String },

    #[error("media player error: {0}")]
    Player(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
