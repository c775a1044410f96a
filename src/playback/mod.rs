pub mod handle;
pub mod headless;

pub use handle::PlaybackHandle;
pub use headless::HeadlessPlayer;

use anyhow::Result;
use async_trait::async_trait;

/// The external media-player capability wrapped by a [`PlaybackHandle`].
///
/// Decoding and rendering live behind this trait. Every call may fail; the
/// handle converts failures into source-tier advances or logged no-ops.
#[async_trait]
pub trait MediaPlayer: Send + Sync {
    async fn load(&self, uri: &str) -> Result<()>;
    async fn play(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn release(&self) -> Result<()>;
}
