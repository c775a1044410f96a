mod utils;

pub mod analytics;
pub mod catalog;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod playback;
pub mod settings;
pub mod source;
pub mod surface;

pub use error::{FeedError, FeedResult};
pub use feed::{AppLifecycle, FeedController};
pub use utils::{Clock, ManualClock, SystemClock};

use anyhow::{Context, Result};

const ENABLE_LOGS: bool = true;

use catalog::CatalogClient;
use feed::RenderWindow;
use settings::FeedConfig;
use surface::HeadlessSurface;

/// Runs the feed headless: fetches the catalog, then drives a
/// [`FeedController`] from JSON-line surface events on stdin until EOF.
/// Final metrics are printed to stdout.
pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log_info!("reelfeed starting up...");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(async {
        let config = FeedConfig::from_env()?;
        let items = CatalogClient::from_config(&config)?.load().await;
        let controller = FeedController::from_config(&config)?;

        let mut survey = controller.subscribe_to_survey().await;
        tokio::spawn(async move {
            while let Some(trigger) = survey.recv().await {
                log_info!("survey due: {trigger:?}");
            }
        });

        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .context("failed to build player http client")?;
        let mut surface = HeadlessSurface::start(
            controller.clone(),
            items,
            RenderWindow::new(config.render_window),
            client,
        )
        .await;

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        surface.drive(stdin, tokio::io::stdout()).await?;
        surface.shutdown().await;

        let snapshot = controller.snapshot().await;
        println!("{}", serde_json::to_string(&snapshot)?);
        Ok::<(), anyhow::Error>(())
    })
}
