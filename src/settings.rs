use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf, time::Duration};

pub const ENV_CONFIG_PATH: &str = "REELFEED_CONFIG";
pub const ENV_API_BASE: &str = "REELFEED_API_BASE";
pub const DEFAULT_CONFIG_PATH: &str = "reelfeed.json";

/// How many off-screen items the list surface may keep mounted or loading.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RenderWindowConfig {
    pub window_size: usize,
    pub initial: usize,
    pub per_batch: usize,
}

impl Default for RenderWindowConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            initial: 1,
            per_batch: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    pub api_base_url: String,
    /// Streaming endpoint probed per item; `{id}` is replaced with the item id.
    pub stream_endpoint: String,
    pub viewability_threshold: f32,
    pub survey_every: u64,
    pub analytics_enabled: bool,
    pub http_timeout_ms: u64,
    pub render_window: RenderWindowConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".into(),
            stream_endpoint: "http://localhost:3000/stream/{id}/playlist.m3u8".into(),
            viewability_threshold: 0.5,
            survey_every: 5,
            analytics_enabled: true,
            http_timeout_ms: 5_000,
            render_window: RenderWindowConfig::default(),
        }
    }
}

impl FeedConfig {
    /// Reads the config file if it exists, falling back to defaults for a
    /// missing file. A present but malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read feed config from {}", path.display()))?;
        let config: FeedConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse feed config {}", path.display()))?;
        Ok(config.normalized())
    }

    /// Resolves the config path from `REELFEED_CONFIG`, then applies
    /// `REELFEED_API_BASE` on top of whatever was loaded.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = Self::load(&path)?;
        if let Ok(base) = std::env::var(ENV_API_BASE) {
            if !base.trim().is_empty() {
                config.api_base_url = base.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn normalized(mut self) -> Self {
        self.viewability_threshold = self.viewability_threshold.clamp(0.0, 1.0);
        if self.survey_every == 0 {
            self.survey_every = FeedConfig::default().survey_every;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FeedConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, FeedConfig::default());
        assert_eq!(config.render_window.window_size, 4);
    }

    #[test]
    fn partial_file_overrides_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"viewabilityThreshold": 1.7, "surveyEvery": 0, "apiBaseUrl": "https://api.example/"}}"#
        )
        .unwrap();

        let config = FeedConfig::load(file.path()).unwrap();
        assert_eq!(config.viewability_threshold, 1.0);
        assert_eq!(config.survey_every, 5);
        assert_eq!(config.endpoint("/posts"), "https://api.example/posts");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(FeedConfig::load(file.path()).is_err());
    }
}
