use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_PAGE_SIZE: u32 = 100;
pub const DEFAULT_ENRICH_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .gitales.toml.
///
/// All fields are optional; the dashboard works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Pull request enrichment settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// The locally signed-in member
    #[serde(default)]
    pub profile: ProfileConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    /// REST base URL; the GraphQL endpoint lives at `{api_base}/graphql`.
    pub api_base: Option<String>,
    /// Per-request timeout. Unset means requests may hang indefinitely.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_enrich_limit")]
    pub enrich_limit: usize,
    /// Cap on in-flight detail requests. None fires every request at once.
    pub concurrency: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            enrich_limit: DEFAULT_ENRICH_LIMIT,
            concurrency: None,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_enrich_limit() -> usize {
    DEFAULT_ENRICH_LIMIT
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileConfig {
    pub name: Option<String>,
    pub github_username: Option<String>,
    pub batch: Option<String>,
}

impl Config {
    /// Load configuration from .gitales.toml in the current directory.
    /// Returns default config if the file doesn't exist, then fills the
    /// token from GITHUB_TOKEN when the file has none.
    pub fn load() -> Result<Config, ConfigError> {
        let path = Path::new(".gitales.toml");
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            Config::default()
        };

        if config.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                config.github.token = Some(token);
            }
        }

        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Resolve the GitHub token: config file value takes precedence,
    /// falls back to GITHUB_TOKEN env var. Empty values count as absent.
    pub fn github_token(&self) -> Option<String> {
        self.github
            .token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
            .filter(|token| !token.trim().is_empty())
    }

    pub fn api_base(&self) -> &str {
        self.github
            .api_base
            .as_deref()
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.github.timeout_secs.map(Duration::from_secs)
    }
}
