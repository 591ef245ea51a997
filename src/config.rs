//! Runtime settings.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. An optional YAML file (`--config`, `PAPERBOY_CONFIG`)
//! 3. Command-line flags and their environment variables
//!
//! API keys are never read from the YAML file; see [`crate::providers`].

use crate::cli::Cli;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Everything the pipeline needs to know that isn't a secret.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Where processed articles, `index.json` and fallbacks are written.
    pub output_dir: String,
    /// Where raw extraction output is written.
    pub raw_dir: String,
    /// Parliament website root.
    pub hansard_base_url: String,
    /// Public site root used in the sitemap.
    pub site_base_url: String,
    pub sitemap_path: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    /// Headless browser `/content` endpoint; direct HTTP only when unset.
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,
    /// Provider used when the command line names none.
    pub default_provider: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// Path to the `awful_aj` `config.yaml`; the `awful_aj` config dir when unset.
    pub awful_config: Option<String>,
    /// Name of the `awful_aj` chat template carrying the system prompt.
    pub awful_template: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: "public/news".to_string(),
            raw_dir: "public/news/raw".to_string(),
            hansard_base_url: "https://www.parliament.nz".to_string(),
            site_base_url: "https://paperboy.nz".to_string(),
            sitemap_path: "public/sitemap.xml".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 30,
            browserless_url: None,
            browserless_token: None,
            default_provider: "google".to_string(),
            temperature: 0.3,
            max_output_tokens: 8192,
            awful_config: None,
            awful_template: "hansard_news".to_string(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("output_dir", &self.output_dir)
            .field("raw_dir", &self.raw_dir)
            .field("hansard_base_url", &self.hansard_base_url)
            .field("site_base_url", &self.site_base_url)
            .field("sitemap_path", &self.sitemap_path)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("browserless_url", &self.browserless_url)
            .field("browserless_token", &self.browserless_token.as_ref().map(|_| "<redacted>"))
            .field("default_provider", &self.default_provider)
            .field("temperature", &self.temperature)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("awful_config", &self.awful_config)
            .field("awful_template", &self.awful_template)
            .finish()
    }
}

impl Settings {
    /// Parse settings from YAML text. Missing keys keep their defaults.
    pub fn from_yaml(text: &str) -> Result<Self, Box<dyn Error>> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load the YAML file at `path`, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| format!("reading settings file {}: {e}", path.display()))?;
                let settings = Self::from_yaml(&text)?;
                info!(path = %path.display(), "Loaded settings file");
                Ok(settings)
            }
            None => Ok(Self::default()),
        }
    }

    /// Overlay command-line and environment values.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(dir) = &cli.output_dir {
            self.output_dir = dir.clone();
        }
        if let Some(dir) = &cli.raw_dir {
            self.raw_dir = dir.clone();
        }
        if let Some(url) = &cli.browserless_url {
            self.browserless_url = Some(url.clone());
        }
        if let Some(token) = &cli.browserless_token {
            self.browserless_token = Some(token.clone());
        }
        if let Some(provider) = &cli.default_provider {
            self.default_provider = provider.clone();
        }
        debug!(?self, "Effective settings");
        self
    }
}
