//! Configuration loader and validator for the site build.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_REMOTE_URL: &str = "http://localhost:54321";
pub const DEFAULT_ANON_KEY: &str = "mock-key-for-testing";
pub const DEFAULT_BASE_URL: &str = "https://your-school-domain.com";

const ENV_REMOTE_URL: &str = "SUPABASE_URL";
const ENV_ANON_KEY: &str = "SUPABASE_ANON_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub remote: Remote,
    pub site: Site,
    pub cache: Cache,
}

/// Hosted store endpoint and its anonymous access key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Remote {
    pub url: String,
    pub anon_key: String,
}

impl Default for Remote {
    fn default() -> Self {
        Self {
            url: DEFAULT_REMOTE_URL.to_string(),
            anon_key: DEFAULT_ANON_KEY.to_string(),
        }
    }
}

/// Public site settings used for the sitemap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Site {
    pub base_url: String,
    pub output_dir: String,
    /// Hand-written pages; `""` is the home page.
    pub static_pages: Vec<String>,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            output_dir: "./dist".to_string(),
            static_pages: [
                "",
                "/about",
                "/academic-programs",
                "/academic-year",
                "/campus-facilities",
                "/news",
                "/contact",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Time-to-live of the on-demand query cache, per query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Cache {
    pub featured_news_ttl_ms: u64,
    pub upcoming_events_ttl_ms: u64,
    pub categories_ttl_ms: u64,
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            featured_news_ttl_ms: 300_000,
            upcoming_events_ttl_ms: 600_000,
            categories_ttl_ms: 3_600_000,
        }
    }
}

impl Cache {
    pub fn featured_news_ttl(&self) -> Duration {
        Duration::from_millis(self.featured_news_ttl_ms)
    }

    pub fn upcoming_events_ttl(&self) -> Duration {
        Duration::from_millis(self.upcoming_events_ttl_ms)
    }

    pub fn categories_ttl(&self) -> Duration {
        Duration::from_millis(self.categories_ttl_ms)
    }
}

impl Config {
    /// Override the remote endpoint from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REMOTE_URL).filter(|v| !v.trim().is_empty()) {
            self.remote.url = url;
        }
        if let Some(key) = lookup(ENV_ANON_KEY).filter(|v| !v.trim().is_empty()) {
            self.remote.anon_key = key;
        }
    }
}

/// Load configuration and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
/// - A missing file is not an error; built-in local-development defaults apply.
/// - `SUPABASE_URL` / `SUPABASE_ANON_KEY` override the file.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let mut cfg = if path.exists() {
        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content)?
    } else {
        debug!(path = %path.display(), "config file not found; using defaults");
        Config::default()
    };
    cfg.apply_overrides(|name| std::env::var(name).ok());
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.remote.url.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.url must be non-empty"));
    }
    if Url::parse(&cfg.remote.url).is_err() {
        return Err(ConfigError::Invalid("remote.url must be an absolute URL"));
    }
    if cfg.remote.anon_key.trim().is_empty() {
        return Err(ConfigError::Invalid("remote.anon_key must be non-empty"));
    }

    if cfg.site.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("site.base_url must be non-empty"));
    }
    if Url::parse(&cfg.site.base_url).is_err() {
        return Err(ConfigError::Invalid("site.base_url must be an absolute URL"));
    }
    if cfg.site.output_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("site.output_dir must be non-empty"));
    }
    if cfg
        .site
        .static_pages
        .iter()
        .any(|p| !p.is_empty() && !p.starts_with('/'))
    {
        return Err(ConfigError::Invalid(
            "site.static_pages entries must be empty or start with '/'",
        ));
    }

    if cfg.cache.featured_news_ttl_ms == 0
        || cfg.cache.upcoming_events_ttl_ms == 0
        || cfg.cache.categories_ttl_ms == 0
    {
        return Err(ConfigError::Invalid("cache ttl values must be > 0"));
    }

    Ok(())
}

/// Example configuration with every key spelled out.
pub fn example() -> &'static str {
    r#"remote:
  url: "http://localhost:54321"
  anon_key: "YOUR_SUPABASE_ANON_KEY"

site:
  base_url: "https://your-school-domain.com"
  output_dir: "./dist"
  static_pages:
    - ""
    - "/about"
    - "/academic-programs"
    - "/academic-year"
    - "/campus-facilities"
    - "/news"
    - "/contact"

cache:
  featured_news_ttl_ms: 300000
  upcoming_events_ttl_ms: 600000
  categories_ttl_ms: 3600000
"#
}
