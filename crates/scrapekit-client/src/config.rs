//! Configuration for the HTTP backend client.
//!
//! Supports reading settings from `~/.config/scrapekit/config.json`, with
//! environment-variable overrides for one-off runs.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for [`HttpBackend`](crate::HttpBackend).
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the scraping backend
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Whether locators entered by the user are XPath expressions.
    /// Sent verbatim as the `is_xpath` flag of scrape and template payloads.
    #[serde(default = "default_use_xpath")]
    pub use_xpath: bool,

    /// Per-request timeout in seconds. A hung backend surfaces as a
    /// network error instead of leaving the UI submitting forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            use_xpath: default_use_xpath(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    /// Loads configuration from the config file and environment.
    ///
    /// Priority:
    /// 1. `SCRAPEKIT_BASE_URL` / `SCRAPEKIT_USE_XPATH` environment variables
    /// 2. `~/.config/scrapekit/config.json`
    /// 3. Built-in defaults (localhost backend, XPath locators, 30s timeout)
    ///
    /// A missing or unreadable config file falls back to defaults rather
    /// than failing; the client can always be constructed.
    pub fn load() -> Self {
        let mut config = load_config_file().unwrap_or_default();

        if let Ok(base_url) = env::var("SCRAPEKIT_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(use_xpath) = env::var("SCRAPEKIT_USE_XPATH") {
            config.use_xpath = use_xpath != "0" && !use_xpath.eq_ignore_ascii_case("false");
        }

        config
    }

    /// Returns the request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn load_config_file() -> Option<BackendConfig> {
    let path = config_path()?;
    let content = fs::read_to_string(&path).ok()?;

    match serde_json::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(
                "ignoring malformed config file at {}: {}",
                path.display(),
                err
            );
            None
        }
    }
}

/// Returns the path to the configuration file: ~/.config/scrapekit/config.json
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("scrapekit").join("config.json"))
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_use_xpath() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
