// ABOUTME: Configuration module for the deckfold application
// ABOUTME: Provides generator settings and environment variable handling

use std::env;

/// Global configuration for the site generator. Distinct from the
/// per-document `DocumentConfig` parsed out of each markdown file.
pub struct Config {
    pub site_title: String,
    pub default_css: String,
    pub default_js: String,
    pub embed_resources: bool,
    pub fetch_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_title: "Presentations".to_string(),
            default_css: "https://harperreed.github.io/deckfold/deckfold.css".to_string(),
            default_js: "https://harperreed.github.io/deckfold/deckfold.js".to_string(),
            embed_resources: true,
            fetch_timeout_ms: 10000,
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let site_title = env::var("DECKFOLD_SITE_TITLE").unwrap_or(defaults.site_title);
        let default_css = env::var("DECKFOLD_CSS").unwrap_or(defaults.default_css);
        let default_js = env::var("DECKFOLD_JS").unwrap_or(defaults.default_js);
        let embed_resources = env::var("DECKFOLD_EMBED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);
        let fetch_timeout_ms = env::var("DECKFOLD_FETCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.fetch_timeout_ms);

        Self {
            site_title,
            default_css,
            default_js,
            embed_resources,
            fetch_timeout_ms,
        }
    }
}
