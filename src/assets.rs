// ABOUTME: Theme asset handling for the deckfold application
// ABOUTME: Handles local and remote CSS and JavaScript resources for pages

use crate::errors::{DeckError, Result};
use log::info;
use reqwest::blocking::Client;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Css,
    Js,
}

/// A theme asset that can be either local or remote.
#[derive(Debug, Clone)]
pub struct ThemeAsset {
    pub path: String,
    pub kind: AssetKind,
    pub is_remote: bool,
}

impl ThemeAsset {
    /// Create a theme asset from a path string, which can be a local
    /// file path or an http(s) URL.
    pub fn new(path: &str, kind: AssetKind) -> Self {
        let is_remote = path.starts_with("http://") || path.starts_with("https://");
        Self {
            path: path.to_string(),
            kind,
            is_remote,
        }
    }

    pub fn css(path: &str) -> Self {
        Self::new(path, AssetKind::Css)
    }

    pub fn js(path: &str) -> Self {
        Self::new(path, AssetKind::Js)
    }

    /// Get the content of the asset, fetching remote files over HTTP.
    pub fn content(&self, timeout_ms: u64) -> Result<String> {
        if self.is_remote {
            self.fetch_remote_content(timeout_ms)
        } else {
            self.read_local_content()
        }
    }

    /// Fetch content from a remote URL with bounded retry.
    fn fetch_remote_content(&self, timeout_ms: u64) -> Result<String> {
        info!("Fetching remote asset: {}", self.path);

        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(DeckError::FetchError)?;

        // Try up to 3 times with increasing backoff
        let mut retry_delay = 1000;
        let mut last_error = None;

        for attempt in 1..=3 {
            match client.get(&self.path).send() {
                Ok(response) => {
                    if response.status().is_success() {
                        return response.text().map_err(DeckError::FetchError);
                    }
                    let status = response.status();
                    last_error =
                        Some(DeckError::ValidationError(format!("HTTP error: {}", status)));
                }
                Err(e) => {
                    last_error = Some(DeckError::FetchError(e));
                }
            }

            info!(
                "Fetch attempt {} failed, retrying in {} ms",
                attempt, retry_delay
            );
            std::thread::sleep(Duration::from_millis(retry_delay));
            retry_delay *= 2;
        }

        Err(last_error.unwrap_or_else(|| {
            DeckError::ValidationError("Unknown error fetching asset".to_string())
        }))
    }

    fn read_local_content(&self) -> Result<String> {
        info!("Reading local asset: {}", self.path);
        if !Path::new(&self.path).exists() {
            return Err(DeckError::PathNotFoundError(
                Path::new(&self.path).to_path_buf(),
            ));
        }
        fs::read_to_string(&self.path).map_err(DeckError::FileReadError)
    }

    /// HTML tag for the asset, embedding content for local files when
    /// requested, linking otherwise.
    pub fn tag(&self, embed: bool, timeout_ms: u64) -> Result<String> {
        if self.is_remote || !embed {
            Ok(match self.kind {
                AssetKind::Css => format!(r#"<link rel="stylesheet" href="{}">"#, self.path),
                AssetKind::Js => format!(r#"<script src="{}"></script>"#, self.path),
            })
        } else {
            let content = self.content(timeout_ms)?;
            Ok(match self.kind {
                AssetKind::Css => format!("<style>{}</style>", content),
                AssetKind::Js => format!("<script>{}</script>", content),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_remote_detection() {
        assert!(ThemeAsset::css("https://example.com/style.css").is_remote);
        assert!(ThemeAsset::js("http://example.com/x.js").is_remote);
        assert!(!ThemeAsset::css("local/style.css").is_remote);
    }

    #[test]
    fn test_remote_tags_link() {
        let css = ThemeAsset::css("https://example.com/style.css");
        assert_eq!(
            css.tag(true, 1000).unwrap(),
            r#"<link rel="stylesheet" href="https://example.com/style.css">"#
        );
        let js = ThemeAsset::js("https://example.com/app.js");
        assert_eq!(
            js.tag(true, 1000).unwrap(),
            r#"<script src="https://example.com/app.js"></script>"#
        );
    }

    #[test]
    fn test_local_embed() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"body { color: red; }").expect("write");
        let css = ThemeAsset::css(file.path().to_str().unwrap());
        let tag = css.tag(true, 1000).expect("tag");
        assert_eq!(tag, "<style>body { color: red; }</style>");
    }

    #[test]
    fn test_local_link_mode() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"// js").expect("write");
        let js = ThemeAsset::js(file.path().to_str().unwrap());
        let tag = js.tag(false, 1000).expect("tag");
        assert!(tag.starts_with("<script src="));
    }

    #[test]
    fn test_missing_local_asset_errors() {
        let css = ThemeAsset::css("/definitely/not/here.css");
        assert!(css.content(1000).is_err());
    }
}
