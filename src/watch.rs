// ABOUTME: Watch module for monitoring source changes and rebuilding the site
// ABOUTME: Provides debounced file watching and an optional preview server

use log::{debug, error, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;
use tiny_http::{Header, Response, Server, StatusCode};

use crate::config::Config as AppConfig;
use crate::errors::{DeckError, Result};
use crate::site::{build_site, BuildOptions};
use crate::utils;

/// Configuration for watch mode
pub struct WatchConfig {
    /// Site build to rerun on every relevant change.
    pub build: BuildOptions,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,

    /// Whether to serve the output using a local web server
    pub serve: bool,

    /// Port for local web server
    pub port: u16,
}

/// Start a simple HTTP server over the output directory.
fn start_server(output_dir: PathBuf, port: u16) -> Result<()> {
    let server = Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| DeckError::WatchError(format!("Failed to start HTTP server: {}", e)))?;

    let server_arc = Arc::new(server);
    let server_thread = server_arc.clone();

    thread::spawn(move || {
        info!("Preview server listening on http://localhost:{}", port);
        println!("Preview server listening on http://localhost:{}", port);

        for request in server_thread.incoming_requests() {
            let url_path = request.url().trim_start_matches('/');

            // Directory-style URLs resolve to their index page.
            let mut file_path = if url_path.is_empty() {
                output_dir.join("index.html")
            } else {
                output_dir.join(url_path)
            };
            if file_path.is_dir() {
                file_path = file_path.join("index.html");
            }

            debug!("Request for {:?} -> {:?}", request.url(), file_path);

            if file_path.exists() && file_path.is_file() {
                match fs::read(&file_path) {
                    Ok(content) => {
                        let content_type = match file_path.extension() {
                            Some(ext) if ext.to_string_lossy() == "html" => "text/html",
                            Some(ext) if ext.to_string_lossy() == "css" => "text/css",
                            Some(ext) if ext.to_string_lossy() == "js" => "application/javascript",
                            Some(ext) if ext.to_string_lossy() == "png" => "image/png",
                            Some(ext)
                                if ext.to_string_lossy() == "jpg"
                                    || ext.to_string_lossy() == "jpeg" =>
                            {
                                "image/jpeg"
                            }
                            Some(ext) if ext.to_string_lossy() == "svg" => "image/svg+xml",
                            _ => "application/octet-stream",
                        };

                        let header = match Header::from_bytes("Content-Type", content_type) {
                            Ok(header) => header,
                            Err(_) => continue,
                        };
                        let response = Response::from_data(content).with_header(header);
                        if let Err(e) = request.respond(response) {
                            error!("Failed to send response: {}", e);
                        }
                    }
                    Err(e) => {
                        error!("Failed to read file {:?}: {}", file_path, e);
                        let response = Response::from_string(format!("Failed to read file: {}", e))
                            .with_status_code(StatusCode(500));
                        let _ = request.respond(response);
                    }
                }
            } else {
                let response =
                    Response::from_string("404 Not Found").with_status_code(StatusCode(404));
                let _ = request.respond(response);
            }
        }
    });

    Ok(())
}

/// Watch the source directory and rebuild the site on changes.
pub fn watch_site(config: WatchConfig, app_config: &AppConfig) -> Result<()> {
    utils::validate_directory_exists(&config.build.source_dir)?;
    utils::ensure_directory_exists(&config.build.output_dir)?;

    // Initial build
    match build_site(&config.build, app_config) {
        Ok(report) => info!(
            "Initial build: {} built, {} failed",
            report.built.len(),
            report.failed.len()
        ),
        Err(e) => error!("Initial build failed: {}", e),
    }

    if config.serve {
        start_server(config.build.output_dir.clone(), config.port)?;
    }

    let (tx, rx) = mpsc::channel();

    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), None, tx)
        .map_err(|e| DeckError::WatchError(format!("Failed to create file watcher: {}", e)))?;

    let watch_path = if config.build.source_dir.is_absolute() {
        config.build.source_dir.clone()
    } else {
        utils::get_absolute_path(&config.build.source_dir)?
    };

    debouncer
        .watcher()
        .watch(&watch_path, RecursiveMode::Recursive)
        .map_err(|e| {
            DeckError::WatchError(format!(
                "Failed to start watching directory {:?}: {}",
                watch_path, e
            ))
        })?;

    info!("Watching for changes in {:?}", watch_path);
    println!(
        "Watching for changes in {:?} (Press Ctrl+C to stop)",
        watch_path
    );

    let mut last_processed = std::time::Instant::now();

    for result in rx {
        match result {
            Ok(events) => {
                let relevant_changes = events.iter().any(|event| {
                    event.paths.iter().any(|path| {
                        let relevant = is_relevant_path(path, &config);
                        if relevant {
                            debug!("Detected relevant change in {:?}", path);
                        }
                        relevant
                    })
                });

                let now = std::time::Instant::now();
                if relevant_changes
                    && now.duration_since(last_processed)
                        > Duration::from_millis(config.debounce_ms)
                {
                    match build_site(&config.build, app_config) {
                        Ok(report) => {
                            info!(
                                "Rebuilt site: {} built, {} failed",
                                report.built.len(),
                                report.failed.len()
                            );
                            last_processed = now;
                        }
                        Err(e) => error!("Failed to rebuild site: {}", e),
                    }
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        }
    }

    Ok(())
}

/// Markdown sources and local theme assets trigger rebuilds; output
/// writes (which land outside the watched tree) and scratch files do
/// not.
fn is_relevant_path(path: &Path, config: &WatchConfig) -> bool {
    let path_str = path.to_string_lossy().to_string();
    for asset in config.build.css.iter().chain(config.build.js.iter()) {
        if !asset.is_remote && asset.path == path_str {
            return true;
        }
    }

    match path.extension() {
        Some(ext) => {
            let ext_str = ext.to_string_lossy().to_lowercase();
            ext_str == "md" || ext_str == "css" || ext_str == "js"
        }
        None => false,
    }
}
