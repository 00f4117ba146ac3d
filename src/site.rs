// ABOUTME: Whole-site build orchestration for the deckfold application
// ABOUTME: Scans sources, parses each deck, and writes pages plus a homepage

use crate::assets::ThemeAsset;
use crate::config::Config;
use crate::errors::Result;
use crate::html::{render_homepage, render_presentation_page, write_html_to_file};
use crate::pipeline::parse_presentation_file;
use crate::scanner::{scan_presentations, PresentationEntry};
use crate::utils;
use log::{error, info};
use std::path::{Path, PathBuf};

/// Options for one site build.
pub struct BuildOptions {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub css: Vec<ThemeAsset>,
    pub js: Vec<ThemeAsset>,
}

/// What happened during a build. Per-document failures are collected
/// here instead of aborting the batch.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub built: Vec<String>,
    pub failed: Vec<(PathBuf, String)>,
    pub warning_count: usize,
}

/// Build the whole site: scan, parse, render, write.
///
/// One unreadable or unrenderable presentation is reported and
/// skipped; the rest of the batch continues.
pub fn build_site(options: &BuildOptions, config: &Config) -> Result<BuildReport> {
    utils::validate_directory_exists(&options.source_dir)?;
    utils::ensure_directory_exists(&options.output_dir)?;
    utils::validate_directory_writable(&options.output_dir)?;

    let entries = scan_presentations(&options.source_dir)?;
    info!("Building {} presentations", entries.len());

    let mut report = BuildReport::default();
    let mut homepage_entries: Vec<(PresentationEntry, usize)> = Vec::new();

    for entry in entries {
        match build_presentation(&entry, options, config) {
            Ok((slide_count, warning_count)) => {
                report.warning_count += warning_count;
                report.built.push(entry.slug.clone());
                homepage_entries.push((entry, slide_count));
            }
            Err(e) => {
                error!("Failed to build {}: {}", entry.source_path.display(), e);
                report.failed.push((entry.source_path.clone(), e.to_string()));
            }
        }
    }

    let homepage = render_homepage(&homepage_entries, &options.css, config)?;
    write_html_to_file(&homepage, &options.output_dir.join("index.html"))?;

    info!(
        "Site build complete: {} built, {} failed, {} warnings",
        report.built.len(),
        report.failed.len(),
        report.warning_count
    );
    Ok(report)
}

fn build_presentation(
    entry: &PresentationEntry,
    options: &BuildOptions,
    config: &Config,
) -> Result<(usize, usize)> {
    let outcome = parse_presentation_file(&entry.source_path)?;
    let page = render_presentation_page(&outcome.model, &options.css, &options.js, config)?;
    let output_path = options.output_dir.join(&entry.slug).join("index.html");
    write_html_to_file(&page, &output_path)?;
    Ok((outcome.model.slide_count(), outcome.warnings.len()))
}

/// Build a single presentation file to a single output page.
pub fn build_page(
    input: &Path,
    output: &Path,
    css: &[ThemeAsset],
    js: &[ThemeAsset],
    config: &Config,
) -> Result<usize> {
    utils::validate_file_exists(input)?;
    utils::ensure_parent_directory_exists(output)?;
    let outcome = parse_presentation_file(input)?;
    let page = render_presentation_page(&outcome.model, css, js, config)?;
    write_html_to_file(&page, output)?;
    Ok(outcome.model.slide_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(source: &Path, output: &Path) -> BuildOptions {
        BuildOptions {
            source_dir: source.to_path_buf(),
            output_dir: output.to_path_buf(),
            css: vec![],
            js: vec![],
        }
    }

    #[test]
    fn test_build_site_writes_pages_and_homepage() {
        let source = TempDir::new().expect("source");
        let output = TempDir::new().expect("output");
        fs::write(source.path().join("one.md"), "# One\n\ntext").expect("write");
        fs::write(
            source.path().join("two.md"),
            "# Two\n\na\n\n---\n\nb",
        )
        .expect("write");

        let config = Config::default();
        let report =
            build_site(&options(source.path(), output.path()), &config).expect("build");
        assert_eq!(report.built, vec!["one", "two"]);
        assert!(report.failed.is_empty());
        assert!(output.path().join("index.html").exists());
        assert!(output.path().join("one/index.html").exists());
        assert!(output.path().join("two/index.html").exists());

        let homepage =
            fs::read_to_string(output.path().join("index.html")).expect("read homepage");
        assert!(homepage.contains("One"));
        assert!(homepage.contains("2 slides"));
    }

    #[test]
    fn test_build_page_single_file() {
        let dir = TempDir::new().expect("tempdir");
        let input = dir.path().join("deck.md");
        let output = dir.path().join("out/deck.html");
        fs::write(&input, "# Deck\n\nBody").expect("write");

        let config = Config::default();
        let slides = build_page(&input, &output, &[], &[], &config).expect("build");
        assert_eq!(slides, 1);
        let html = fs::read_to_string(&output).expect("read");
        assert!(html.contains("<title>Deck</title>"));
    }

    #[test]
    fn test_missing_source_dir_fails() {
        let output = TempDir::new().expect("output");
        let config = Config::default();
        let result = build_site(
            &options(Path::new("/no/such/source"), output.path()),
            &config,
        );
        assert!(result.is_err());
    }
}
