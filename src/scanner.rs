// ABOUTME: Source-tree discovery of presentation markdown files
// ABOUTME: Produces (title, path, slug) entries for the site builder

use crate::errors::{DeckError, Result};
use crate::resolver::slugify;
use crate::splitter::heading_depth;
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One discovered presentation source.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationEntry {
    /// Display title: the first heading in the file, else the stem.
    pub title: String,
    pub source_path: PathBuf,
    /// URL-safe output slug, unique within the scan.
    pub slug: String,
}

/// Scan a directory tree for presentation markdown files.
///
/// Hidden files and files whose name starts with `_` are skipped
/// (layout/include conventions). A file that cannot be read is logged
/// and skipped so one bad file never empties the batch; an unreadable
/// or empty source *directory* is the caller's error.
pub fn scan_presentations(source_dir: &Path) -> Result<Vec<PresentationEntry>> {
    if !source_dir.is_dir() {
        return Err(DeckError::PathNotFoundError(source_dir.to_path_buf()));
    }

    let pattern = format!("{}/**/*.md", source_dir.to_string_lossy());
    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in glob::glob(&pattern)
        .map_err(|e| DeckError::ValidationError(format!("Invalid glob pattern: {}", e)))?
        .flatten()
    {
        let name = entry
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        if name.starts_with('.') || name.starts_with('_') {
            debug!("skipping {}", entry.display());
            continue;
        }
        paths.push(entry);
    }
    paths.sort();

    if paths.is_empty() {
        return Err(DeckError::NoPresentationsFoundError(
            source_dir.to_string_lossy().to_string(),
        ));
    }

    let mut seen_slugs: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(paths.len());
    for path in paths {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "presentation".to_string());

        let title = match fs::read_to_string(&path) {
            Ok(text) => first_heading(&text).unwrap_or_else(|| stem.clone()),
            Err(e) => {
                warn!("cannot read {}: {}, skipping", path.display(), e);
                continue;
            }
        };

        let mut slug = slugify(&stem);
        let mut n = 2;
        while !seen_slugs.insert(slug.clone()) {
            slug = format!("{}-{}", slugify(&stem), n);
            n += 1;
        }

        entries.push(PresentationEntry {
            title,
            source_path: path,
            slug,
        });
    }

    Ok(entries)
}

/// The first ATX heading's text, skipping fenced code.
fn first_heading(text: &str) -> Option<String> {
    let mut in_fence = false;
    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if heading_depth(line).is_some() {
            let text = crate::resolver::heading_text(line);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}
