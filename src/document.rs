// ABOUTME: Document-wide configuration parsed from the leading key: value block
// ABOUTME: Provides DocumentConfig and the global directive parser

use crate::warnings::{Warning, WarningSink};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

/// Mode for the background readability filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Auto,
    On,
    Off,
}

impl Default for FilterMode {
    fn default() -> Self {
        FilterMode::Auto
    }
}

impl FilterMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(FilterMode::Auto),
            "on" | "true" => Some(FilterMode::On),
            "off" | "false" => Some(FilterMode::Off),
            _ => None,
        }
    }
}

/// Document-wide configuration, immutable after parse.
///
/// Every downstream stage receives this read-only; there is no
/// process-wide config singleton.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentConfig {
    pub theme: Option<String>,
    pub autoscale: bool,
    pub slide_numbers: bool,
    pub slide_count: bool,
    /// Footer text, raw markdown.
    pub footer: Option<String>,
    pub background_image: Option<String>,
    pub build_lists: bool,
    pub slide_transition: Option<String>,
    /// Default language applied to code blocks without a fence tag.
    pub code_language: Option<String>,
    /// Heading depths rendered fit-to-slide.
    pub fit_headers: BTreeSet<u8>,
    /// Heading depths that start a new slide.
    pub slide_dividers: BTreeSet<u8>,
    pub readability_filter: FilterMode,
}

static CONFIG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)\s*:\s*(.*)$").unwrap());

/// Parse the leading `key: value` block of a document.
///
/// Returns the populated config and the remaining body text. The block
/// ends at the first line that is blank or does not look like a config
/// line; that terminator and everything after it belong to the body.
/// Unknown keys are ignored for forward compatibility. Malformed values
/// are skipped with a warning; this function never fails.
pub fn parse_document_config(text: &str, warnings: &mut WarningSink) -> (DocumentConfig, String) {
    let mut config = DocumentConfig::default();
    let lines: Vec<&str> = text.lines().collect();
    let mut consumed = 0;

    for (idx, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            // Blank line ends the config block; the body starts after it.
            consumed = idx + 1;
            break;
        }
        let caps = match CONFIG_LINE.captures(line) {
            Some(caps) => caps,
            None => {
                // First content line (heading, separator, prose) ends the block.
                consumed = idx;
                break;
            }
        };
        // A `---` or heading never matches CONFIG_LINE, so reaching here
        // means the line is shaped like a directive. Keys are compared
        // case-insensitively with separators stripped.
        apply_key(&mut config, idx + 1, &caps[1], caps[2].trim(), warnings);
        consumed = idx + 1;
    }

    let body = lines[consumed.min(lines.len())..].join("\n");
    (config, body)
}

fn apply_key(
    config: &mut DocumentConfig,
    line: usize,
    raw_key: &str,
    value: &str,
    warnings: &mut WarningSink,
) {
    let key: String = raw_key
        .to_ascii_lowercase()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect();

    match key.as_str() {
        "theme" => config.theme = non_empty(value),
        "autoscale" => config.autoscale = parse_bool(line, "autoscale", value, warnings),
        "slidenumbers" => {
            config.slide_numbers = parse_bool(line, "slidenumbers", value, warnings)
        }
        "slidecount" => config.slide_count = parse_bool(line, "slidecount", value, warnings),
        "footer" => config.footer = non_empty(value),
        "backgroundimage" => config.background_image = non_empty(value),
        "buildlists" => config.build_lists = parse_bool(line, "build-lists", value, warnings),
        "slidetransition" => config.slide_transition = non_empty(value),
        "codelanguage" => config.code_language = non_empty(value),
        "fitheaders" | "fitheader" => {
            config.fit_headers = parse_heading_levels(line, "fit-headers", value, warnings)
        }
        "slidedividers" | "slidedivider" => {
            config.slide_dividers = parse_heading_levels(line, "slide-dividers", value, warnings)
        }
        "readabilityfilter" => match FilterMode::parse(value) {
            Some(mode) => config.readability_filter = mode,
            None => warnings.push(Warning::ConfigParse {
                line,
                message: format!("invalid readability-filter value '{}', using auto", value),
            }),
        },
        // Unknown keys are ignored, not errors.
        _ => {}
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_bool(line: usize, key: &str, value: &str, warnings: &mut WarningSink) -> bool {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => true,
        "false" => false,
        other => {
            warnings.push(Warning::ConfigParse {
                line,
                message: format!("invalid boolean '{}' for {}, treating as false", other, key),
            });
            false
        }
    }
}

/// Parse a comma-separated list of heading-marker tokens (`#`, `##`, ...)
/// into depth integers.
fn parse_heading_levels(
    line: usize,
    key: &str,
    value: &str,
    warnings: &mut WarningSink,
) -> BTreeSet<u8> {
    let mut levels = BTreeSet::new();
    for token in value.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|c| c == '#') && token.len() <= 6 {
            levels.insert(token.len() as u8);
        } else {
            warnings.push(Warning::ConfigParse {
                line,
                message: format!("invalid heading marker '{}' in {}", token, key),
            });
        }
    }
    levels
}
