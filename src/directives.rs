// ABOUTME: Per-slide bracketed directive parsing for the deckfold pipeline
// ABOUTME: Recognizes [.name] / [.name: value] lines and strips them from content

use crate::document::FilterMode;
use crate::warnings::{Warning, WarningSink};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// A recognized slide directive. Unknown directive text maps to
/// `Unrecognized` so matching stays exhaustive without panicking on
/// future syntax.
#[derive(Debug, Clone, PartialEq)]
pub enum SlideDirective {
    Column,
    BackgroundImage(String),
    HideFooter,
    HideSlideNumbers,
    Autoscale(bool),
    SlideTransition(String),
    ReadabilityFilter(FilterMode),
    Footer(String),
    CodeHighlight(String),
    Unrecognized(String),
}

/// Slide-level overrides of document configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SlideOverrides {
    pub background_image: Option<String>,
    pub hide_footer: bool,
    pub hide_slide_numbers: bool,
    pub autoscale: Option<bool>,
    pub transition: Option<String>,
    pub readability_filter: Option<FilterMode>,
    pub footer: Option<String>,
}

/// Result of scanning one slide's content for directives.
///
/// `cleaned` holds the visible lines with every directive line removed.
/// `column_breaks` and `highlights` are positions into `cleaned`: the
/// index at which content following the directive begins.
#[derive(Debug, Default)]
pub struct DirectiveScan {
    pub cleaned: Vec<String>,
    pub overrides: SlideOverrides,
    pub column_breaks: Vec<usize>,
    pub highlights: Vec<(usize, String)>,
}

static DIRECTIVE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\.([a-zA-Z][a-zA-Z0-9-]*)(?::\s*(.*?))?\]\s*$").unwrap());

/// Scan one slide's content for `[.name]` / `[.name: value]` lines.
///
/// Directive lines are removed from the visible stream. Lines inside
/// fenced code are never directives. Unrecognized directives are
/// dropped with a warning; recognized ones fold into `SlideOverrides`
/// or positional break/highlight lists.
pub fn scan_directives(
    content: &str,
    slide_index: usize,
    warnings: &mut WarningSink,
) -> DirectiveScan {
    let mut scan = DirectiveScan::default();
    let mut in_fence = false;
    let mut fence_marker = "```";

    for (line_no, line) in content.lines().enumerate() {
        let trimmed = line.trim_end();
        if in_fence {
            if trimmed.trim_start().starts_with(fence_marker) {
                in_fence = false;
            }
            scan.cleaned.push(line.to_string());
            continue;
        }
        if let Some(marker) = fence_marker_of(trimmed) {
            in_fence = true;
            fence_marker = marker;
            scan.cleaned.push(line.to_string());
            continue;
        }

        match parse_directive_line(trimmed) {
            None => scan.cleaned.push(line.to_string()),
            Some(directive) => {
                apply_directive(&mut scan, directive, slide_index, line_no, warnings)
            }
        }
    }

    scan
}

fn fence_marker_of(line: &str) -> Option<&'static str> {
    let t = line.trim_start();
    if t.starts_with("```") {
        Some("```")
    } else if t.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Parse a single line into a directive, or `None` if the line is
/// ordinary content.
pub fn parse_directive_line(line: &str) -> Option<SlideDirective> {
    let caps = DIRECTIVE_LINE.captures(line.trim())?;
    let name = caps[1].to_ascii_lowercase();
    let value = caps.get(2).map(|m| m.as_str().trim().to_string());

    let directive = match (name.as_str(), value) {
        ("column", None) => SlideDirective::Column,
        ("background-image", Some(path)) if !path.is_empty() => {
            SlideDirective::BackgroundImage(path)
        }
        ("hide-footer", None) => SlideDirective::HideFooter,
        ("hide-slide-numbers", None) => SlideDirective::HideSlideNumbers,
        ("autoscale", Some(v)) => match v.to_ascii_lowercase().as_str() {
            "true" => SlideDirective::Autoscale(true),
            "false" => SlideDirective::Autoscale(false),
            _ => SlideDirective::Unrecognized(line.trim().to_string()),
        },
        ("slide-transition", Some(spec)) if !spec.is_empty() => {
            SlideDirective::SlideTransition(spec)
        }
        ("readability-filter", Some(v)) => match v.to_ascii_lowercase().as_str() {
            "auto" => SlideDirective::ReadabilityFilter(FilterMode::Auto),
            "on" | "true" => SlideDirective::ReadabilityFilter(FilterMode::On),
            "off" | "false" => SlideDirective::ReadabilityFilter(FilterMode::Off),
            _ => SlideDirective::Unrecognized(line.trim().to_string()),
        },
        ("footer", Some(text)) => SlideDirective::Footer(text),
        ("code-highlight", Some(spec)) if !spec.is_empty() => {
            SlideDirective::CodeHighlight(spec)
        }
        _ => SlideDirective::Unrecognized(line.trim().to_string()),
    };
    Some(directive)
}

fn apply_directive(
    scan: &mut DirectiveScan,
    directive: SlideDirective,
    slide_index: usize,
    line_no: usize,
    warnings: &mut WarningSink,
) {
    let position = scan.cleaned.len();
    match directive {
        SlideDirective::Column => scan.column_breaks.push(position),
        SlideDirective::BackgroundImage(path) => {
            scan.overrides.background_image = Some(path);
        }
        SlideDirective::HideFooter => scan.overrides.hide_footer = true,
        SlideDirective::HideSlideNumbers => scan.overrides.hide_slide_numbers = true,
        SlideDirective::Autoscale(flag) => scan.overrides.autoscale = Some(flag),
        SlideDirective::SlideTransition(spec) => scan.overrides.transition = Some(spec),
        SlideDirective::ReadabilityFilter(mode) => {
            scan.overrides.readability_filter = Some(mode);
        }
        SlideDirective::Footer(text) => scan.overrides.footer = Some(text),
        SlideDirective::CodeHighlight(spec) => scan.highlights.push((position, spec)),
        SlideDirective::Unrecognized(text) => {
            warnings.push(Warning::ConfigParse {
                line: line_no + 1,
                message: format!("slide {}: unrecognized directive {}", slide_index, text),
            });
        }
    }
}
