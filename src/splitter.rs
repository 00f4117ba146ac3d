// ABOUTME: Slide splitter for the deckfold parsing pipeline
// ABOUTME: Divides a document body into ordered slide-content strings

use crate::document::DocumentConfig;
use crate::warnings::{Warning, WarningSink};
use log::debug;

/// Split a document body into ordered slide contents.
///
/// Two break sources are merged: standalone `---` lines with a blank
/// line directly above and below (document boundaries count as blank),
/// and headings whose depth is in `config.slide_dividers`. Neither rule
/// applies inside fenced code. Empty slices from adjacent separators are
/// dropped with a warning so output indices stay contiguous.
pub fn split_slides(
    body: &str,
    config: &DocumentConfig,
    warnings: &mut WarningSink,
) -> Vec<String> {
    let lines: Vec<&str> = body.lines().collect();
    if lines.is_empty() {
        // A truly empty document still yields a single empty slide.
        return vec![String::new()];
    }

    // Break positions: line index at which a new slide starts. A
    // separator break removes the `---` line itself; a divider break
    // keeps the heading as the first line of the new slide.
    let mut breaks: Vec<Break> = Vec::new();
    let mut in_fence = false;
    let mut fence_marker = "```";

    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_end();
        if in_fence {
            if trimmed.trim_start().starts_with(fence_marker) {
                in_fence = false;
            }
            continue;
        }
        if let Some(marker) = fence_open_marker(trimmed) {
            in_fence = true;
            fence_marker = marker;
            continue;
        }

        if trimmed == "---" && blank_above(&lines, idx) && blank_below(&lines, idx) {
            breaks.push(Break::Separator(idx));
            continue;
        }

        if !config.slide_dividers.is_empty() && idx > 0 {
            if let Some(depth) = heading_depth(trimmed) {
                if config.slide_dividers.contains(&depth) {
                    breaks.push(Break::Divider(idx));
                }
            }
        }
    }

    let mut slides: Vec<String> = Vec::new();
    let mut start = 0;
    let mut after_separator = false;
    for brk in &breaks {
        let (end, next, is_separator) = match brk {
            Break::Separator(idx) => (*idx, idx + 1, true),
            Break::Divider(idx) => (*idx, *idx, false),
        };
        // Only a gap between two `---` separators is an authoring
        // mistake worth a warning; gaps next to divider headings are
        // normal and dropped silently.
        let noisy = after_separator && is_separator;
        push_slice(&lines, start, end, noisy, &mut slides, warnings);
        start = next;
        after_separator = is_separator;
    }
    push_slice(&lines, start, lines.len(), false, &mut slides, warnings);

    if slides.is_empty() {
        // All slices were empty: emit one empty slide rather than none.
        slides.push(String::new());
    }

    debug!(
        "split into {} slides ({} break candidates)",
        slides.len(),
        breaks.len()
    );
    slides
}

enum Break {
    /// A `---` line; the line itself is consumed.
    Separator(usize),
    /// A configured heading; the heading starts the next slide.
    Divider(usize),
}

fn push_slice(
    lines: &[&str],
    start: usize,
    end: usize,
    warn_if_empty: bool,
    slides: &mut Vec<String>,
    warnings: &mut WarningSink,
) {
    let slice = lines[start..end].join("\n");
    if slice.trim().is_empty() {
        if warn_if_empty {
            warnings.push(Warning::SlideSplit {
                message: format!("empty slide between lines {} and {} dropped", start, end + 1),
            });
        }
        return;
    }
    slides.push(trim_blank_edges(&slice));
}

fn trim_blank_edges(slice: &str) -> String {
    slice
        .trim_start_matches('\n')
        .trim_end_matches(|c| c == '\n' || c == ' ')
        .to_string()
}

fn blank_above(lines: &[&str], idx: usize) -> bool {
    idx == 0 || lines[idx - 1].trim().is_empty()
}

fn blank_below(lines: &[&str], idx: usize) -> bool {
    idx + 1 >= lines.len() || lines[idx + 1].trim().is_empty()
}

/// Returns the fence marker if the line opens a fenced code block.
fn fence_open_marker(line: &str) -> Option<&'static str> {
    let t = line.trim_start();
    if t.starts_with("```") {
        Some("```")
    } else if t.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

/// Heading depth for an ATX heading line, `None` otherwise.
pub fn heading_depth(line: &str) -> Option<u8> {
    let t = line.trim_start();
    let hashes = t.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }
    let rest = &t[hashes..];
    if rest.is_empty() || rest.starts_with(' ') {
        Some(hashes as u8)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentConfig;
    use std::collections::BTreeSet;

    fn split(body: &str) -> Vec<String> {
        let mut warnings = WarningSink::new();
        split_slides(body, &DocumentConfig::default(), &mut warnings)
    }

    fn split_with_dividers(body: &str, levels: &[u8]) -> (Vec<String>, WarningSink) {
        let config = DocumentConfig {
            slide_dividers: BTreeSet::from_iter(levels.iter().copied()),
            ..DocumentConfig::default()
        };
        let mut warnings = WarningSink::new();
        let slides = split_slides(body, &config, &mut warnings);
        (slides, warnings)
    }

    #[test]
    fn test_no_separator_yields_one_slide() {
        let slides = split("# Only\n\nOne slide here");
        assert_eq!(slides.len(), 1);
        assert!(slides[0].contains("Only"));
    }

    #[test]
    fn test_strict_separator() {
        let slides = split("First\n\n---\n\nSecond");
        assert_eq!(slides, vec!["First", "Second"]);
    }

    #[test]
    fn test_separator_requires_blank_lines() {
        // Without surrounding blank lines the dashes are content
        // (a setext underline or table rule), not a separator.
        let slides = split("First\n---\nSecond");
        assert_eq!(slides.len(), 1);
        let slides = split("First\n\n---\nSecond");
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn test_separator_inside_code_fence_is_content() {
        let body = "Intro\n\n```\nfront\n\n---\n\nback\n```\n\nOutro";
        let slides = split(body);
        assert_eq!(slides.len(), 1);
        assert!(slides[0].contains("---"));
    }

    #[test]
    fn test_adjacent_separators_drop_empty_slide() {
        let mut warnings = WarningSink::new();
        let slides = split_slides(
            "One\n\n---\n\n---\n\nTwo",
            &DocumentConfig::default(),
            &mut warnings,
        );
        assert_eq!(slides, vec!["One", "Two"]);
        assert_eq!(warnings.count_of("slide-split"), 1);
    }

    #[test]
    fn test_heading_dividers() {
        let (slides, _) = split_with_dividers("# A\n\ntext\n\n# B\n\nmore\n\n## Sub", &[1]);
        assert_eq!(slides.len(), 2);
        assert!(slides[0].starts_with("# A"));
        assert!(slides[1].starts_with("# B"));
        assert!(slides[1].contains("## Sub"));
    }

    #[test]
    fn test_first_line_heading_never_makes_leading_empty_slide() {
        let (slides, _) = split_with_dividers("# Top\n\ntext", &[1]);
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn test_divider_heading_inside_fence_ignored() {
        let (slides, _) = split_with_dividers("# A\n\n```\n# not a heading\n```", &[1]);
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn test_separators_and_dividers_merge() {
        let (slides, _) =
            split_with_dividers("# A\n\nbody\n\n---\n\nplain\n\n## B\n\ntail", &[2]);
        assert_eq!(slides.len(), 3);
        assert!(slides[1].starts_with("plain"));
        assert!(slides[2].starts_with("## B"));
    }

    #[test]
    fn test_empty_document_yields_single_empty_slide() {
        let slides = split("");
        assert_eq!(slides.len(), 1);
        assert!(slides[0].is_empty());
    }

    #[test]
    fn test_contiguous_indices_after_drop() {
        let slides = split("A\n\n---\n\n---\n\n---\n\nB");
        // Two surviving slides, no gaps.
        assert_eq!(slides.len(), 2);
    }

    #[test]
    fn test_heading_depth() {
        assert_eq!(heading_depth("# One"), Some(1));
        assert_eq!(heading_depth("### Three"), Some(3));
        assert_eq!(heading_depth("#NoSpace"), None);
        assert_eq!(heading_depth("plain"), None);
        assert_eq!(heading_depth("####### seven"), None);
        assert_eq!(heading_depth("##"), Some(2));
    }
}
