// ABOUTME: Code block extraction and highlight-spec expansion
// ABOUTME: Handles fenced and indented blocks plus [.code-highlight] association

use crate::warnings::{Warning, WarningSink};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightMode {
    None,
    Lines,
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedCodeBlock {
    pub code: String,
    /// Fence tag if present, else the document default, else none.
    pub language: Option<String>,
    pub highlight: HighlightMode,
    /// 1-indexed lines to highlight, already clamped to the block.
    pub highlighted_lines: BTreeSet<usize>,
    /// Index of the block's first line in the slide's visible stream.
    pub line: usize,
}

/// Result of scanning one slide for code: the extracted blocks plus a
/// per-line mask marking code regions (fence markers included) so
/// later extractors skip them.
#[derive(Debug, Default)]
pub struct CodeExtract {
    pub blocks: Vec<ProcessedCodeBlock>,
    pub mask: Vec<bool>,
}

/// Extract fenced and indented code blocks from a slide's lines.
///
/// `highlights` carries `[.code-highlight]` directives as (position,
/// spec) pairs from the directive scan; each must point at a code
/// block across nothing but blank lines, or it is discarded with a
/// warning. When several specs target one block, the last wins.
pub fn extract_code(
    lines: &[String],
    highlights: &[(usize, String)],
    default_language: Option<&str>,
    slide_index: usize,
    warnings: &mut WarningSink,
) -> CodeExtract {
    let mut extract = CodeExtract {
        blocks: Vec::new(),
        mask: vec![false; lines.len()],
    };

    let mut idx = 0;
    while idx < lines.len() {
        let trimmed = lines[idx].trim_end();
        if let Some((marker, tag)) = fence_open(trimmed) {
            let start = idx;
            let mut body: Vec<&str> = Vec::new();
            idx += 1;
            while idx < lines.len() && !lines[idx].trim_start().starts_with(marker) {
                body.push(&lines[idx]);
                idx += 1;
            }
            let end = idx.min(lines.len().saturating_sub(1));
            for m in &mut extract.mask[start..=end] {
                *m = true;
            }
            extract.blocks.push(ProcessedCodeBlock {
                code: body.join("\n"),
                language: tag.or_else(|| default_language.map(|l| l.to_string())),
                highlight: HighlightMode::None,
                highlighted_lines: BTreeSet::new(),
                line: start,
            });
            idx += 1;
            continue;
        }

        if is_indented_code(lines, idx) {
            let start = idx;
            let mut body: Vec<String> = Vec::new();
            while idx < lines.len() && (is_indented_line(&lines[idx]) || lines[idx].trim().is_empty())
            {
                // A trailing run of blanks belongs to the paragraph
                // below, not the block; trim them afterwards.
                body.push(strip_indent(&lines[idx]));
                idx += 1;
            }
            while body.last().map(|l| l.trim().is_empty()).unwrap_or(false) {
                body.pop();
                idx -= 1;
            }
            for m in &mut extract.mask[start..idx] {
                *m = true;
            }
            extract.blocks.push(ProcessedCodeBlock {
                code: body.join("\n"),
                language: default_language.map(|l| l.to_string()),
                highlight: HighlightMode::None,
                highlighted_lines: BTreeSet::new(),
                line: start,
            });
            continue;
        }

        idx += 1;
    }

    apply_highlights(&mut extract, lines, highlights, slide_index, warnings);
    extract
}

fn apply_highlights(
    extract: &mut CodeExtract,
    lines: &[String],
    highlights: &[(usize, String)],
    slide_index: usize,
    warnings: &mut WarningSink,
) {
    for (position, spec) in highlights {
        // The directive must be followed by a code block with only
        // blank lines between.
        let mut target = *position;
        while target < lines.len() && lines[target].trim().is_empty() {
            target += 1;
        }
        let block = extract.blocks.iter_mut().find(|b| b.line == target);
        match block {
            Some(block) => {
                let line_count = block.code.lines().count();
                let (mode, set) = parse_highlight_spec(spec, line_count);
                // Stepped directives: the last one before the block is
                // the static result.
                block.highlight = mode;
                block.highlighted_lines = set;
            }
            None => {
                warnings.push(Warning::HighlightDirectiveDiscarded { slide: slide_index });
            }
        }
    }
}

/// Expand a highlight spec (`"1,3-5"`, `"all"`, `"none"`) against a
/// block of `line_count` lines. Out-of-range entries are clamped away
/// silently since authors commonly miscount after edits.
pub fn parse_highlight_spec(spec: &str, line_count: usize) -> (HighlightMode, BTreeSet<usize>) {
    let spec = spec.trim();
    if spec.eq_ignore_ascii_case("all") {
        return (HighlightMode::All, (1..=line_count).collect());
    }
    if spec.eq_ignore_ascii_case("none") || spec.is_empty() {
        return (HighlightMode::None, BTreeSet::new());
    }

    let mut set = BTreeSet::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some((lo, hi)) = part.split_once('-') {
            if let (Ok(lo), Ok(hi)) = (lo.trim().parse::<usize>(), hi.trim().parse::<usize>()) {
                for n in lo..=hi {
                    if n >= 1 && n <= line_count {
                        set.insert(n);
                    }
                }
            }
        } else if let Ok(n) = part.parse::<usize>() {
            if n >= 1 && n <= line_count {
                set.insert(n);
            }
        }
    }

    if set.is_empty() {
        (HighlightMode::None, set)
    } else {
        (HighlightMode::Lines, set)
    }
}

fn fence_open(line: &str) -> Option<(&'static str, Option<String>)> {
    let t = line.trim_start();
    for marker in ["```", "~~~"] {
        if let Some(rest) = t.strip_prefix(marker) {
            let tag = rest.trim();
            let tag = if tag.is_empty() {
                None
            } else {
                Some(tag.to_string())
            };
            return Some((if marker == "```" { "```" } else { "~~~" }, tag));
        }
    }
    None
}

fn is_indented_line(line: &str) -> bool {
    (line.starts_with("    ") || line.starts_with('\t')) && !line.trim().is_empty()
}

fn strip_indent(line: &str) -> String {
    if let Some(rest) = line.strip_prefix("    ") {
        rest.to_string()
    } else if let Some(rest) = line.strip_prefix('\t') {
        rest.to_string()
    } else {
        line.to_string()
    }
}

/// An indented run only starts a code block when preceded by a blank
/// line (or the top of the slide), matching markdown's rule and
/// keeping hanging list indentation as text.
fn is_indented_code(lines: &[String], idx: usize) -> bool {
    if !is_indented_line(&lines[idx]) {
        return false;
    }
    idx == 0 || lines[idx - 1].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(|l| l.to_string()).collect()
    }

    fn extract(text: &str) -> CodeExtract {
        let mut warnings = WarningSink::new();
        extract_code(&lines(text), &[], None, 0, &mut warnings)
    }

    #[test]
    fn test_fenced_block_with_language() {
        let extract = extract("before\n```rust\nfn main() {}\n```\nafter");
        assert_eq!(extract.blocks.len(), 1);
        assert_eq!(extract.blocks[0].language.as_deref(), Some("rust"));
        assert_eq!(extract.blocks[0].code, "fn main() {}");
        assert_eq!(extract.mask, vec![false, true, true, true, false]);
    }

    #[test]
    fn test_fence_language_defaulting() {
        let mut warnings = WarningSink::new();
        let extract = extract_code(
            &lines("```\nx = 1\n```"),
            &[],
            Some("python"),
            0,
            &mut warnings,
        );
        assert_eq!(extract.blocks[0].language.as_deref(), Some("python"));
    }

    #[test]
    fn test_explicit_tag_beats_default() {
        let mut warnings = WarningSink::new();
        let extract =
            extract_code(&lines("```js\nx\n```"), &[], Some("python"), 0, &mut warnings);
        assert_eq!(extract.blocks[0].language.as_deref(), Some("js"));
    }

    #[test]
    fn test_no_language_at_all() {
        let extract = extract("```\nplain\n```");
        assert_eq!(extract.blocks[0].language, None);
    }

    #[test]
    fn test_indented_block() {
        let extract = extract("para\n\n    let a = 1;\n    let b = 2;\n\ntail");
        assert_eq!(extract.blocks.len(), 1);
        assert_eq!(extract.blocks[0].code, "let a = 1;\nlet b = 2;");
        assert!(extract.mask[2] && extract.mask[3]);
        assert!(!extract.mask[0] && !extract.mask[5]);
    }

    #[test]
    fn test_indented_block_gets_default_language() {
        let mut warnings = WarningSink::new();
        let extract = extract_code(
            &lines("\n    tabbed();"),
            &[],
            Some("c"),
            0,
            &mut warnings,
        );
        assert_eq!(extract.blocks.len(), 1);
        assert_eq!(extract.blocks[0].language.as_deref(), Some("c"));
    }

    #[test]
    fn test_highlight_spec_ranges() {
        let (mode, set) = parse_highlight_spec("2, 6-8", 8);
        assert_eq!(mode, HighlightMode::Lines);
        assert_eq!(set, BTreeSet::from([2, 6, 7, 8]));
    }

    #[test]
    fn test_highlight_spec_clamps_out_of_range() {
        let (mode, set) = parse_highlight_spec("2, 6-8", 3);
        assert_eq!(mode, HighlightMode::Lines);
        assert_eq!(set, BTreeSet::from([2]));
    }

    #[test]
    fn test_highlight_spec_all_and_none() {
        let (mode, set) = parse_highlight_spec("all", 3);
        assert_eq!(mode, HighlightMode::All);
        assert_eq!(set, BTreeSet::from([1, 2, 3]));

        let (mode, set) = parse_highlight_spec("none", 3);
        assert_eq!(mode, HighlightMode::None);
        assert!(set.is_empty());
    }

    #[test]
    fn test_highlight_attaches_across_blanks() {
        let mut warnings = WarningSink::new();
        let extract = extract_code(
            &lines("\n```rust\na\nb\nc\n```"),
            &[(0, "1-2".to_string())],
            None,
            0,
            &mut warnings,
        );
        assert_eq!(extract.blocks[0].highlight, HighlightMode::Lines);
        assert_eq!(extract.blocks[0].highlighted_lines, BTreeSet::from([1, 2]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_highlight_without_block_is_discarded() {
        let mut warnings = WarningSink::new();
        let extract = extract_code(
            &lines("just text"),
            &[(0, "1".to_string())],
            None,
            4,
            &mut warnings,
        );
        assert!(extract.blocks.is_empty());
        assert_eq!(warnings.count_of("highlight-directive-discarded"), 1);
    }

    #[test]
    fn test_stepped_highlights_last_wins() {
        let mut warnings = WarningSink::new();
        let extract = extract_code(
            &lines("```rust\na\nb\nc\n```"),
            &[(0, "1".to_string()), (0, "2-3".to_string())],
            None,
            0,
            &mut warnings,
        );
        assert_eq!(extract.blocks[0].highlighted_lines, BTreeSet::from([2, 3]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let extract = extract("```\ndangling");
        assert_eq!(extract.blocks.len(), 1);
        assert_eq!(extract.blocks[0].code, "dangling");
        assert_eq!(extract.mask, vec![true, true]);
    }

    #[test]
    fn test_multiple_blocks() {
        let extract = extract("```\none\n```\n\n```\ntwo\n```");
        assert_eq!(extract.blocks.len(), 2);
        assert_eq!(extract.blocks[0].line, 0);
        assert_eq!(extract.blocks[1].line, 4);
    }
}
