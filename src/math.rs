// ABOUTME: Math formula extraction for $...$ and $$...$$ spans
// ABOUTME: Validates delimiter balance and leaves invalid spans as literal text

use crate::warnings::{Warning, WarningSink};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MathKind {
    Inline,
    Display,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MathFormula {
    /// Raw LaTeX content between the delimiters.
    pub content: String,
    pub kind: MathKind,
    /// Line of the opening delimiter in the slide's visible stream,
    /// for anchoring scroll/overflow behavior.
    pub line: usize,
    /// Column offset of the opening delimiter within that line.
    pub offset: usize,
    /// False for spans that failed validation and stay literal text.
    pub valid: bool,
}

/// Extract math spans from a slide's visible lines.
///
/// The same extraction rule applies wherever a span occurs (paragraph,
/// footnote definition, table cell); only code regions are exempt via
/// `code_mask`. Display spans may cross lines; inline spans must open
/// and close on one line. Unbalanced or empty spans are recorded as
/// invalid, warned about, and left untouched in the text.
pub fn extract_math(
    lines: &[String],
    code_mask: &[bool],
    slide_index: usize,
    warnings: &mut WarningSink,
) -> Vec<MathFormula> {
    let mut formulas = Vec::new();

    // Display pass: $$ delimiters, allowed to span lines. Consumed
    // spans are blanked out of `scratch` so the inline pass below never
    // sees their interiors.
    let mut scratch: Vec<String> = lines.to_vec();
    let mut open: Option<(usize, usize, String)> = None;
    for (line_no, line) in lines.iter().enumerate() {
        if code_mask.get(line_no).copied().unwrap_or(false) {
            continue;
        }
        let mut base = 0;
        while let Some(found) = line[base..].find("$$") {
            let at = base + found;
            match open.take() {
                None => {
                    open = Some((line_no, at, String::new()));
                }
                Some((open_line, open_offset, mut content)) => {
                    if open_line == line_no {
                        content.push_str(&line[open_offset + 2..at]);
                        blank_range(&mut scratch[open_line], open_offset, at + 2);
                    } else {
                        content.push_str(&line[..at]);
                        blank_range(&mut scratch[open_line], open_offset, usize::MAX);
                        for interior in scratch.iter_mut().take(line_no).skip(open_line + 1) {
                            *interior = " ".repeat(interior.len());
                        }
                        blank_range(&mut scratch[line_no], 0, at + 2);
                    }
                    let trimmed = content.trim().to_string();
                    let valid = !trimmed.is_empty();
                    if !valid {
                        warnings.push(Warning::MathSyntax {
                            slide: slide_index,
                            message: "empty display span".to_string(),
                        });
                    }
                    formulas.push(MathFormula {
                        content: trimmed,
                        kind: MathKind::Display,
                        line: open_line,
                        offset: open_offset,
                        valid,
                    });
                }
            }
            base = at + 2;
        }
        // Accumulate interior lines of an open display span.
        if let Some((open_line, open_offset, content)) = &mut open {
            if *open_line == line_no {
                content.push_str(&line[*open_offset + 2..]);
                content.push('\n');
            } else {
                content.push_str(line);
                content.push('\n');
            }
        }
    }
    if let Some((line, offset, _)) = open {
        warnings.push(Warning::MathSyntax {
            slide: slide_index,
            message: "unterminated $$ delimiter".to_string(),
        });
        // The unterminated opener stays literal; hide its dollars from
        // the inline pass so they are not double-reported.
        blank_range(&mut scratch[line], offset, offset + 2);
        formulas.push(MathFormula {
            content: String::new(),
            kind: MathKind::Display,
            line,
            offset,
            valid: false,
        });
    }

    // Inline pass: single $ pairs, per line, outside display spans.
    for (line_no, line) in scratch.iter().enumerate() {
        if code_mask.get(line_no).copied().unwrap_or(false) {
            continue;
        }
        scan_inline(line, line_no, slide_index, &mut formulas, warnings);
    }

    formulas.sort_by_key(|f| (f.line, f.offset));
    formulas
}

/// Overwrite `[start, end)` of a line with spaces, keeping offsets
/// stable for later scanning. `end` is clamped to the line length.
fn blank_range(line: &mut String, start: usize, end: usize) {
    let len = line.len();
    let end = end.min(len);
    if start >= end {
        return;
    }
    let mut replaced = String::with_capacity(len);
    replaced.push_str(&line[..start]);
    replaced.extend(std::iter::repeat(' ').take(end - start));
    replaced.push_str(&line[end..]);
    *line = replaced;
}

fn scan_inline(
    line: &str,
    line_no: usize,
    slide_index: usize,
    formulas: &mut Vec<MathFormula>,
    warnings: &mut WarningSink,
) {
    // Positions of single dollars, skipping $$ pairs entirely.
    let bytes = line.as_bytes();
    let mut positions: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            if i + 1 < bytes.len() && bytes[i + 1] == b'$' {
                i += 2;
                continue;
            }
            positions.push(i);
        }
        i += 1;
    }

    let mut iter = positions.chunks_exact(2);
    for pair in &mut iter {
        let (start, end) = (pair[0], pair[1]);
        let content = &line[start + 1..end];
        // A span must be non-empty and not padded with spaces at the
        // edges, which rules out prose like "costs $5 and $10".
        let valid = !content.is_empty()
            && !content.starts_with(' ')
            && !content.ends_with(' ');
        if valid {
            formulas.push(MathFormula {
                content: content.to_string(),
                kind: MathKind::Inline,
                line: line_no,
                offset: start,
                valid: true,
            });
        } else {
            warnings.push(Warning::MathSyntax {
                slide: slide_index,
                message: format!("invalid inline span at column {}", start),
            });
            formulas.push(MathFormula {
                content: content.to_string(),
                kind: MathKind::Inline,
                line: line_no,
                offset: start,
                valid: false,
            });
        }
    }
    if let [dangling] = iter.remainder() {
        warnings.push(Warning::MathSyntax {
            slide: slide_index,
            message: format!("unbalanced $ at column {}", dangling),
        });
        formulas.push(MathFormula {
            content: String::new(),
            kind: MathKind::Inline,
            line: line_no,
            offset: *dangling,
            valid: false,
        });
    }
}
