// ABOUTME: Stage orchestration for one presentation document
// ABOUTME: Runs the parse pipeline in strict order and emits the model

use crate::code::{extract_code, CodeExtract};
use crate::directives::{scan_directives, DirectiveScan};
use crate::document::parse_document_config;
use crate::errors::{DeckError, Result};
use crate::inline::{render_fragment, RenderContext};
use crate::math::{extract_math, MathFormula};
use crate::media::{extract_media, MediaExtract};
use crate::model::{ColumnContent, ParseOutcome, PresentationModel, SlideRecord};
use crate::notes::extract_notes;
use crate::readability::classify;
use crate::resolver::{resolve_slides, AnchorTarget, SlideText};
use crate::splitter::split_slides;
use crate::warnings::WarningSink;
use log::{debug, info};
use std::fs;
use std::path::Path;

/// Parse one presentation document into the normalized model.
///
/// Stages run in strict sequence; each consumes the prior stage's
/// output. `base_dir` enables media existence probing when given.
/// This function never fails: any malformed input degrades with
/// warnings, and empty input yields a single empty slide.
pub fn parse_presentation(source: &str, base_dir: Option<&Path>) -> ParseOutcome {
    let mut warnings = WarningSink::new();

    // Global directives, then slide boundaries.
    let (config, body) = parse_document_config(source, &mut warnings);
    let slide_sources = split_slides(&body, &config, &mut warnings);
    debug!("document split into {} slides", slide_sources.len());

    // Per-slide local extraction.
    let extracts: Vec<SlideExtract> = slide_sources
        .iter()
        .enumerate()
        .map(|(index, content)| {
            extract_slide(
                content,
                index,
                config.code_language.as_deref(),
                base_dir,
                &mut warnings,
            )
        })
        .collect();

    // Global passes strictly after local extraction.
    let slide_texts: Vec<SlideText<'_>> = extracts
        .iter()
        .map(|e| SlideText {
            lines: &e.lines,
            code_mask: &e.code.mask,
        })
        .collect();
    let (resolved, footnotes, anchors) = resolve_slides(&slide_texts, &mut warnings);

    let title = anchors.entries().iter().find_map(|e| match &e.target {
        AnchorTarget::Heading { text, .. } => Some(text.clone()),
        AnchorTarget::Inline { .. } => None,
    });

    // Final assembly: readability decision and rendered fragments.
    let slides: Vec<SlideRecord> = extracts
        .into_iter()
        .zip(resolved.into_iter())
        .enumerate()
        .map(|(index, (extract, resolved))| {
            let main_end = extract
                .directives
                .column_breaks
                .first()
                .copied()
                .unwrap_or(resolved.lines.len());
            let has_visible_text = resolved.lines[..main_end]
                .iter()
                .enumerate()
                .any(|(i, line)| {
                    !extract.code.mask.get(i).copied().unwrap_or(false)
                        && !line.trim().is_empty()
                });

            let readability = classify(
                &extract.media.images,
                extract.directives.overrides.background_image.is_some()
                    || config.background_image.is_some(),
                has_visible_text,
                extract.directives.overrides.readability_filter,
                config.readability_filter,
            );

            let mut ctx = RenderContext::new(&config, &anchors, index, &resolved.link_routes);
            let main_text = resolved.lines[..main_end].join("\n");
            let body_html = render_fragment(&main_text, &mut ctx);

            let columns = column_partitions(&resolved.lines, &extract.directives.column_breaks)
                .into_iter()
                .enumerate()
                .map(|(col_index, content)| {
                    let html = render_fragment(&content, &mut ctx);
                    ColumnContent {
                        index: col_index,
                        width_share: 100.0 / extract.directives.column_breaks.len() as f32,
                        content,
                        html,
                    }
                })
                .collect();

            SlideRecord {
                index,
                content: resolved.lines.join("\n").trim().to_string(),
                notes: extract.notes,
                overrides: extract.directives.overrides,
                columns,
                images: extract.media.images,
                videos: extract.media.videos,
                audios: extract.media.audios,
                code_blocks: extract.code.blocks,
                math: extract.math,
                footnotes: resolved.footnotes,
                anchors: resolved.anchors,
                link_routes: resolved.link_routes,
                readability,
                body_html,
            }
        })
        .collect();

    info!(
        "parsed presentation: {} slides, {} footnotes, {} anchors, {} warnings",
        slides.len(),
        footnotes.len(),
        anchors.len(),
        warnings.len()
    );

    ParseOutcome {
        model: PresentationModel {
            config,
            slides,
            footnotes,
            anchors,
            title,
        },
        warnings: warnings.into_vec(),
    }
}

/// Parse a presentation from a file. An unreadable source file is the
/// one fatal condition, surfaced distinctly so a batch caller can
/// report it without losing the rest of the batch.
pub fn parse_presentation_file(path: &Path) -> Result<ParseOutcome> {
    let source = fs::read_to_string(path).map_err(|e| DeckError::SourceReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let base_dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    Ok(parse_presentation(&source, base_dir))
}

/// Intermediate per-slide state between local extraction and the
/// global passes. Each field is the output of exactly one stage.
struct SlideExtract {
    lines: Vec<String>,
    directives: DirectiveScan,
    notes: String,
    code: CodeExtract,
    media: MediaExtract,
    math: Vec<MathFormula>,
}

fn extract_slide(
    content: &str,
    index: usize,
    default_language: Option<&str>,
    base_dir: Option<&Path>,
    warnings: &mut WarningSink,
) -> SlideExtract {
    // Directive lines leave the stream first; all later positions
    // reference the cleaned line vector, which keeps its length from
    // here on (stages blank lines instead of removing them).
    let directives = scan_directives(content, index, warnings);

    let code = extract_code(
        &directives.cleaned,
        &directives.highlights,
        default_language,
        index,
        warnings,
    );

    let (notes, lines) = extract_notes(&directives.cleaned, &code.mask);

    let media = extract_media(&lines, &code.mask, base_dir, warnings);

    let math = extract_math(&media.lines, &code.mask, index, warnings);

    SlideExtract {
        lines: media.lines.clone(),
        directives,
        notes,
        code,
        media,
        math,
    }
}

/// Partition lines at the recorded `[.column]` break positions. The
/// content before the first break is the main region, not a column.
fn column_partitions(lines: &[String], breaks: &[usize]) -> Vec<String> {
    if breaks.is_empty() {
        return Vec::new();
    }
    let mut partitions = Vec::with_capacity(breaks.len());
    for (i, &start) in breaks.iter().enumerate() {
        let end = breaks.get(i + 1).copied().unwrap_or(lines.len());
        let start = start.min(lines.len());
        let end = end.min(lines.len()).max(start);
        partitions.push(lines[start..end].join("\n").trim().to_string());
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FilterMode;
    use crate::media::ImagePlacement;

    #[test]
    fn test_scenario_two_slides_with_config() {
        let outcome = parse_presentation(
            "slidenumbers: true\nfooter: Demo\n\n# Title\nBody\n\n---\n\nSecond",
            None,
        );
        let model = &outcome.model;
        assert_eq!(model.slides.len(), 2);
        assert!(model.config.slide_numbers);
        assert_eq!(model.config.footer.as_deref(), Some("Demo"));
        assert!(model.slides[0].content.contains("Title"));
        assert!(model.slides[0].content.contains("Body"));
        assert!(model.slides[1].content.contains("Second"));
        assert_eq!(model.slides[0].index, 0);
        assert_eq!(model.slides[1].index, 1);
    }

    #[test]
    fn test_empty_document_single_empty_slide() {
        let outcome = parse_presentation("", None);
        assert_eq!(outcome.model.slides.len(), 1);
        assert!(outcome.model.slides[0].content.is_empty());
    }

    #[test]
    fn test_footnote_crosses_slides() {
        let outcome = parse_presentation(
            "Claim[^ref]\n\n[^ref]: Evidence here\n\n---\n\nNothing\n\n---\n\nAgain[^ref]",
            None,
        );
        let model = &outcome.model;
        assert_eq!(model.footnotes.len(), 1);
        assert_eq!(
            model.slides[0].footnotes.get("ref").map(|s| s.as_str()),
            Some("Evidence here")
        );
        assert!(model.slides[1].footnotes.is_empty());
        assert_eq!(
            model.slides[2].footnotes.get("ref").map(|s| s.as_str()),
            Some("Evidence here")
        );
    }

    #[test]
    fn test_columns() {
        let outcome = parse_presentation(
            "# Head\n\n[.column]\n\nLeft side\n\n[.column]\n\nRight side",
            None,
        );
        let slide = &outcome.model.slides[0];
        assert_eq!(slide.columns.len(), 2);
        assert!(slide.columns[0].content.contains("Left side"));
        assert!(slide.columns[1].content.contains("Right side"));
        assert!((slide.columns[0].width_share - 50.0).abs() < f32::EPSILON);
        let total: f32 = slide.columns.iter().map(|c| c.width_share).sum();
        assert!((total - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_left_right_images_disjoint_halves() {
        let outcome = parse_presentation("![left](a.jpg)\n![right](b.jpg)", None);
        let slide = &outcome.model.slides[0];
        assert_eq!(slide.images.len(), 2);
        assert_eq!(slide.images[0].placement, ImagePlacement::Left);
        assert_eq!(slide.images[1].placement, ImagePlacement::Right);
    }

    #[test]
    fn test_readability_auto_truth_table() {
        let outcome = parse_presentation("![](bg.jpg)\n\nSome body text", None);
        assert!(outcome.model.slides[0].readability.overlay);

        let outcome = parse_presentation("![original](bg.jpg)\n\nSome body text", None);
        assert!(!outcome.model.slides[0].readability.overlay);
    }

    #[test]
    fn test_slide_divider_config_drives_splitting() {
        let outcome = parse_presentation(
            "slide-dividers: #\n\n# One\n\ntext\n\n# Two\n\nmore",
            None,
        );
        assert_eq!(outcome.model.slides.len(), 2);
    }

    #[test]
    fn test_code_highlight_round_trip() {
        let outcome = parse_presentation(
            "[.code-highlight: 2, 6-8]\n```\nl1\nl2\nl3\nl4\nl5\nl6\nl7\nl8\n```",
            None,
        );
        let block = &outcome.model.slides[0].code_blocks[0];
        assert_eq!(
            block.highlighted_lines,
            std::collections::BTreeSet::from([2, 6, 7, 8])
        );
    }

    #[test]
    fn test_title_from_first_heading() {
        let outcome = parse_presentation("# Welcome Deck\n\ntext", None);
        assert_eq!(outcome.model.title.as_deref(), Some("Welcome Deck"));
    }

    #[test]
    fn test_unsafe_link_never_clickable() {
        let outcome = parse_presentation("[click](javascript:alert(1))", None);
        let html = &outcome.model.slides[0].body_html;
        assert!(!html.contains("javascript:"));
        assert!(html.contains("click"));
    }

    #[test]
    fn test_speaker_notes_separated() {
        let outcome = parse_presentation("# S\n\n^ Mention the demo\n^ Then pause", None);
        let slide = &outcome.model.slides[0];
        assert_eq!(slide.notes, "Mention the demo\nThen pause");
        assert!(!slide.content.contains("Mention the demo"));
    }

    #[test]
    fn test_slide_overrides_flow_through() {
        let outcome = parse_presentation(
            "# A\n\n---\n\n[.hide-footer]\n[.readability-filter: off]\n# B",
            None,
        );
        let second = &outcome.model.slides[1];
        assert!(second.overrides.hide_footer);
        assert_eq!(second.overrides.readability_filter, Some(FilterMode::Off));
    }

    #[test]
    fn test_anchor_uniqueness_across_slides() {
        let outcome =
            parse_presentation("# Intro\n\n---\n\n# Intro\n\n---\n\n# Intro", None);
        let slugs: Vec<&str> = outcome
            .model
            .anchors
            .entries()
            .iter()
            .map(|e| e.slug.as_str())
            .collect();
        assert_eq!(slugs, vec!["intro", "intro-2", "intro-3"]);
    }

    #[test]
    fn test_global_background_image_config() {
        let outcome = parse_presentation("background-image: bg.png\n\nSome text", None);
        assert!(outcome.model.slides[0].readability.overlay);
    }

    #[test]
    fn test_serializable() {
        let outcome = parse_presentation("# T\n\n$x^2$\n\n```rust\nfn f() {}\n```", None);
        let json = outcome.model.to_json().expect("serialize");
        assert!(json.contains("\"slides\""));
        assert!(json.contains("\"x^2\""));
    }
}
