// ABOUTME: Normalized presentation model emitted by the parsing pipeline
// ABOUTME: One serializable structure consumed by page assembly and the CLI

use crate::code::ProcessedCodeBlock;
use crate::directives::SlideOverrides;
use crate::document::DocumentConfig;
use crate::math::MathFormula;
use crate::media::{ProcessedAudio, ProcessedImage, ProcessedVideo};
use crate::readability::ReadabilityDecision;
use crate::resolver::{AnchorIndex, FootnoteTable};
use crate::warnings::Warning;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// One column of a multi-column slide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnContent {
    pub index: usize,
    /// Raw markdown content of the column.
    pub content: String,
    /// Share of the slide width in percent; siblings split evenly.
    pub width_share: f32,
    /// Rendered HTML fragment.
    pub html: String,
}

/// The finalized per-slide record. Built up by the pipeline stages and
/// never mutated after emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideRecord {
    /// 0-based position in the presentation, contiguous.
    pub index: usize,
    /// Visible content with directives stripped, raw markdown.
    pub content: String,
    /// Speaker notes, raw markdown; empty when none.
    pub notes: String,
    pub overrides: SlideOverrides,
    pub columns: Vec<ColumnContent>,
    pub images: Vec<ProcessedImage>,
    pub videos: Vec<ProcessedVideo>,
    pub audios: Vec<ProcessedAudio>,
    pub code_blocks: Vec<ProcessedCodeBlock>,
    pub math: Vec<MathFormula>,
    /// Footnote labels referenced on this slide, resolved.
    pub footnotes: BTreeMap<String, String>,
    /// Anchor slugs this slide owns.
    pub anchors: BTreeSet<String>,
    /// Internal link targets on this slide, mapped to owning slides.
    pub link_routes: BTreeMap<String, usize>,
    pub readability: ReadabilityDecision,
    /// Rendered HTML for the main (non-column) content region.
    pub body_html: String,
}

/// The full normalized output for one presentation document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationModel {
    pub config: DocumentConfig,
    pub slides: Vec<SlideRecord>,
    pub footnotes: FootnoteTable,
    pub anchors: AnchorIndex,
    /// First heading in the document, used for page titles.
    pub title: Option<String>,
}

impl PresentationModel {
    pub fn title_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.title.as_deref().unwrap_or(fallback)
    }

    pub fn slide_count(&self) -> usize {
        self.slides.len()
    }

    pub fn to_json(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> crate::errors::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A parsed document plus everything non-fatal that happened on the way.
#[derive(Debug)]
pub struct ParseOutcome {
    pub model: PresentationModel,
    pub warnings: Vec<Warning>,
}

impl ParseOutcome {
    pub fn warning_count(&self, kind: &str) -> usize {
        self.warnings.iter().filter(|w| w.kind() == kind).count()
    }
}
