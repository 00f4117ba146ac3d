// ABOUTME: Non-fatal warning taxonomy for the parsing pipeline
// ABOUTME: Warnings are collected into the parse outcome and mirrored to the log

use log::warn;
use serde::Serialize;
use std::fmt;

/// A non-fatal condition encountered while processing one document.
///
/// No warning aborts processing; each names the recovery that was taken.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Warning {
    /// Unrecognized or malformed global/slide directive; ignored.
    ConfigParse { line: usize, message: String },

    /// Empty slide produced by adjacent separators; slide dropped.
    SlideSplit { message: String },

    /// Referenced media file is missing; placeholder descriptor used.
    MediaResolution { path: String },

    /// Mutually exclusive modifiers supplied together; first-listed wins.
    ModifierConflict { kept: String, dropped: String },

    /// Unbalanced or invalid math delimiters; span left as literal text.
    MathSyntax { slide: usize, message: String },

    /// Duplicate footnote label definition; the first definition wins.
    FootnoteDuplicate { label: String },

    /// Footnote reference with no definition anywhere in the document.
    FootnoteUndefined { label: String, slide: usize },

    /// Internal link target not found; link left without routing data.
    AnchorUnresolved { target: String, slide: usize },

    /// A code-highlight directive with no code block following it.
    HighlightDirectiveDiscarded { slide: usize },
}

impl Warning {
    pub fn kind(&self) -> &'static str {
        match self {
            Warning::ConfigParse { .. } => "config-parse",
            Warning::SlideSplit { .. } => "slide-split",
            Warning::MediaResolution { .. } => "media-resolution",
            Warning::ModifierConflict { .. } => "modifier-conflict",
            Warning::MathSyntax { .. } => "math-syntax",
            Warning::FootnoteDuplicate { .. } => "footnote-duplicate",
            Warning::FootnoteUndefined { .. } => "footnote-undefined",
            Warning::AnchorUnresolved { .. } => "anchor-unresolved",
            Warning::HighlightDirectiveDiscarded { .. } => "highlight-directive-discarded",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ConfigParse { line, message } => {
                write!(f, "config line {}: {}", line, message)
            }
            Warning::SlideSplit { message } => write!(f, "slide split: {}", message),
            Warning::MediaResolution { path } => {
                write!(f, "media file not found, using placeholder: {}", path)
            }
            Warning::ModifierConflict { kept, dropped } => {
                write!(f, "conflicting modifiers: kept '{}', dropped '{}'", kept, dropped)
            }
            Warning::MathSyntax { slide, message } => {
                write!(f, "slide {}: invalid math span: {}", slide, message)
            }
            Warning::FootnoteDuplicate { label } => {
                write!(f, "duplicate footnote definition [^{}], first kept", label)
            }
            Warning::FootnoteUndefined { label, slide } => {
                write!(f, "slide {}: footnote [^{}] has no definition", slide, label)
            }
            Warning::AnchorUnresolved { target, slide } => {
                write!(f, "slide {}: unresolved internal link #{}", slide, target)
            }
            Warning::HighlightDirectiveDiscarded { slide } => {
                write!(f, "slide {}: code-highlight directive has no code block", slide)
            }
        }
    }
}

/// Accumulates warnings for one document parse.
#[derive(Debug, Default)]
pub struct WarningSink {
    warnings: Vec<Warning>,
}

impl WarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    /// Number of collected warnings of the given kind.
    pub fn count_of(&self, kind: &str) -> usize {
        self.warnings.iter().filter(|w| w.kind() == kind).count()
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}
