// ABOUTME: Readability-filter classification for background overlays
// ABOUTME: Decides per slide whether the contrast overlay class is attached

use crate::document::FilterMode;
use crate::media::{FilterPreference, ImagePlacement, ProcessedImage};
use serde::Serialize;

/// Advisory strength of the overlay; actual contrast measurement is a
/// client-side concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayStrength {
    Standard,
    /// Stacked background layers or an explicit `filtered` modifier.
    Strong,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadabilityDecision {
    pub overlay: bool,
    pub strength: OverlayStrength,
}

impl ReadabilityDecision {
    fn off() -> Self {
        Self {
            overlay: false,
            strength: OverlayStrength::Standard,
        }
    }

    fn on(strength: OverlayStrength) -> Self {
        Self {
            overlay: true,
            strength,
        }
    }
}

/// Decide overlay eligibility for one slide.
///
/// Precedence, most specific first: per-image `original` forces OFF,
/// per-image `filtered` forces ON, then the slide-level override, then
/// the global mode. In `auto`, the overlay applies exactly when a
/// background-context image sits behind visible text. Left/right/inline
/// images never trigger eligibility on their own.
pub fn classify(
    images: &[ProcessedImage],
    directive_background: bool,
    has_visible_text: bool,
    slide_mode: Option<FilterMode>,
    global_mode: FilterMode,
) -> ReadabilityDecision {
    let backgrounds: Vec<&ProcessedImage> = images
        .iter()
        .filter(|i| i.placement == ImagePlacement::Background)
        .collect();
    let has_background = directive_background || !backgrounds.is_empty();
    let strength = if backgrounds.len() > 1 {
        OverlayStrength::Strong
    } else {
        OverlayStrength::Standard
    };

    if backgrounds
        .iter()
        .any(|i| i.filter == FilterPreference::Original)
    {
        return ReadabilityDecision::off();
    }
    if backgrounds
        .iter()
        .any(|i| i.filter == FilterPreference::Filtered)
    {
        return ReadabilityDecision::on(OverlayStrength::Strong);
    }

    match slide_mode {
        Some(FilterMode::On) => return ReadabilityDecision::on(strength),
        Some(FilterMode::Off) => return ReadabilityDecision::off(),
        Some(FilterMode::Auto) | None => {}
    }

    match global_mode {
        FilterMode::On => ReadabilityDecision::on(strength),
        FilterMode::Off => ReadabilityDecision::off(),
        FilterMode::Auto => {
            if has_background && has_visible_text {
                ReadabilityDecision::on(strength)
            } else {
                ReadabilityDecision::off()
            }
        }
    }
}
