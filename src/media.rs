// ABOUTME: Media modifier parsing for images, video, and audio tokens
// ABOUTME: Applies Deckset bracket modifiers in a fixed composition order

use crate::warnings::{Warning, WarningSink};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;
use url::Url;

/// Where an image sits on the slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImagePlacement {
    /// Full-slide background layer (the default for bare `![](x)`).
    Background,
    /// Background layer confined to the left half of the slide.
    Left,
    /// Background layer confined to the right half of the slide.
    Right,
    /// In the content flow.
    Inline,
}

/// Text alignment for inline-context images carrying `left`/`right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageScaling {
    /// Contain within the region, no cropping.
    Fit,
    /// Cover the region, cropping as needed.
    Fill,
    /// Natural size.
    Original,
    /// Fraction of the slide width, background context only.
    Percent(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPreference {
    Filtered,
    Original,
    Unspecified,
}

/// Position of an image within a grid of adjacent inline images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridPosition {
    pub row: usize,
    pub column: usize,
    /// Number of images in this row.
    pub row_width: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedImage {
    pub path: String,
    pub title: Option<String>,
    pub placement: ImagePlacement,
    pub alignment: Option<Alignment>,
    pub scaling: ImageScaling,
    pub filter: FilterPreference,
    pub corner_radius: Option<u32>,
    pub grid: Option<GridPosition>,
    pub caption: Option<String>,
    /// True when the referenced file could not be found; rendering
    /// substitutes a placeholder.
    pub missing: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VideoSource {
    File { path: String },
    /// A YouTube embed with optional start offset in seconds.
    Youtube { id: String, start: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedVideo {
    pub source: VideoSource,
    pub placement: ImagePlacement,
    pub alignment: Option<Alignment>,
    pub scaling: ImageScaling,
    pub autoplay: bool,
    pub loop_playback: bool,
    pub muted: bool,
    /// Visual element suppressed; any audio track still plays.
    pub hidden: bool,
    pub missing: bool,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedAudio {
    pub path: String,
    pub autoplay: bool,
    pub loop_playback: bool,
    pub muted: bool,
    pub hidden: bool,
    pub missing: bool,
    pub line: usize,
}

/// Media extracted from one slide. `lines` preserves the input length
/// with consumed media text blanked, so downstream positions stay valid.
#[derive(Debug, Default)]
pub struct MediaExtract {
    pub images: Vec<ProcessedImage>,
    pub videos: Vec<ProcessedVideo>,
    pub audios: Vec<ProcessedAudio>,
    pub lines: Vec<String>,
}

static MEDIA_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*(<[^>]*>|[^)\s]+)(?:\s+"([^"]*)")?\s*\)"#).unwrap()
});
static PERCENT_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3}(?:\.\d+)?)%$").unwrap());
static CORNER_RADIUS_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^corner-radius\((\d+)\)$").unwrap());

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "webm", "avi", "mkv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac"];

/// Extract all media references from a slide's visible lines.
///
/// `code_mask[i]` marks lines inside code blocks, which are never
/// scanned. Standalone media lines are blanked; tokens embedded in
/// prose are excised from the line. Adjacent standalone inline images
/// group into grids; a lone inline image directly followed by text
/// becomes a captioned figure and the text line is consumed.
pub fn extract_media(
    lines: &[String],
    code_mask: &[bool],
    base_dir: Option<&Path>,
    warnings: &mut WarningSink,
) -> MediaExtract {
    let mut extract = MediaExtract {
        lines: lines.to_vec(),
        ..MediaExtract::default()
    };

    // First pass: find media tokens per line, classify standalone lines.
    let mut standalone: Vec<(usize, Vec<RawToken>)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if code_mask.get(idx).copied().unwrap_or(false) {
            continue;
        }
        let tokens = collect_tokens(line, idx);
        if tokens.is_empty() {
            continue;
        }
        if is_media_only(line) {
            standalone.push((idx, tokens));
            extract.lines[idx] = String::new();
        } else {
            // Embedded in prose: treat as inline context in place.
            for token in tokens {
                process_token(token, true, base_dir, &mut extract, warnings);
            }
            extract.lines[idx] = MEDIA_TOKEN.replace_all(line, "").into_owned();
        }
    }

    // Second pass: group consecutive standalone lines (no gap between)
    // whose images are all inline-context, then emit.
    let mut group: Vec<(usize, Vec<RawToken>)> = Vec::new();
    let mut prev_line: Option<usize> = None;
    for (idx, tokens) in standalone {
        let adjacent = prev_line.map(|p| idx == p + 1).unwrap_or(false);
        let inline_line = tokens.iter().all(|t| t.has_modifier("inline"));
        if !(adjacent && inline_line && group_is_inline(&group)) {
            flush_group(&mut group, base_dir, &mut extract, warnings);
        }
        group.push((idx, tokens));
        prev_line = Some(idx);
    }
    flush_group(&mut group, base_dir, &mut extract, warnings);

    // Third pass: captions. A single inline image whose next line is
    // plain text (no blank line between) takes that text as caption.
    attach_captions(&mut extract, code_mask);

    extract.images.sort_by_key(|i| i.line);
    extract.videos.sort_by_key(|v| v.line);
    extract.audios.sort_by_key(|a| a.line);
    extract
}

#[derive(Debug, Clone)]
struct RawToken {
    alt: String,
    target: String,
    title: Option<String>,
    line: usize,
}

impl RawToken {
    fn has_modifier(&self, name: &str) -> bool {
        self.alt
            .split(',')
            .any(|t| t.trim().eq_ignore_ascii_case(name))
    }
}

fn collect_tokens(line: &str, line_no: usize) -> Vec<RawToken> {
    MEDIA_TOKEN
        .captures_iter(line)
        .map(|caps| {
            let raw_target = caps[2].trim();
            let target = raw_target
                .strip_prefix('<')
                .and_then(|t| t.strip_suffix('>'))
                .unwrap_or(raw_target);
            RawToken {
                alt: caps[1].to_string(),
                target: target.to_string(),
                title: caps.get(3).map(|m| m.as_str().to_string()),
                line: line_no,
            }
        })
        .collect()
}

fn is_media_only(line: &str) -> bool {
    MEDIA_TOKEN.replace_all(line, "").trim().is_empty()
}

fn group_is_inline(group: &[(usize, Vec<RawToken>)]) -> bool {
    group
        .iter()
        .all(|(_, tokens)| tokens.iter().all(|t| t.has_modifier("inline")))
}

fn flush_group(
    group: &mut Vec<(usize, Vec<RawToken>)>,
    base_dir: Option<&Path>,
    extract: &mut MediaExtract,
    warnings: &mut WarningSink,
) {
    if group.is_empty() {
        return;
    }
    let rows: Vec<(usize, Vec<RawToken>)> = group.drain(..).collect();
    let total: usize = rows.iter().map(|(_, t)| t.len()).sum();
    let gridded = total >= 2 && rows.iter().all(|(_, t)| t.iter().all(|x| x.has_modifier("inline")));

    for (row_no, (_, tokens)) in rows.into_iter().enumerate() {
        let row_width = tokens.len();
        for (col_no, token) in tokens.into_iter().enumerate() {
            let before_images = extract.images.len();
            process_token(token, false, base_dir, extract, warnings);
            if gridded {
                // Only images participate in grids.
                if let Some(image) = extract.images.get_mut(before_images) {
                    image.grid = Some(GridPosition {
                        row: row_no,
                        column: col_no,
                        row_width,
                    });
                }
            }
        }
    }
}

fn attach_captions(extract: &mut MediaExtract, code_mask: &[bool]) {
    let mut consumed: Vec<usize> = Vec::new();
    for image in extract.images.iter_mut() {
        if image.placement != ImagePlacement::Inline || image.grid.is_some() {
            continue;
        }
        // Only standalone image lines (blanked during extraction) take
        // captions; a token embedded in prose already has its text.
        if !extract.lines[image.line].trim().is_empty() {
            continue;
        }
        let next = image.line + 1;
        if next >= extract.lines.len() || code_mask.get(next).copied().unwrap_or(false) {
            continue;
        }
        let text = extract.lines[next].trim();
        if text.is_empty() || text.starts_with("[^") || MEDIA_TOKEN.is_match(text) {
            continue;
        }
        image.caption = Some(text.to_string());
        consumed.push(next);
    }
    for idx in consumed {
        extract.lines[idx] = String::new();
    }
}

/// Modifier tokens in source order, with unrecognized alt text ignored.
#[derive(Debug, Clone, PartialEq)]
enum Modifier {
    Inline,
    Left,
    Right,
    Fit,
    Fill,
    Original,
    Filtered,
    Percent(f32),
    CornerRadius(u32),
    Autoplay,
    Loop,
    Mute,
    Unmute,
    Hide,
}

fn parse_modifiers(alt: &str) -> Vec<Modifier> {
    let mut modifiers = Vec::new();
    for token in alt.split(',') {
        let token = token.trim();
        let lower = token.to_ascii_lowercase();
        let modifier = match lower.as_str() {
            "inline" => Some(Modifier::Inline),
            "left" => Some(Modifier::Left),
            "right" => Some(Modifier::Right),
            "fit" => Some(Modifier::Fit),
            "fill" => Some(Modifier::Fill),
            "original" => Some(Modifier::Original),
            "filtered" => Some(Modifier::Filtered),
            "autoplay" => Some(Modifier::Autoplay),
            "loop" => Some(Modifier::Loop),
            "mute" => Some(Modifier::Mute),
            "unmute" => Some(Modifier::Unmute),
            "hide" => Some(Modifier::Hide),
            _ => {
                if let Some(caps) = PERCENT_TOKEN.captures(&lower) {
                    caps[1].parse::<f32>().ok().map(Modifier::Percent)
                } else if let Some(caps) = CORNER_RADIUS_TOKEN.captures(&lower) {
                    caps[1].parse::<u32>().ok().map(Modifier::CornerRadius)
                } else {
                    // Anything else is alt text, not a modifier.
                    None
                }
            }
        };
        if let Some(m) = modifier {
            modifiers.push(m);
        }
    }
    modifiers
}

fn process_token(
    token: RawToken,
    force_inline: bool,
    base_dir: Option<&Path>,
    extract: &mut MediaExtract,
    warnings: &mut WarningSink,
) {
    let mut modifiers = parse_modifiers(&token.alt);
    if force_inline && !modifiers.contains(&Modifier::Inline) {
        modifiers.insert(0, Modifier::Inline);
    }

    match classify_target(&token.target) {
        MediaKind::Youtube { id, start } => {
            let video = compose_video(
                VideoSource::Youtube { id, start },
                &modifiers,
                false,
                token.line,
                warnings,
            );
            extract.videos.push(video);
        }
        MediaKind::Video => {
            let missing = probe_missing(&token.target, base_dir, warnings);
            let video = compose_video(
                VideoSource::File {
                    path: token.target.clone(),
                },
                &modifiers,
                missing,
                token.line,
                warnings,
            );
            extract.videos.push(video);
        }
        MediaKind::Audio => {
            let missing = probe_missing(&token.target, base_dir, warnings);
            extract.audios.push(compose_audio(
                token.target,
                &modifiers,
                missing,
                token.line,
                warnings,
            ));
        }
        MediaKind::Image => {
            let missing = probe_missing(&token.target, base_dir, warnings);
            extract.images.push(compose_image(
                token, &modifiers, missing, warnings,
            ));
        }
    }
}

enum MediaKind {
    Image,
    Video,
    Audio,
    Youtube { id: String, start: Option<u32> },
}

fn classify_target(target: &str) -> MediaKind {
    if let Some((id, start)) = parse_youtube_url(target) {
        return MediaKind::Youtube { id, start };
    }
    let extension = Path::new(target)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Video
    } else if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
        MediaKind::Audio
    } else {
        MediaKind::Image
    }
}

/// Detect YouTube watch/short/embed URLs and pull out the video id and
/// optional start offset.
pub fn parse_youtube_url(target: &str) -> Option<(String, Option<u32>)> {
    let url = Url::parse(target).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtube.com" => {
            let path = url.path();
            if path == "/watch" {
                url.query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned())?
            } else if let Some(rest) = path.strip_prefix("/embed/") {
                rest.trim_end_matches('/').to_string()
            } else {
                return None;
            }
        }
        "youtu.be" => url.path().trim_matches('/').to_string(),
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }

    let start = url
        .query_pairs()
        .find(|(k, _)| k == "t" || k == "start")
        .and_then(|(_, v)| v.trim_end_matches('s').parse::<u32>().ok());
    Some((id, start))
}

fn probe_missing(target: &str, base_dir: Option<&Path>, warnings: &mut WarningSink) -> bool {
    if target.contains("://") {
        return false;
    }
    let base = match base_dir {
        Some(base) => base,
        None => return false,
    };
    if base.join(target).exists() {
        false
    } else {
        warnings.push(Warning::MediaResolution {
            path: target.to_string(),
        });
        true
    }
}

/// Apply image modifiers in the fixed order: context, placement,
/// sizing, filtering, validation. Token order only matters for
/// conflict resolution (first-listed wins), so reordering
/// non-conflicting tokens cannot change the result.
fn compose_image(
    token: RawToken,
    modifiers: &[Modifier],
    missing: bool,
    warnings: &mut WarningSink,
) -> ProcessedImage {
    // Validation of the one cross-phase conflict happens up front so
    // the fixed phases below see a consistent token bag: a percentage
    // on an inline non-fill image keeps the earlier-listed of the pair.
    let mut modifiers: Vec<Modifier> = modifiers.to_vec();
    let inline_pos = position_of(&modifiers, |m| *m == Modifier::Inline);
    let percent_pos = position_of(&modifiers, |m| matches!(m, Modifier::Percent(_)));
    if inline_pos != usize::MAX
        && percent_pos != usize::MAX
        && !modifiers.contains(&Modifier::Fill)
    {
        if inline_pos < percent_pos {
            let dropped = scaling_name(&ImageScaling::Percent(match modifiers[percent_pos] {
                Modifier::Percent(p) => p,
                _ => unreachable!(),
            }));
            warnings.push(Warning::ModifierConflict {
                kept: "inline".to_string(),
                dropped,
            });
            modifiers.retain(|m| !matches!(m, Modifier::Percent(_)));
        } else {
            warnings.push(Warning::ModifierConflict {
                kept: scaling_name(&ImageScaling::Percent(match modifiers[percent_pos] {
                    Modifier::Percent(p) => p,
                    _ => unreachable!(),
                })),
                dropped: "inline".to_string(),
            });
            modifiers.retain(|m| *m != Modifier::Inline);
        }
    }

    // Context
    let inline = modifiers.contains(&Modifier::Inline);

    // Placement
    let side = resolve_side(&modifiers, warnings);
    let (placement, alignment) = match (inline, side) {
        (true, side) => (ImagePlacement::Inline, side),
        (false, Some(Alignment::Left)) => (ImagePlacement::Left, None),
        (false, Some(Alignment::Right)) => (ImagePlacement::Right, None),
        (false, None) => (ImagePlacement::Background, None),
    };

    // Sizing
    let scaling = resolve_scaling(&modifiers, inline, warnings);

    // Filtering
    let filter = resolve_filter(&modifiers, warnings);

    let corner_radius = modifiers.iter().find_map(|m| match m {
        Modifier::CornerRadius(px) => Some(*px),
        _ => None,
    });

    ProcessedImage {
        path: token.target,
        title: token.title,
        placement,
        alignment,
        scaling,
        filter,
        corner_radius,
        grid: None,
        caption: None,
        missing,
        line: token.line,
    }
}

fn compose_video(
    source: VideoSource,
    modifiers: &[Modifier],
    missing: bool,
    line: usize,
    warnings: &mut WarningSink,
) -> ProcessedVideo {
    let inline = modifiers.contains(&Modifier::Inline);
    let side = resolve_side(modifiers, warnings);
    let (placement, alignment) = match (inline, side) {
        (true, side) => (ImagePlacement::Inline, side),
        (false, Some(Alignment::Left)) => (ImagePlacement::Left, None),
        (false, Some(Alignment::Right)) => (ImagePlacement::Right, None),
        (false, None) => (ImagePlacement::Background, None),
    };
    let scaling = resolve_scaling(modifiers, inline, warnings);

    let autoplay = modifiers.contains(&Modifier::Autoplay);
    let muted = resolve_mute(modifiers, autoplay, warnings);

    ProcessedVideo {
        source,
        placement,
        alignment,
        scaling,
        autoplay,
        loop_playback: modifiers.contains(&Modifier::Loop),
        muted,
        hidden: modifiers.contains(&Modifier::Hide),
        missing,
        line,
    }
}

fn compose_audio(
    path: String,
    modifiers: &[Modifier],
    missing: bool,
    line: usize,
    warnings: &mut WarningSink,
) -> ProcessedAudio {
    let autoplay = modifiers.contains(&Modifier::Autoplay);
    ProcessedAudio {
        path,
        autoplay,
        loop_playback: modifiers.contains(&Modifier::Loop),
        muted: resolve_explicit_mute(modifiers, warnings).unwrap_or(false),
        hidden: modifiers.contains(&Modifier::Hide),
        missing,
        line,
    }
}

/// Autoplaying video is muted unless explicitly overridden, matching
/// browser autoplay-eligibility policy.
fn resolve_mute(modifiers: &[Modifier], autoplay: bool, warnings: &mut WarningSink) -> bool {
    match resolve_explicit_mute(modifiers, warnings) {
        Some(explicit) => explicit,
        None => autoplay,
    }
}

fn resolve_explicit_mute(modifiers: &[Modifier], warnings: &mut WarningSink) -> Option<bool> {
    let mute_pos = position_of(modifiers, |m| *m == Modifier::Mute);
    let unmute_pos = position_of(modifiers, |m| *m == Modifier::Unmute);
    match (mute_pos, unmute_pos) {
        (usize::MAX, usize::MAX) => None,
        (m, u) if m < u => {
            if u != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "mute".to_string(),
                    dropped: "unmute".to_string(),
                });
            }
            Some(true)
        }
        _ => {
            if mute_pos != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "unmute".to_string(),
                    dropped: "mute".to_string(),
                });
            }
            Some(false)
        }
    }
}

fn resolve_side(modifiers: &[Modifier], warnings: &mut WarningSink) -> Option<Alignment> {
    let left = position_of(modifiers, |m| *m == Modifier::Left);
    let right = position_of(modifiers, |m| *m == Modifier::Right);
    match (left, right) {
        (usize::MAX, usize::MAX) => None,
        (l, r) if l < r => {
            if r != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "left".to_string(),
                    dropped: "right".to_string(),
                });
            }
            Some(Alignment::Left)
        }
        _ => {
            if left != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "right".to_string(),
                    dropped: "left".to_string(),
                });
            }
            Some(Alignment::Right)
        }
    }
}

fn resolve_scaling(
    modifiers: &[Modifier],
    inline: bool,
    warnings: &mut WarningSink,
) -> ImageScaling {
    let mut chosen: Option<(usize, ImageScaling)> = None;
    for (idx, modifier) in modifiers.iter().enumerate() {
        let candidate = match modifier {
            Modifier::Fit => Some(ImageScaling::Fit),
            Modifier::Fill => Some(ImageScaling::Fill),
            Modifier::Original => Some(ImageScaling::Original),
            Modifier::Percent(p) => Some(ImageScaling::Percent(clamp_percent(*p, warnings))),
            _ => None,
        };
        if let Some(scaling) = candidate {
            match &chosen {
                None => chosen = Some((idx, scaling)),
                Some((_, kept)) => warnings.push(Warning::ModifierConflict {
                    kept: scaling_name(kept),
                    dropped: scaling_name(&scaling),
                }),
            }
        }
    }
    match chosen {
        Some((_, scaling)) => scaling,
        // Background images cover the slide; inline images keep their
        // natural size.
        None if inline => ImageScaling::Original,
        None => ImageScaling::Fill,
    }
}

fn clamp_percent(value: f32, warnings: &mut WarningSink) -> f32 {
    if (5.0..=500.0).contains(&value) {
        value
    } else {
        let clamped = value.clamp(5.0, 500.0);
        warnings.push(Warning::ModifierConflict {
            kept: format!("{}%", clamped),
            dropped: format!("{}%", value),
        });
        clamped
    }
}

fn scaling_name(scaling: &ImageScaling) -> String {
    match scaling {
        ImageScaling::Fit => "fit".to_string(),
        ImageScaling::Fill => "fill".to_string(),
        ImageScaling::Original => "original".to_string(),
        ImageScaling::Percent(p) => format!("{}%", p),
    }
}

fn resolve_filter(modifiers: &[Modifier], warnings: &mut WarningSink) -> FilterPreference {
    let filtered = position_of(modifiers, |m| *m == Modifier::Filtered);
    let original = position_of(modifiers, |m| *m == Modifier::Original);
    match (filtered, original) {
        (usize::MAX, usize::MAX) => FilterPreference::Unspecified,
        (f, o) if f < o => {
            if o != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "filtered".to_string(),
                    dropped: "original".to_string(),
                });
            }
            FilterPreference::Filtered
        }
        _ => {
            if filtered != usize::MAX {
                warnings.push(Warning::ModifierConflict {
                    kept: "original".to_string(),
                    dropped: "filtered".to_string(),
                });
            }
            FilterPreference::Original
        }
    }
}

fn position_of(modifiers: &[Modifier], pred: impl Fn(&Modifier) -> bool) -> usize {
    modifiers
        .iter()
        .position(pred)
        .unwrap_or(usize::MAX)
}
