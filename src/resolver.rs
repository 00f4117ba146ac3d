// ABOUTME: Cross-slide resolution of footnotes and anchors
// ABOUTME: Two global passes over all slides, run after per-slide extraction

use crate::warnings::{Warning, WarningSink};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

static FOOTNOTE_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[\^([^\]\s]+)\]:\s*(.*)$").unwrap());
static FOOTNOTE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^([^\]\s]+)\]").unwrap());
static INLINE_ANCHOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a\s+name="([^"]+)"\s*/?\s*>"#).unwrap());
static INTERNAL_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\(#([A-Za-z0-9\-_]+)\)").unwrap());

/// Document-scoped footnote definitions. Labels are unique across the
/// whole document; the first definition of a label wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FootnoteTable {
    entries: BTreeMap<String, String>,
}

impl FootnoteTable {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries.get(label).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

/// What an anchor slug points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnchorTarget {
    Heading { depth: u8, text: String },
    Inline { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnchorEntry {
    pub slug: String,
    pub slide: usize,
    pub target: AnchorTarget,
}

/// Document-scoped index of anchor slugs, globally unique, collisions
/// suffixed `-2`, `-3`, ... in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnchorIndex {
    entries: Vec<AnchorEntry>,
    #[serde(skip)]
    by_slug: HashMap<String, usize>,
}

impl AnchorIndex {
    pub fn slide_of(&self, slug: &str) -> Option<usize> {
        self.by_slug.get(slug).map(|&i| self.entries[i].slide)
    }

    pub fn entries(&self) -> &[AnchorEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, slug: String, slide: usize, target: AnchorTarget) -> String {
        let unique = self.dedupe(slug);
        self.by_slug.insert(unique.clone(), self.entries.len());
        self.entries.push(AnchorEntry {
            slug: unique.clone(),
            slide,
            target,
        });
        unique
    }

    fn dedupe(&self, slug: String) -> String {
        if !self.by_slug.contains_key(&slug) {
            return slug;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}-{}", slug, n);
            if !self.by_slug.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Per-slide inputs to resolution: the visible lines (post-extraction)
/// and the code mask for them.
pub struct SlideText<'a> {
    pub lines: &'a [String],
    pub code_mask: &'a [bool],
}

/// Per-slide outputs of resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedSlide {
    /// Cleaned lines with footnote-definition lines blanked.
    pub lines: Vec<String>,
    /// Labels referenced on this slide, resolved to definition text.
    pub footnotes: BTreeMap<String, String>,
    /// Anchor slugs owned by this slide.
    pub anchors: BTreeSet<String>,
    /// Internal link targets on this slide mapped to owning slide index.
    pub link_routes: BTreeMap<String, usize>,
}

/// Run both global resolution passes over all slides.
///
/// Pass one collects every `[^label]: text` definition into one
/// document-wide table (first-seen wins) and materializes referenced
/// definitions into each referencing slide. Pass two builds the anchor
/// index from headings and `<a name>` tags, then maps each internal
/// `#slug` link to its owning slide; unresolved links keep no routing
/// data and are warned about.
pub fn resolve_slides(
    slides: &[SlideText<'_>],
    warnings: &mut WarningSink,
) -> (Vec<ResolvedSlide>, FootnoteTable, AnchorIndex) {
    let mut resolved: Vec<ResolvedSlide> = slides
        .iter()
        .map(|s| ResolvedSlide {
            lines: s.lines.to_vec(),
            ..ResolvedSlide::default()
        })
        .collect();

    // Footnote definitions, document order.
    let mut table = FootnoteTable::default();
    for (slide_no, slide) in slides.iter().enumerate() {
        for (line_no, line) in slide.lines.iter().enumerate() {
            if slide.code_mask.get(line_no).copied().unwrap_or(false) {
                continue;
            }
            if let Some(caps) = FOOTNOTE_DEF.captures(line.trim()) {
                let label = caps[1].to_string();
                let text = caps[2].trim().to_string();
                if table.entries.contains_key(&label) {
                    warnings.push(Warning::FootnoteDuplicate { label });
                } else {
                    table.entries.insert(label, text);
                }
                resolved[slide_no].lines[line_no] = String::new();
            }
        }
    }

    // Footnote references resolve against the single global table; the
    // same definition materializes on every slide that references it.
    for (slide_no, out) in resolved.iter_mut().enumerate() {
        let mask = slides[slide_no].code_mask;
        for (line_no, line) in out.lines.iter().enumerate() {
            if mask.get(line_no).copied().unwrap_or(false) {
                continue;
            }
            for caps in FOOTNOTE_REF.captures_iter(line) {
                let label = caps[1].to_string();
                match table.get(&label) {
                    Some(text) => {
                        out.footnotes.insert(label, text.to_string());
                    }
                    None => {
                        if !out.footnotes.contains_key(&label) {
                            warnings.push(Warning::FootnoteUndefined {
                                label,
                                slide: slide_no,
                            });
                        }
                    }
                }
            }
        }
    }

    // Anchors: heading slugs and explicit inline anchors, in document
    // order so collision suffixes are deterministic.
    let mut index = AnchorIndex::default();
    for (slide_no, slide) in slides.iter().enumerate() {
        for (line_no, line) in slide.lines.iter().enumerate() {
            if slide.code_mask.get(line_no).copied().unwrap_or(false) {
                continue;
            }
            if let Some(depth) = crate::splitter::heading_depth(line) {
                let text = heading_text(line);
                if !text.is_empty() {
                    let slug = index.insert(
                        slugify(&text),
                        slide_no,
                        AnchorTarget::Heading { depth, text },
                    );
                    resolved[slide_no].anchors.insert(slug);
                }
            }
            for caps in INLINE_ANCHOR.captures_iter(line) {
                let name = caps[1].to_string();
                let slug = index.insert(
                    name.clone(),
                    slide_no,
                    AnchorTarget::Inline { name },
                );
                resolved[slide_no].anchors.insert(slug);
            }
        }
    }

    // Internal links pick up the owning slide as routing data.
    for (slide_no, out) in resolved.iter_mut().enumerate() {
        let mask = slides[slide_no].code_mask;
        let mut routes: BTreeMap<String, usize> = BTreeMap::new();
        for (line_no, line) in out.lines.iter().enumerate() {
            if mask.get(line_no).copied().unwrap_or(false) {
                continue;
            }
            for caps in INTERNAL_LINK.captures_iter(line) {
                let target = caps[1].to_string();
                match index.slide_of(&target) {
                    Some(owner) => {
                        routes.insert(target, owner);
                    }
                    None => {
                        if !routes.contains_key(&target) {
                            warnings.push(Warning::AnchorUnresolved {
                                target,
                                slide: slide_no,
                            });
                        }
                    }
                }
            }
        }
        out.link_routes = routes;
    }

    (resolved, table, index)
}

/// Heading text with markers and a leading `[fit]` tag stripped.
pub fn heading_text(line: &str) -> String {
    let t = line.trim_start();
    let stripped = t.trim_start_matches('#').trim();
    stripped
        .strip_prefix("[fit]")
        .map(|s| s.trim())
        .unwrap_or(stripped)
        .to_string()
}

/// Normalize text into a URL-safe slug: lowercase, non-alphanumeric
/// runs become single hyphens, edges trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_hyphen = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                slug.push(lc);
            }
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "section".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(texts: &[&str]) -> (Vec<Vec<String>>, Vec<Vec<bool>>) {
        let lines: Vec<Vec<String>> = texts
            .iter()
            .map(|t| t.lines().map(|l| l.to_string()).collect())
            .collect();
        let masks: Vec<Vec<bool>> = lines.iter().map(|l| vec![false; l.len()]).collect();
        (lines, masks)
    }

    fn resolve(texts: &[&str]) -> (Vec<ResolvedSlide>, FootnoteTable, AnchorIndex, WarningSink) {
        let (lines, masks) = make(texts);
        let slides: Vec<SlideText<'_>> = lines
            .iter()
            .zip(masks.iter())
            .map(|(l, m)| SlideText {
                lines: l,
                code_mask: m,
            })
            .collect();
        let mut warnings = WarningSink::new();
        let (resolved, table, index) = resolve_slides(&slides, &mut warnings);
        (resolved, table, index, warnings)
    }

    #[test]
    fn test_footnote_defined_on_one_slide_used_on_another() {
        let (resolved, table, _, _) = resolve(&[
            "Point[^src]\n\n[^src]: Smith 2019",
            "Nothing here",
            "Also cites[^src]",
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(
            resolved[0].footnotes.get("src").map(|s| s.as_str()),
            Some("Smith 2019")
        );
        assert!(resolved[1].footnotes.is_empty());
        assert_eq!(
            resolved[2].footnotes.get("src").map(|s| s.as_str()),
            Some("Smith 2019")
        );
    }

    #[test]
    fn test_definition_lines_removed_from_content() {
        let (resolved, _, _, _) = resolve(&["Text[^a]\n[^a]: def"]);
        assert_eq!(resolved[0].lines[1], "");
        assert_eq!(resolved[0].lines[0], "Text[^a]");
    }

    #[test]
    fn test_duplicate_definition_first_wins() {
        let (resolved, table, _, warnings) =
            resolve(&["[^n]: first\nuse[^n]", "[^n]: second"]);
        assert_eq!(table.get("n"), Some("first"));
        assert_eq!(
            resolved[0].footnotes.get("n").map(|s| s.as_str()),
            Some("first")
        );
        assert_eq!(warnings.count_of("footnote-duplicate"), 1);
    }

    #[test]
    fn test_undefined_reference_warns() {
        let (resolved, _, _, warnings) = resolve(&["ghost[^nope]"]);
        assert!(resolved[0].footnotes.is_empty());
        assert_eq!(warnings.count_of("footnote-undefined"), 1);
    }

    #[test]
    fn test_anchor_collision_suffixing() {
        let (_, _, index, _) = resolve(&["# Intro", "# Intro\n\n# Intro"]);
        let slugs: Vec<&str> = index.entries().iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["intro", "intro-2", "intro-3"]);
        assert_eq!(index.slide_of("intro"), Some(0));
        assert_eq!(index.slide_of("intro-3"), Some(1));
    }

    #[test]
    fn test_inline_anchor_tags() {
        let (_, _, index, _) = resolve(&[r#"Text <a name="jump-here"> more"#]);
        assert_eq!(index.slide_of("jump-here"), Some(0));
    }

    #[test]
    fn test_internal_link_routing() {
        let (resolved, _, _, warnings) =
            resolve(&["# Setup", "See [setup](#setup) again"]);
        assert_eq!(resolved[1].link_routes.get("setup"), Some(&0));
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unresolved_link_warns_but_does_not_fail() {
        let (resolved, _, _, warnings) = resolve(&["[go](#missing)"]);
        assert!(resolved[0].link_routes.is_empty());
        assert_eq!(warnings.count_of("anchor-unresolved"), 1);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Spaces   galore  "), "spaces-galore");
        assert_eq!(slugify("Ünïcode Héading"), "ünïcode-héading");
        assert_eq!(slugify("!!!"), "section");
        assert_eq!(slugify("CamelCase99"), "camelcase99");
    }

    #[test]
    fn test_heading_text_strips_fit_marker() {
        assert_eq!(heading_text("# [fit] Big Title"), "Big Title");
        assert_eq!(heading_text("## Normal"), "Normal");
    }

    #[test]
    fn test_reference_in_heading_and_table_cell() {
        let (resolved, _, _, _) = resolve(&[
            "# Claim[^1]\n\n| a | b[^1] |\n|---|---|\n| 1 | 2 |\n\n[^1]: proof",
        ]);
        assert_eq!(
            resolved[0].footnotes.get("1").map(|s| s.as_str()),
            Some("proof")
        );
    }
}
