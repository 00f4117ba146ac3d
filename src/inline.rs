// ABOUTME: Visible-text rendering: markdown to sanitized HTML fragments
// ABOUTME: Wraps comrak and applies link-scheme and raw-HTML policies

use crate::document::DocumentConfig;
use crate::resolver::AnchorIndex;
use comrak::{markdown_to_html, ComrakOptions};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::collections::VecDeque;

// Tag-shaped only: a bare `<` in prose (math, comparisons) is left alone.
static RAW_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[A-Za-z][^<>]*>").unwrap());
static ALLOWED_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^<(?:br\s*/?|a\s+name="[^"]*"\s*/?|/a)>$"#).unwrap()
});
static ANCHOR_ELEMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="([^"]*)"(?:\s+title="[^"]*")?>(.*?)</a>"#).unwrap());
static HEADING_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<h([1-6])>").unwrap());
static FOOTNOTE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\^([^\]\s]+)\]").unwrap());
static LIST_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(ul|ol)>").unwrap());

/// Per-slide context for rendering visible text to HTML.
pub struct RenderContext<'a> {
    pub config: &'a DocumentConfig,
    pub anchor_index: &'a AnchorIndex,
    pub slide_index: usize,
    pub link_routes: &'a BTreeMap<String, usize>,
    /// Heading slugs for this slide in document order, consumed as
    /// headings are rendered so ids match the anchor index.
    slugs: VecDeque<String>,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        config: &'a DocumentConfig,
        anchor_index: &'a AnchorIndex,
        slide_index: usize,
        link_routes: &'a BTreeMap<String, usize>,
    ) -> Self {
        let slugs = anchor_index
            .entries()
            .iter()
            .filter(|e| {
                e.slide == slide_index
                    && matches!(e.target, crate::resolver::AnchorTarget::Heading { .. })
            })
            .map(|e| e.slug.clone())
            .collect();
        Self {
            config,
            anchor_index,
            slide_index,
            link_routes,
            slugs,
        }
    }
}

/// Render one block of slide text (main content or a column) to an
/// HTML fragment.
///
/// The pass order matters: raw HTML is reduced to the allowed subset
/// before comrak runs, footnote references become superscript markers,
/// then comrak's output gets link-scheme filtering, heading ids, and
/// build-list classes.
pub fn render_fragment(text: &str, ctx: &mut RenderContext<'_>) -> String {
    let sanitized = sanitize_raw_html(text);
    let (marked, fit_flags) = mark_fit_headings(&sanitized, ctx.config);
    let with_refs = replace_footnote_refs(&marked);

    let mut options = ComrakOptions::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    // Raw HTML was already reduced to the allowed subset.
    options.render.unsafe_ = true;
    let html = markdown_to_html(&with_refs, &options);

    let html = filter_links(&html, ctx);
    let html = assign_heading_ids(&html, ctx, &fit_flags);
    apply_build_lists(&html, ctx.config)
}

/// Reduce raw HTML to the allowed passthrough subset: `<br/>` and
/// `<a name="...">` (with its closing tag) survive; every other tag is
/// stripped, leaving its text content. Code spans and fenced blocks
/// are exempt.
pub fn sanitize_raw_html(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut fence_marker = "```";

    for line in text.lines() {
        let trimmed = line.trim_start();
        if in_fence {
            out.push(line.to_string());
            if trimmed.starts_with(fence_marker) {
                in_fence = false;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence_marker = if trimmed.starts_with("```") { "```" } else { "~~~" };
            in_fence = true;
            out.push(line.to_string());
            continue;
        }
        out.push(sanitize_line(line));
    }
    out.join("\n")
}

fn sanitize_line(line: &str) -> String {
    // Inline code spans keep their contents verbatim.
    let mut result = String::with_capacity(line.len());
    for (i, segment) in line.split('`').enumerate() {
        if i > 0 {
            result.push('`');
        }
        if i % 2 == 1 {
            result.push_str(segment);
        } else {
            result.push_str(&RAW_TAG.replace_all(segment, |caps: &Captures| {
                let tag = caps.get(0).map(|m| m.as_str()).unwrap_or("");
                if ALLOWED_TAG.is_match(tag) {
                    tag.to_string()
                } else {
                    String::new()
                }
            }));
        }
    }
    result
}

/// Strip `[fit]` markers from heading lines and record, per heading in
/// order, whether it renders fit-to-slide (marker or configured depth).
fn mark_fit_headings(text: &str, config: &DocumentConfig) -> (String, Vec<bool>) {
    let mut fit_flags = Vec::new();
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut fence_marker = "```";

    for line in text.lines() {
        let trimmed = line.trim_start();
        if in_fence {
            out.push(line.to_string());
            if trimmed.starts_with(fence_marker) {
                in_fence = false;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence_marker = if trimmed.starts_with("```") { "```" } else { "~~~" };
            in_fence = true;
            out.push(line.to_string());
            continue;
        }
        match crate::splitter::heading_depth(line) {
            Some(depth) => {
                let hashes = "#".repeat(depth as usize);
                let rest = trimmed[depth as usize..].trim();
                let (rest, marked_fit) = match rest.strip_prefix("[fit]") {
                    Some(stripped) => (stripped.trim(), true),
                    None => (rest, false),
                };
                fit_flags.push(marked_fit || config.fit_headers.contains(&depth));
                out.push(format!("{} {}", hashes, rest));
            }
            None => out.push(line.to_string()),
        }
    }
    (out.join("\n"), fit_flags)
}

fn replace_footnote_refs(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut fence_marker = "```";

    for line in text.lines() {
        let trimmed = line.trim_start();
        if in_fence {
            out.push(line.to_string());
            if trimmed.starts_with(fence_marker) {
                in_fence = false;
            }
            continue;
        }
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            fence_marker = if trimmed.starts_with("```") { "```" } else { "~~~" };
            in_fence = true;
            out.push(line.to_string());
            continue;
        }
        // Inline code spans keep their bracket text verbatim.
        let mut replaced = String::with_capacity(line.len());
        for (i, segment) in line.split('`').enumerate() {
            if i > 0 {
                replaced.push('`');
            }
            if i % 2 == 1 {
                replaced.push_str(segment);
            } else {
                replaced.push_str(&FOOTNOTE_REF.replace_all(segment, |caps: &Captures| {
                    format!(
                        r#"<sup class="footnote" data-label="{}">{}</sup>"#,
                        &caps[1], &caps[1]
                    )
                }));
            }
        }
        out.push(replaced);
    }
    out.join("\n")
}

/// Allowed link schemes: http, https, mailto, tel, and `#` anchors.
/// Anything else is rendered as its text, never as a clickable element.
/// Resolvable `#` anchors gain the owning slide index as routing data.
fn filter_links(html: &str, ctx: &RenderContext<'_>) -> String {
    ANCHOR_ELEMENT
        .replace_all(html, |caps: &Captures| {
            let href = &caps[1];
            let text = &caps[2];
            if let Some(slug) = href.strip_prefix('#') {
                return match ctx.link_routes.get(slug) {
                    Some(slide) => format!(
                        r##"<a href="#{}" data-slide="{}">{}</a>"##,
                        slug, slide, text
                    ),
                    // Unresolved anchors stay inert: no routing data.
                    None => format!(r##"<a href="#{}">{}</a>"##, slug, text),
                };
            }
            let allowed = ["http://", "https://", "mailto:", "tel:"]
                .iter()
                .any(|scheme| href.to_ascii_lowercase().starts_with(scheme));
            if allowed {
                format!(r#"<a href="{}">{}</a>"#, href, text)
            } else {
                text.to_string()
            }
        })
        .into_owned()
}

fn assign_heading_ids(
    html: &str,
    ctx: &mut RenderContext<'_>,
    fit_flags: &[bool],
) -> String {
    let mut heading_no = 0usize;
    HEADING_OPEN
        .replace_all(html, |caps: &Captures| {
            let level = &caps[1];
            let fit = fit_flags.get(heading_no).copied().unwrap_or(false);
            heading_no += 1;
            let id_attr = match ctx.slugs.pop_front() {
                Some(slug) => format!(r#" id="{}""#, slug),
                None => String::new(),
            };
            if fit {
                format!(r#"<h{}{} class="fit">"#, level, id_attr)
            } else {
                format!("<h{}{}>", level, id_attr)
            }
        })
        .into_owned()
}

fn apply_build_lists(html: &str, config: &DocumentConfig) -> String {
    if !config.build_lists {
        return html.to_string();
    }
    LIST_OPEN
        .replace_all(html, |caps: &Captures| {
            format!(r#"<{} class="build">"#, &caps[1])
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warnings::WarningSink;

    fn render(text: &str) -> String {
        render_with_config(text, &DocumentConfig::default())
    }

    fn render_with_config(text: &str, config: &DocumentConfig) -> String {
        let index = AnchorIndex::default();
        let routes = BTreeMap::new();
        let mut ctx = RenderContext::new(config, &index, 0, &routes);
        render_fragment(text, &mut ctx)
    }

    #[test]
    fn test_basic_markdown() {
        let html = render("# Title\n\nSome **bold** text");
        assert!(html.contains("<h1"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_table_rendering() {
        let html = render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_unsafe_link_scheme_becomes_text() {
        let html = render("[click](javascript:alert(1))");
        assert!(!html.contains("<a href=\"javascript"));
        assert!(html.contains("click"));
    }

    #[test]
    fn test_allowed_schemes_survive() {
        let html = render("[site](https://example.com) [mail](mailto:a@b.c) [call](tel:+1555)");
        assert!(html.contains(r#"<a href="https://example.com">site</a>"#));
        assert!(html.contains(r#"<a href="mailto:a@b.c">mail</a>"#));
        assert!(html.contains(r#"<a href="tel:+1555">call</a>"#));
    }

    #[test]
    fn test_relative_url_becomes_text() {
        let html = render("[other](other.html)");
        assert!(!html.contains("<a href"));
        assert!(html.contains("other"));
    }

    #[test]
    fn test_anchor_link_gains_routing_data() {
        let mut warnings = WarningSink::new();
        let lines = vec!["# Setup".to_string()];
        let mask = vec![false];
        let slides = vec![crate::resolver::SlideText {
            lines: &lines,
            code_mask: &mask,
        }];
        let (_, _, index) = crate::resolver::resolve_slides(&slides, &mut warnings);
        let config = DocumentConfig::default();
        let routes = BTreeMap::from([("setup".to_string(), 0usize)]);
        let mut ctx = RenderContext::new(&config, &index, 0, &routes);
        let html = render_fragment("[go](#setup)", &mut ctx);
        assert!(html.contains(r##"<a href="#setup" data-slide="0">go</a>"##));
    }

    #[test]
    fn test_raw_html_stripped_to_text() {
        let html = render("before <div onclick=\"evil()\">inner</div> after");
        assert!(!html.contains("<div"));
        assert!(html.contains("inner"));
    }

    #[test]
    fn test_br_and_named_anchor_survive() {
        let html = render("line one<br/>line two <a name=\"spot\"></a>");
        assert!(html.contains("<br/>"));
        assert!(html.contains(r#"<a name="spot">"#));
    }

    #[test]
    fn test_code_span_exempt_from_sanitization() {
        let html = render("use `<div>` for layout");
        assert!(html.contains("&lt;div&gt;"));
    }

    #[test]
    fn test_fenced_code_exempt_from_sanitization() {
        let html = render("```html\n<div class=\"x\">keep</div>\n```");
        assert!(html.contains("&lt;div"));
    }

    #[test]
    fn test_heading_ids_from_anchor_index() {
        let mut warnings = WarningSink::new();
        let lines = vec!["# Intro".to_string(), "# Intro".to_string()];
        let mask = vec![false, false];
        let slides = vec![crate::resolver::SlideText {
            lines: &lines,
            code_mask: &mask,
        }];
        let (_, _, index) = crate::resolver::resolve_slides(&slides, &mut warnings);
        let config = DocumentConfig::default();
        let routes = BTreeMap::new();
        let mut ctx = RenderContext::new(&config, &index, 0, &routes);
        let html = render_fragment("# Intro\n\n# Intro", &mut ctx);
        assert!(html.contains(r#"<h1 id="intro">"#));
        assert!(html.contains(r#"<h1 id="intro-2">"#));
    }

    #[test]
    fn test_fit_marker_heading() {
        let html = render("# [fit] Huge");
        assert!(html.contains(r#"class="fit""#));
        assert!(html.contains("Huge"));
        assert!(!html.contains("[fit]"));
    }

    #[test]
    fn test_fit_headers_config() {
        let config = DocumentConfig {
            fit_headers: std::collections::BTreeSet::from([1]),
            ..DocumentConfig::default()
        };
        let html = render_with_config("# Title\n\n## Sub", &config);
        assert!(html.contains(r#"<h1 class="fit""#) || html.contains(r#"class="fit""#));
        assert!(!html.contains(r#"<h2 class="fit""#));
    }

    #[test]
    fn test_footnote_ref_becomes_sup() {
        let html = render("claim[^1]");
        assert!(html.contains(r#"<sup class="footnote" data-label="1">1</sup>"#));
    }

    #[test]
    fn test_build_lists_class() {
        let config = DocumentConfig {
            build_lists: true,
            ..DocumentConfig::default()
        };
        let html = render_with_config("- one\n- two", &config);
        assert!(html.contains(r#"<ul class="build">"#));
    }
}
