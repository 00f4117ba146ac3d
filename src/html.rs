// ABOUTME: HTML page assembly for the deckfold application
// ABOUTME: Builds presentation pages and the homepage from normalized models

use crate::assets::ThemeAsset;
use crate::config::Config;
use crate::errors::{DeckError, Result};
use crate::media::{ImagePlacement, ImageScaling, ProcessedImage, VideoSource};
use crate::model::{PresentationModel, SlideRecord};
use crate::readability::OverlayStrength;
use crate::scanner::PresentationEntry;
use crate::utils::escape_html;
use comrak::{markdown_to_html, ComrakOptions};
use log::info;
use std::fs;
use std::path::Path;

/// Assemble the full HTML page for one presentation.
pub fn render_presentation_page(
    model: &PresentationModel,
    css_assets: &[ThemeAsset],
    js_assets: &[ThemeAsset],
    config: &Config,
) -> Result<String> {
    let title = model.title_or(&config.site_title);
    info!("Assembling page: {}", title);

    let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("<title>{}</title>\n", escape_html(title)));

    for css in css_assets {
        match css.tag(config.embed_resources, config.fetch_timeout_ms) {
            Ok(tag) => {
                html.push_str(&tag);
                html.push('\n');
            }
            Err(e) => {
                info!("Warning: Failed to include CSS asset {}: {}", css.path, e);
                // Continue with other assets rather than failing the page
            }
        }
    }

    html.push_str("</head>\n<body>\n");
    if let Some(theme) = &model.config.theme {
        html.push_str(&format!(
            "<main class=\"deck theme-{}\">\n",
            escape_html(&crate::resolver::slugify(theme))
        ));
    } else {
        html.push_str("<main class=\"deck\">\n");
    }

    let total = model.slides.len();
    for slide in &model.slides {
        html.push_str(&render_slide(slide, model, total));
    }

    html.push_str("</main>\n");

    for js in js_assets {
        match js.tag(config.embed_resources, config.fetch_timeout_ms) {
            Ok(tag) => {
                html.push_str(&tag);
                html.push('\n');
            }
            Err(e) => {
                info!(
                    "Warning: Failed to include JavaScript asset {}: {}",
                    js.path, e
                );
            }
        }
    }

    html.push_str("</body>\n</html>");
    Ok(html)
}

fn render_slide(slide: &SlideRecord, model: &PresentationModel, total: usize) -> String {
    let mut classes = vec!["slide".to_string()];
    if slide.readability.overlay {
        classes.push("readability-filter".to_string());
        if slide.readability.strength == OverlayStrength::Strong {
            classes.push("readability-strong".to_string());
        }
    }
    if slide.overrides.autoscale.unwrap_or(model.config.autoscale) {
        classes.push("autoscale".to_string());
    }
    let transition = slide
        .overrides
        .transition
        .as_deref()
        .or(model.config.slide_transition.as_deref());

    let mut out = format!(
        "<section class=\"{}\" data-index=\"{}\"{}>\n",
        classes.join(" "),
        slide.index,
        transition
            .map(|t| format!(" data-transition=\"{}\"", escape_html(t)))
            .unwrap_or_default()
    );

    // Background layers first, stacked in source order.
    let background = slide
        .overrides
        .background_image
        .as_deref()
        .or(model.config.background_image.as_deref());
    if let Some(path) = background {
        out.push_str(&format!(
            "<div class=\"background\" style=\"background-image:url('{}')\"></div>\n",
            escape_html(path)
        ));
    }
    for image in &slide.images {
        if image.placement != ImagePlacement::Inline {
            out.push_str(&render_background_image(image));
        }
    }
    for video in &slide.videos {
        out.push_str(&render_video(video));
    }
    for audio in &slide.audios {
        out.push_str(&render_audio(audio));
    }

    // Content region, then columns.
    let body_html = annotate_code_blocks(&slide.body_html, slide);
    if slide.columns.is_empty() {
        out.push_str(&format!("<div class=\"content\">\n{}\n</div>\n", body_html));
    } else {
        if !body_html.trim().is_empty() {
            out.push_str(&format!("<div class=\"content\">\n{}\n</div>\n", body_html));
        }
        out.push_str("<div class=\"columns\">\n");
        for column in &slide.columns {
            out.push_str(&format!(
                "<div class=\"column\" style=\"width:{:.1}%\">\n{}\n</div>\n",
                column.width_share, column.html
            ));
        }
        out.push_str("</div>\n");
    }

    // Inline media follow the content flow.
    for image in &slide.images {
        if image.placement == ImagePlacement::Inline {
            out.push_str(&render_inline_image(image));
        }
    }

    if !slide.footnotes.is_empty() {
        out.push_str("<footer class=\"footnotes\"><ol>\n");
        for (label, text) in &slide.footnotes {
            out.push_str(&format!(
                "<li data-label=\"{}\">{}</li>\n",
                escape_html(label),
                escape_html(text)
            ));
        }
        out.push_str("</ol></footer>\n");
    }

    let footer = slide
        .overrides
        .footer
        .as_deref()
        .or(model.config.footer.as_deref());
    if let Some(footer) = footer {
        if !slide.overrides.hide_footer {
            out.push_str(&format!(
                "<div class=\"footer\">{}</div>\n",
                inline_markdown(footer)
            ));
        }
    }

    if model.config.slide_numbers && !slide.overrides.hide_slide_numbers {
        if model.config.slide_count {
            out.push_str(&format!(
                "<div class=\"slide-number\">{} / {}</div>\n",
                slide.index + 1,
                total
            ));
        } else {
            out.push_str(&format!(
                "<div class=\"slide-number\">{}</div>\n",
                slide.index + 1
            ));
        }
    }

    if !slide.notes.is_empty() {
        out.push_str(&format!(
            "<aside class=\"notes\">{}</aside>\n",
            inline_markdown(&slide.notes)
        ));
    }

    out.push_str("</section>\n");
    out
}

fn render_background_image(image: &ProcessedImage) -> String {
    if image.missing {
        return format!(
            "<div class=\"background placeholder\" data-src=\"{}\"></div>\n",
            escape_html(&image.path)
        );
    }
    let side = match image.placement {
        ImagePlacement::Left => " background-left",
        ImagePlacement::Right => " background-right",
        _ => "",
    };
    let sizing = match image.scaling {
        ImageScaling::Fit => "background-size:contain".to_string(),
        ImageScaling::Fill => "background-size:cover".to_string(),
        ImageScaling::Original => "background-size:auto".to_string(),
        ImageScaling::Percent(p) => format!("background-size:{}%", p),
    };
    format!(
        "<div class=\"background{}\" style=\"background-image:url('{}');{}\"></div>\n",
        side,
        escape_html(&image.path),
        sizing
    )
}

fn render_inline_image(image: &ProcessedImage) -> String {
    let mut style = String::new();
    if let ImageScaling::Percent(p) = image.scaling {
        style.push_str(&format!("width:{}%;", p));
    }
    if let Some(radius) = image.corner_radius {
        style.push_str(&format!("border-radius:{}px;", radius));
    }
    let align = match image.alignment {
        Some(crate::media::Alignment::Left) => " align-left",
        Some(crate::media::Alignment::Right) => " align-right",
        None => "",
    };
    let grid = image
        .grid
        .map(|g| format!(" data-grid-row=\"{}\" data-grid-col=\"{}\"", g.row, g.column))
        .unwrap_or_default();

    let img = if image.missing {
        format!(
            "<span class=\"image-placeholder\" data-src=\"{}\"></span>",
            escape_html(&image.path)
        )
    } else {
        format!(
            "<img src=\"{}\"{} alt=\"{}\">",
            escape_html(&image.path),
            if style.is_empty() {
                String::new()
            } else {
                format!(" style=\"{}\"", style)
            },
            escape_html(image.title.as_deref().unwrap_or_default())
        )
    };

    match &image.caption {
        Some(caption) => format!(
            "<figure class=\"inline-image{}\"{}>{}<figcaption>{}</figcaption></figure>\n",
            align,
            grid,
            img,
            inline_markdown(caption)
        ),
        None => format!(
            "<figure class=\"inline-image{}\"{}>{}</figure>\n",
            align, grid, img
        ),
    }
}

fn render_video(video: &crate::media::ProcessedVideo) -> String {
    let mut attrs = String::new();
    if video.autoplay {
        attrs.push_str(" autoplay");
    }
    if video.loop_playback {
        attrs.push_str(" loop");
    }
    if video.muted {
        attrs.push_str(" muted");
    }
    if video.hidden {
        attrs.push_str(" class=\"hidden-video\"");
    }
    match &video.source {
        VideoSource::Youtube { id, start } => {
            let start_param = start.map(|s| format!("?start={}", s)).unwrap_or_default();
            format!(
                "<iframe class=\"youtube-embed\" src=\"https://www.youtube.com/embed/{}{}\" allowfullscreen></iframe>\n",
                escape_html(id),
                start_param
            )
        }
        VideoSource::File { path } => {
            if video.missing {
                format!(
                    "<div class=\"video-placeholder\" data-src=\"{}\"></div>\n",
                    escape_html(path)
                )
            } else {
                format!(
                    "<video src=\"{}\"{} controls></video>\n",
                    escape_html(path),
                    attrs
                )
            }
        }
    }
}

fn render_audio(audio: &crate::media::ProcessedAudio) -> String {
    if audio.missing {
        return format!(
            "<div class=\"audio-placeholder\" data-src=\"{}\"></div>\n",
            escape_html(&audio.path)
        );
    }
    let mut attrs = String::new();
    if audio.autoplay {
        attrs.push_str(" autoplay");
    }
    if audio.loop_playback {
        attrs.push_str(" loop");
    }
    if audio.muted {
        attrs.push_str(" muted");
    }
    if audio.hidden {
        attrs.push_str(" class=\"hidden-audio\"");
    }
    format!(
        "<audio src=\"{}\"{} controls></audio>\n",
        escape_html(&audio.path),
        attrs
    )
}

/// Attach highlight metadata to the rendered code blocks, in order.
fn annotate_code_blocks(body_html: &str, slide: &SlideRecord) -> String {
    let mut html = body_html.to_string();
    for block in &slide.code_blocks {
        if block.highlighted_lines.is_empty() {
            continue;
        }
        let lines: Vec<String> = block
            .highlighted_lines
            .iter()
            .map(|n| n.to_string())
            .collect();
        let annotated = format!("<pre data-highlight-lines=\"{}\">", lines.join(","));
        html = html.replacen("<pre>", &annotated, 1);
    }
    html
}

fn inline_markdown(text: &str) -> String {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    let rendered = markdown_to_html(text, &options);
    // Single paragraphs lose their wrapper so fragments nest cleanly.
    let trimmed = rendered.trim();
    let unwrapped = trimmed
        .strip_prefix("<p>")
        .and_then(|s| s.strip_suffix("</p>"))
        .unwrap_or(trimmed);
    unwrapped.to_string()
}

/// Assemble the homepage linking every discovered presentation.
pub fn render_homepage(
    entries: &[(PresentationEntry, usize)],
    css_assets: &[ThemeAsset],
    config: &Config,
) -> Result<String> {
    let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str(
        "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!(
        "<title>{}</title>\n",
        escape_html(&config.site_title)
    ));
    for css in css_assets {
        if let Ok(tag) = css.tag(config.embed_resources, config.fetch_timeout_ms) {
            html.push_str(&tag);
            html.push('\n');
        }
    }
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{}</h1>\n", escape_html(&config.site_title)));
    html.push_str("<ul class=\"presentations\">\n");
    for (entry, slide_count) in entries {
        html.push_str(&format!(
            "<li><a href=\"{}/\">{}</a> <span class=\"slide-count\">{} slides</span></li>\n",
            entry.slug,
            escape_html(&entry.title),
            slide_count
        ));
    }
    html.push_str("</ul>\n");
    html.push_str(&format!(
        "<p class=\"generated-at\">Generated {}</p>\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M UTC")
    ));
    html.push_str("</body>\n</html>");
    Ok(html)
}

/// Utility function to write HTML content to a file
pub fn write_html_to_file(html_content: &str, output_path: &Path) -> Result<()> {
    info!("Writing HTML to file: {:?}", output_path);

    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(DeckError::FileReadError)?;
        }
    }

    fs::write(output_path, html_content).map_err(DeckError::FileReadError)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parse_presentation;

    fn page(markdown: &str) -> String {
        let outcome = parse_presentation(markdown, None);
        let config = Config::default();
        render_presentation_page(&outcome.model, &[], &[], &config).expect("page")
    }

    #[test]
    fn test_page_structure() {
        let html = page("# Hello\n\nWorld\n\n---\n\nSecond");
        assert!(html.contains("<!DOCTYPE html>"));
        assert!(html.contains("<title>Hello</title>"));
        assert_eq!(html.matches("<section class=\"slide\"").count(), 2);
    }

    #[test]
    fn test_readability_class_attached() {
        let html = page("![](bg.jpg)\n\nText over image");
        assert!(html.contains("readability-filter"));
    }

    #[test]
    fn test_footer_and_slide_numbers() {
        let html = page("slidenumbers: true\nslidecount: true\nfooter: Acme\n\n# A\n\n---\n\n# B");
        assert!(html.contains("<div class=\"footer\">Acme</div>"));
        assert!(html.contains("1 / 2"));
        assert!(html.contains("2 / 2"));
    }

    #[test]
    fn test_hide_footer_override() {
        let html = page("footer: Acme\n\n# A\n\n---\n\n[.hide-footer]\n# B");
        assert_eq!(html.matches("<div class=\"footer\">").count(), 1);
    }

    #[test]
    fn test_footnote_area_rendered() {
        let html = page("Claim[^1]\n\n[^1]: Source text");
        assert!(html.contains("<footer class=\"footnotes\">"));
        assert!(html.contains("Source text"));
    }

    #[test]
    fn test_code_highlight_annotation() {
        let html = page("[.code-highlight: 1]\n```rust\nlet a = 1;\nlet b = 2;\n```");
        assert!(html.contains("data-highlight-lines=\"1\""));
    }

    #[test]
    fn test_youtube_embed() {
        let html = page("![](https://youtu.be/abc123?t=30)");
        assert!(html.contains("youtube.com/embed/abc123?start=30"));
    }

    #[test]
    fn test_missing_media_placeholder() {
        let outcome = parse_presentation("![](gone.jpg)", Some(Path::new("/nonexistent-dir")));
        let config = Config::default();
        let html = render_presentation_page(&outcome.model, &[], &[], &config).expect("page");
        assert!(html.contains("placeholder"));
    }

    #[test]
    fn test_homepage_lists_entries() {
        let entries = vec![
            (
                PresentationEntry {
                    title: "First Deck".to_string(),
                    source_path: "a.md".into(),
                    slug: "first".to_string(),
                },
                12,
            ),
            (
                PresentationEntry {
                    title: "Second".to_string(),
                    source_path: "b.md".into(),
                    slug: "second".to_string(),
                },
                3,
            ),
        ];
        let config = Config::default();
        let html = render_homepage(&entries, &[], &config).expect("homepage");
        assert!(html.contains("<a href=\"first/\">First Deck</a>"));
        assert!(html.contains("12 slides"));
        assert!(html.contains("Generated "));
    }

    #[test]
    fn test_columns_rendered_with_widths() {
        let html = page("[.column]\nLeft\n[.column]\nRight");
        assert!(html.contains("<div class=\"columns\">"));
        assert!(html.contains("width:50.0%"));
    }
}
