use deckfold::media::ImagePlacement;
use deckfold::parse_presentation_file;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_parse_file_with_local_media() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("present.jpg"), b"fake image").expect("write image");
    fs::write(
        dir.path().join("deck.md"),
        "# Media Deck\n\n![](present.jpg)\n\n---\n\n![](absent.jpg)\n",
    )
    .expect("write deck");

    let outcome = parse_presentation_file(&dir.path().join("deck.md")).expect("parse");
    let model = &outcome.model;
    assert_eq!(model.slides.len(), 2);
    assert!(!model.slides[0].images[0].missing);
    assert!(model.slides[1].images[0].missing);
    assert_eq!(outcome.warning_count("media-resolution"), 1);
}

#[test]
fn test_unreadable_file_is_a_distinct_error() {
    let dir = TempDir::new().expect("tempdir");
    let missing = dir.path().join("nope.md");
    let result = parse_presentation_file(&missing);
    assert!(result.is_err());
    let message = result.err().map(|e| e.to_string()).unwrap_or_default();
    assert!(message.contains("nope.md"));
}

#[test]
fn test_full_deck_features_compose() {
    let dir = TempDir::new().expect("tempdir");
    let source = "\
theme: Plain Jane
slidenumbers: true
footer: deckfold test
slide-dividers: #

# First Section

Intro paragraph with a [link](https://example.com) and math $e=mc^2$.

^ Welcome everyone

# Second Section

[.code-highlight: 1]
```rust
let answer = 42;
let other = 7;
```

A claim[^cite]

[^cite]: A Reliable Source, 2024

# Third Section

[.column]

![inline](left.png)

[.column]

- bullet one
- bullet two

See [the first section](#first-section).
";
    fs::write(dir.path().join("deck.md"), source).expect("write");

    let outcome = parse_presentation_file(&dir.path().join("deck.md")).expect("parse");
    let model = &outcome.model;

    assert_eq!(model.slides.len(), 3);
    assert_eq!(model.title.as_deref(), Some("First Section"));
    assert_eq!(model.config.theme.as_deref(), Some("Plain Jane"));
    assert!(model.config.slide_numbers);

    // Slide 0: notes and math.
    assert_eq!(model.slides[0].notes, "Welcome everyone");
    assert_eq!(model.slides[0].math.len(), 1);
    assert!(model.slides[0].math[0].valid);

    // Slide 1: highlighted code and a resolved footnote.
    let block = &model.slides[1].code_blocks[0];
    assert_eq!(block.language.as_deref(), Some("rust"));
    assert!(block.highlighted_lines.contains(&1));
    assert_eq!(
        model.slides[1].footnotes.get("cite").map(|s| s.as_str()),
        Some("A Reliable Source, 2024")
    );

    // Slide 2: columns and a routed internal link.
    assert_eq!(model.slides[2].columns.len(), 2);
    assert_eq!(model.slides[2].link_routes.get("first-section"), Some(&0));
    assert!(model.slides[2]
        .images
        .iter()
        .any(|i| i.placement == ImagePlacement::Inline));

    // Anchors are globally unique and ordered.
    let slugs: Vec<&str> = model
        .anchors
        .entries()
        .iter()
        .map(|e| e.slug.as_str())
        .collect();
    assert_eq!(
        slugs,
        vec!["first-section", "second-section", "third-section"]
    );
}

#[test]
fn test_model_json_round_trips_through_serde() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("deck.md"), "# JSON\n\n- a\n- b").expect("write");

    let outcome = parse_presentation_file(&dir.path().join("deck.md")).expect("parse");
    let json = outcome.model.to_json_pretty().expect("serialize");
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["title"], "JSON");
    assert_eq!(value["slides"].as_array().map(|a| a.len()), Some(1));
}
