// ABOUTME: Speaker note extraction for the deckfold pipeline
// ABOUTME: Collects ^-prefixed lines into a per-slide notes block

/// Extract speaker notes from a slide's visible lines.
///
/// A line starting with `^ ` (or a bare `^`) is a note; consecutive
/// note lines accumulate into one block. Note lines are blanked from
/// the visible stream in place of removal so positions stay stable.
/// Lines inside code are exempt via `code_mask`.
pub fn extract_notes(lines: &[String], code_mask: &[bool]) -> (String, Vec<String>) {
    let mut notes: Vec<String> = Vec::new();
    let mut cleaned = lines.to_vec();

    for (idx, line) in lines.iter().enumerate() {
        if code_mask.get(idx).copied().unwrap_or(false) {
            continue;
        }
        let trimmed = line.trim_start();
        if let Some(rest) = note_text(trimmed) {
            notes.push(rest.to_string());
            cleaned[idx] = String::new();
        }
    }

    (notes.join("\n"), cleaned)
}

fn note_text(line: &str) -> Option<&str> {
    if line == "^" {
        return Some("");
    }
    line.strip_prefix("^ ")
}
