//! Minimal Markdown to Atlassian Document Format conversion.

use serde_json::{Value, json};

/// Convert Markdown-ish text into a minimal ADF document.
///
/// Lines starting with one to six `#` followed by a space become headings;
/// blank lines become empty paragraphs; everything else is a plain paragraph.
pub fn to_adf(markdown: &str) -> Value {
    let mut content = Vec::new();

    for line in markdown.lines() {
        if line.trim().is_empty() {
            content.push(json!({ "type": "paragraph", "content": [] }));
            continue;
        }

        match heading_level(line) {
            Some((level, text)) => content.push(json!({
                "type": "heading",
                "attrs": { "level": level },
                "content": [{ "type": "text", "text": text }],
            })),
            None => content.push(json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": line }],
            })),
        }
    }

    if content.is_empty() {
        content.push(json!({ "type": "paragraph", "content": [] }));
    }

    json!({ "type": "doc", "version": 1, "content": content })
}

/// Split a Markdown heading into its level and text.
fn heading_level(line: &str) -> Option<(usize, &str)> {
    let level = line.chars().take_while(|c| *c == '#').count();

    if level == 0 || level > 6 {
        return None;
    }

    line[level..].strip_prefix(' ').map(|text| (level, text.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_paragraphs_and_blanks() {
        let doc = to_adf("# Title\nSome text\n\n### Sub");
        let content = doc["content"].as_array().unwrap();

        assert_eq!(doc["type"], "doc");
        assert_eq!(doc["version"], 1);
        assert_eq!(content.len(), 4);
        assert_eq!(content[0]["type"], "heading");
        assert_eq!(content[0]["attrs"]["level"], 1);
        assert_eq!(content[0]["content"][0]["text"], "Title");
        assert_eq!(content[1]["content"][0]["text"], "Some text");
        assert_eq!(content[2]["content"].as_array().unwrap().len(), 0);
        assert_eq!(content[3]["attrs"]["level"], 3);
    }

    #[test]
    fn hashes_without_space_or_too_deep_are_text() {
        let doc = to_adf("#hashtag\n####### seven");
        let content = doc["content"].as_array().unwrap();

        assert_eq!(content[0]["type"], "paragraph");
        assert_eq!(content[1]["type"], "paragraph");
        assert_eq!(content[1]["content"][0]["text"], "####### seven");
    }

    #[test]
    fn empty_input_yields_one_empty_paragraph() {
        let doc = to_adf("");

        assert_eq!(doc["content"], json!([{ "type": "paragraph", "content": [] }]));
    }
}
