//! Slack Block Kit builders: the App Home guide and the interactive link prompts.

use serde_json::{Value, json};

/// Slack rejects section texts longer than 3000 characters.
const MAX_SECTION_CHARS: usize = 2900;

/// A view may hold at most 100 blocks.
const MAX_BLOCKS: usize = 100;

/// A static select may offer at most 100 options.
const MAX_SELECT_OPTIONS: usize = 100;

/// Characters taken by the opening and closing fence around a code chunk.
const FENCE_CHARS: usize = "```\n\n```".len();

/// Convert a Markdown guide into `mrkdwn` section blocks.
///
/// Headings become bold lines, fenced code is kept together, and paragraphs
/// are chunked so no section exceeds Slack's text limit.
pub fn markdown_to_blocks(markdown: &str) -> Vec<Value> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut code: Option<Vec<String>> = None;

    for line in markdown.lines() {
        if line.trim().starts_with("```") {
            match code.take() {
                Some(lines) => flush_code(lines, &mut blocks),
                None => {
                    flush_paragraph(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }

        if let Some(lines) = code.as_mut() {
            lines.push(line.to_string());
            continue;
        }

        if line.starts_with('#') {
            flush_paragraph(&mut paragraph, &mut blocks);

            let text = line.trim_start_matches('#').trim();
            if !text.is_empty() {
                blocks.push(section(&format!("*{text}*")));
            }
            continue;
        }

        if line.trim().is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        paragraph.push(line.to_string());
    }

    flush_paragraph(&mut paragraph, &mut blocks);

    // An unclosed fence runs to the end of the guide.
    if let Some(lines) = code {
        flush_code(lines, &mut blocks);
    }

    blocks.truncate(MAX_BLOCKS);
    blocks
}

/// Build a Home view with a header, a divider, and the guide's blocks.
pub fn home_view(title: &str, markdown: &str) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": title, "emoji": true },
        }),
        json!({ "type": "divider" }),
    ];

    blocks.extend(markdown_to_blocks(markdown));
    blocks.truncate(MAX_BLOCKS);

    json!({ "type": "home", "blocks": blocks })
}

/// A prompt with a primary "confirm" button and a plain "decline" button, both carrying `value`.
pub fn confirm_buttons(text: &str, value: &str, confirm: (&str, &str), decline: (&str, &str)) -> Value {
    let (confirm_action_id, confirm_label) = confirm;
    let (decline_action_id, decline_label) = decline;

    json!([
        section(text),
        {
            "type": "actions",
            "elements": [
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": confirm_label },
                    "style": "primary",
                    "action_id": confirm_action_id,
                    "value": value,
                },
                {
                    "type": "button",
                    "text": { "type": "plain_text", "text": decline_label },
                    "action_id": decline_action_id,
                    "value": value,
                },
            ],
        },
    ])
}

/// A section with a static select offering `options` (label and value alike), up to Slack's limit.
pub fn option_picker(text: &str, action_id: &str, placeholder: &str, options: &[String]) -> Value {
    let options: Vec<Value> = options
        .iter()
        .take(MAX_SELECT_OPTIONS)
        .map(|o| json!({ "text": { "type": "plain_text", "text": o }, "value": o }))
        .collect();

    json!([{
        "type": "section",
        "text": { "type": "mrkdwn", "text": text },
        "accessory": {
            "type": "static_select",
            "action_id": action_id,
            "placeholder": { "type": "plain_text", "text": placeholder },
            "options": options,
        },
    }])
}

fn section(text: &str) -> Value {
    json!({ "type": "section", "text": { "type": "mrkdwn", "text": text } })
}

fn flush_paragraph(paragraph: &mut Vec<String>, blocks: &mut Vec<Value>) {
    let text = paragraph.join("\n");
    paragraph.clear();

    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let chars: Vec<char> = text.chars().collect();
    for chunk in chars.chunks(MAX_SECTION_CHARS) {
        blocks.push(section(&chunk.iter().collect::<String>()));
    }
}

/// Emit fenced code, closing and reopening the fence wherever a section fills up.
fn flush_code(lines: Vec<String>, blocks: &mut Vec<Value>) {
    let budget = MAX_SECTION_CHARS - FENCE_CHARS;

    let mut chunk: Vec<String> = Vec::new();
    let mut chunk_chars = 0;

    for line in lines {
        let chars: Vec<char> = line.chars().collect();
        let pieces: Vec<String> = if chars.is_empty() { vec![String::new()] } else { chars.chunks(budget).map(|c| c.iter().collect()).collect() };

        for piece in pieces {
            let piece_chars = piece.chars().count();

            // Joined lines are separated by one newline each.
            if !chunk.is_empty() && chunk_chars + 1 + piece_chars > budget {
                blocks.push(section(&format!("```\n{}\n```", chunk.join("\n"))));
                chunk.clear();
                chunk_chars = 0;
            }

            chunk_chars += usize::from(!chunk.is_empty()) + piece_chars;
            chunk.push(piece);
        }
    }

    blocks.push(section(&format!("```\n{}\n```", chunk.join("\n"))));
}
