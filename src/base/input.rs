//! Classification of short user replies.

use super::types::TextMode;

/// Whether the reply accepts a proposal or confirms a step.
pub fn is_accept(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "ja" | "ok" | "okay" | "akkoord" | "yes" | "y" | "accept")
}

pub fn is_yes(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "ja" | "yes" | "y")
}

pub fn is_no(text: &str) -> bool {
    matches!(text.trim().to_lowercase().as_str(), "nee" | "no" | "n")
}

/// Split an optional leading `story` / `literal` word off a reply.
///
/// Spaces and colons following the word are dropped, so `literal: foo` and
/// `story foo` both yield `foo`.
pub fn parse_mode_prefix(text: &str) -> (Option<TextMode>, String) {
    let stripped = text.trim();
    let lower = stripped.to_lowercase();

    for mode in [TextMode::Story, TextMode::Literal] {
        let word = mode.as_str();
        if lower.starts_with(word) {
            let rest = stripped.get(word.len()..).unwrap_or_default().trim_start_matches([' ', ':']);
            return (Some(mode), rest.to_string());
        }
    }

    (None, stripped.to_string())
}
