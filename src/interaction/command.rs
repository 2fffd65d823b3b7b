//! Parsing of thread messages into commands.

use crate::base::types::TextMode;

/// A message in an intake thread, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Finalize,
    Jira,
    Status,
    Fields,
    Show,
    Continue,
    /// `mode <story|literal>`; `None` when the argument is invalid.
    Mode(Option<TextMode>),
    ShowMode,
    /// `edit <field> <value>`; `None` when the field or value is missing.
    Edit(Option<EditArgs>),
    Cancel,
    Start,
    /// Anything else: an answer, a confirmation, or a revision instruction.
    Answer,
}

/// The raw arguments of an `edit` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditArgs {
    pub field_token: String,
    /// The value as typed, possibly starting with a `story` / `literal` prefix.
    pub value: String,
}

impl Command {
    /// Classify a message. Keywords are case-insensitive and accept a leading `/`.
    pub fn parse(text: &str) -> Self {
        let raw = text.trim();
        let lower = raw.to_lowercase();

        match lower.as_str() {
            "help" | "/help" => return Command::Help,
            "finalize" | "finalise" | "finaliseer" | "finaliseren" | "finaliseren aub" | "/finalize" => return Command::Finalize,
            "jira" | "/jira" => return Command::Jira,
            "status" | "/status" => return Command::Status,
            "fields" | "/fields" | "velden" | "/velden" => return Command::Fields,
            "show" | "/show" | "toon" | "/toon" | "preview" | "/preview" => return Command::Show,
            "continue" | "/continue" | "verder" | "/verder" => return Command::Continue,
            "showmode" | "/showmode" => return Command::ShowMode,
            "cancel" | "/cancel" => return Command::Cancel,
            "start" | "/start" => return Command::Start,
            _ => {}
        }

        if let Some(arg) = lower.strip_prefix("mode ").or_else(|| lower.strip_prefix("/mode ")) {
            return Command::Mode(TextMode::parse(arg));
        }

        if ["edit ", "/edit ", "wijzig "].iter().any(|p| lower.starts_with(p)) {
            return Command::Edit(parse_edit(raw));
        }

        Command::Answer
    }
}

/// Split `edit <field> <value>` on the first two spaces, keeping the value's case.
fn parse_edit(raw: &str) -> Option<EditArgs> {
    let mut parts = raw.splitn(3, ' ');
    let _keyword = parts.next()?;
    let field_token = parts.next().filter(|t| !t.is_empty())?;
    let value = parts.next().filter(|v| !v.trim().is_empty())?;

    Some(EditArgs {
        field_token: field_token.to_string(),
        value: value.to_string(),
    })
}
