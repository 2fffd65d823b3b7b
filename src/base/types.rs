use serde::{Deserialize, Serialize};

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// How free-text answers are turned into field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextMode {
    /// Answers are rewritten by the model and proposed for confirmation.
    #[default]
    Story,
    /// Answers are stored verbatim.
    Literal,
}

impl TextMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextMode::Story => "story",
            TextMode::Literal => "literal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "story" => Some(TextMode::Story),
            "literal" => Some(TextMode::Literal),
            _ => None,
        }
    }
}

impl std::fmt::Display for TextMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Speaker of a turn in a per-field drafting history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftRole {
    User,
    Assistant,
}

/// One turn of a per-field drafting history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftTurn {
    pub role: DraftRole,
    pub content: String,
}

impl DraftTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: DraftRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: DraftRole::Assistant,
            content: content.into(),
        }
    }
}

/// A thread root as seen in a DM channel's history.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ThreadSummary {
    /// Timestamp of the message.
    pub ts: String,
    /// Thread timestamp, if the message belongs to a thread.
    pub thread_ts: Option<String>,
    /// Timestamp of the latest reply, if any.
    pub latest_reply: Option<String>,
    /// Author, if the message was posted by a user.
    pub user: Option<String>,
    /// Whether the message was posted by a bot.
    pub is_bot: bool,
}

impl ThreadSummary {
    /// Timestamp of the latest activity in this thread, as a sortable number.
    pub fn last_activity(&self) -> f64 {
        self.latest_reply.as_deref().unwrap_or(&self.ts).parse().unwrap_or(0.0)
    }

    /// Whether this is a top-level message (not a nested reply).
    pub fn is_root(&self) -> bool {
        match &self.thread_ts {
            Some(thread_ts) => thread_ts.is_empty() || thread_ts == &self.ts,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mode_parses_case_insensitively() {
        assert_eq!(TextMode::parse(" Story "), Some(TextMode::Story));
        assert_eq!(TextMode::parse("LITERAL"), Some(TextMode::Literal));
        assert_eq!(TextMode::parse("prose"), None);
    }

    #[test]
    fn thread_summary_activity_prefers_latest_reply() {
        let summary = ThreadSummary {
            ts: "100.0".to_string(),
            latest_reply: Some("250.5".to_string()),
            ..Default::default()
        };

        assert_eq!(summary.last_activity(), 250.5);
        assert!(summary.is_root());
    }

    #[test]
    fn thread_summary_nested_reply_is_not_root() {
        let summary = ThreadSummary {
            ts: "101.0".to_string(),
            thread_ts: Some("100.0".to_string()),
            ..Default::default()
        };

        assert!(!summary.is_root());
    }
}
