//! Load configuration via `config` crate with env-override support.

use std::{collections::HashMap, ops::Deref, path::PathBuf, sync::Arc};

use serde::Deserialize;

use crate::base::prompts;

use super::types::Res;

/// Default OpenAI model used to rewrite answers.
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default sampling temperature for the rewriting model.
fn default_openai_temperature() -> f32 {
    0.2
}

/// Default reasoning effort for `o` models.
fn default_openai_reasoning_effort() -> String {
    "low".to_string()
}

/// Default max output tokens for the rewriting model.
fn default_openai_max_tokens() -> u32 {
    2048
}

fn default_rewriter_system_directive() -> String {
    prompts::REWRITER_SYSTEM_DIRECTIVE.to_string()
}

fn default_revision_system_directive() -> String {
    prompts::REVISION_SYSTEM_DIRECTIVE.to_string()
}

fn default_jira_issue_type() -> String {
    "Task".to_string()
}

fn default_jira_summary() -> String {
    "Security incident".to_string()
}

/// Default pattern used to spot shared incident issues (first capture group is the key).
fn default_linked_issue_pattern() -> String {
    r"/browse/(ISO-\d+)".to_string()
}

/// Sessions older than this are replaced by a fresh one.
fn default_session_max_age_hours() -> u64 {
    48
}

fn default_usage_path() -> PathBuf {
    PathBuf::from("USAGE.md")
}

/// Configuration for the incident-bot application.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub inner: Arc<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ConfigInner {
    /// OpenAI API key (`OPENAI_API_KEY`).
    pub openai_api_key: String,
    /// OpenAI model used to rewrite and revise answers (`OPENAI_MODEL`).
    #[serde(default = "default_openai_model")]
    pub openai_model: String,
    /// Sampling temperature for `gpt` models (`OPENAI_TEMPERATURE`).
    /// Value between 0 and 2.
    #[serde(default = "default_openai_temperature")]
    pub openai_temperature: f32,
    /// Reasoning effort for `o` models (`OPENAI_REASONING_EFFORT`): low, medium or high.
    #[serde(default = "default_openai_reasoning_effort")]
    pub openai_reasoning_effort: String,
    /// Max output tokens (`OPENAI_MAX_TOKENS`).
    #[serde(default = "default_openai_max_tokens")]
    pub openai_max_tokens: u32,
    /// Optional custom rewriter directive to override the default (`REWRITER_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_rewriter_system_directive")]
    pub rewriter_system_directive: String,
    /// Optional custom revision directive to override the default (`REVISION_SYSTEM_DIRECTIVE`).
    #[serde(default = "default_revision_system_directive")]
    pub revision_system_directive: String,
    /// Slack app token (`SLACK_APP_TOKEN`), used for socket mode.
    pub slack_app_token: String,
    /// Slack bot token (`SLACK_BOT_TOKEN`).
    pub slack_bot_token: String,
    /// Base URL of the Jira instance (`JIRA_URL`).
    #[serde(default)]
    pub jira_url: Option<String>,
    /// Jira Cloud e-mail (`JIRA_EMAIL`), used with `JIRA_API_TOKEN`.
    #[serde(default)]
    pub jira_email: Option<String>,
    /// Jira Cloud API token (`JIRA_API_TOKEN`).
    #[serde(default)]
    pub jira_api_token: Option<String>,
    /// Jira Server/DC username (`JIRA_USERNAME`), used with `JIRA_PASSWORD`.
    #[serde(default)]
    pub jira_username: Option<String>,
    /// Jira Server/DC password (`JIRA_PASSWORD`).
    #[serde(default)]
    pub jira_password: Option<String>,
    /// Jira personal access token (`JIRA_PAT`); takes precedence over basic auth.
    #[serde(default)]
    pub jira_pat: Option<String>,
    /// Jira project key (`JIRA_PROJECT_KEY`).
    #[serde(default)]
    pub jira_project_key: Option<String>,
    /// Jira issue type name (`JIRA_ISSUE_TYPE`).
    #[serde(default = "default_jira_issue_type")]
    pub jira_issue_type: String,
    /// Jira issue type ID (`JIRA_ISSUE_TYPE_ID`); takes precedence over the name.
    #[serde(default)]
    pub jira_issue_type_id: Option<String>,
    /// Summary of newly created issues (`JIRA_SUMMARY`).
    #[serde(default = "default_jira_summary")]
    pub jira_summary: String,
    /// Report field key to Jira field ID (e.g. `leerpunten = "customfield_10061"`).
    #[serde(default)]
    pub jira_field_map: HashMap<String, String>,
    /// Regex matching shared incident issue links; the first capture group is the issue key (`LINKED_ISSUE_PATTERN`).
    #[serde(default = "default_linked_issue_pattern")]
    pub linked_issue_pattern: String,
    /// Maximum age of a user session in hours (`SESSION_MAX_AGE_HOURS`).
    #[serde(default = "default_session_max_age_hours")]
    pub session_max_age_hours: u64,
    /// Path to the usage guide shown on the App Home tab (`USAGE_PATH`).
    #[serde(default = "default_usage_path")]
    pub usage_path: PathBuf,
    /// Deployed Apps Script web app that creates Google Docs (`GOOGLE_WEBAPP_URL`).
    /// The Docs export is off when unset.
    #[serde(default)]
    pub google_webapp_url: Option<String>,
    /// Shared secret sent to the web app as `token` (`GOOGLE_SHARED_SECRET`).
    #[serde(default)]
    pub google_shared_secret: Option<String>,
    /// Drive folder the documents are created in (`GOOGLE_FOLDER_ID`).
    #[serde(default)]
    pub google_folder_id: Option<String>,
}

impl Config {
    pub fn load(explicit_path: Option<&std::path::Path>) -> Res<Self> {
        let mut cfg = config::Config::builder().add_source(config::Environment::default().prefix("INCIDENT_BOT"));

        if let Some(p) = explicit_path {
            cfg = cfg.add_source(config::File::from(p.to_path_buf()));
        } else if std::path::Path::new(".hidden/config.toml").exists() {
            cfg = cfg.add_source(config::File::with_name(".hidden/config.toml"));
        }

        let result = Config {
            inner: Arc::new(cfg.build()?.try_deserialize()?),
        };

        result.validate()?;

        Ok(result)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Res<()> {
        if self.openai_temperature < 0.0 || self.openai_temperature > 2.0 {
            return Err(anyhow::anyhow!("OpenAI temperature must be between 0 and 2."));
        }

        if self.openai_max_tokens < 1 || self.openai_max_tokens > 128000 {
            return Err(anyhow::anyhow!("OpenAI max tokens must be between 1 and 128000."));
        }

        if self.session_max_age_hours == 0 {
            return Err(anyhow::anyhow!("Session max age must be at least one hour."));
        }

        let pattern = regex::Regex::new(&self.linked_issue_pattern).map_err(|e| anyhow::anyhow!("Invalid linked issue pattern: {e}"))?;
        if pattern.captures_len() < 2 {
            return Err(anyhow::anyhow!("Linked issue pattern must contain a capture group for the issue key."));
        }

        Ok(())
    }
}
