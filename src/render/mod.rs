//! Rendering of the incident report and usage guide into the formats the bot publishes.
//!
//! - Markdown for the thread preview, the final document, and the Jira attachment.
//! - Atlassian Document Format (ADF) for Jira issue descriptions.
//! - Slack Block Kit sections for the App Home tab.
//! - Styled HTML for the Google Docs export.

pub mod adf;
pub mod blocks;
pub mod html;
pub mod markdown;
