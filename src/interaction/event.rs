//! Platform-neutral views of the chat events the bot reacts to.
//!
//! Each type is built from the corresponding slack-morphism event, so the
//! handlers never touch SDK types.

use slack_morphism::prelude::*;

/// A message posted in a channel or DM.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IncomingMessage {
    pub channel_id: String,
    pub channel_type: Option<String>,
    pub user_id: String,
    pub ts: String,
    pub thread_ts: Option<String>,
    pub text: String,
    pub is_bot: bool,
    /// An edit, deletion, join or other system event rather than a post.
    pub is_system: bool,
}

impl IncomingMessage {
    /// Build from a Slack `message` event; `None` without a channel.
    pub fn from_slack(event: &SlackMessageEvent) -> Option<Self> {
        let channel_id = event.origin.channel.as_ref()?.0.to_owned();

        let is_bot = event.sender.bot_id.is_some() || matches!(event.subtype, Some(SlackMessageEventType::BotMessage));
        let is_system = !is_bot && !is_user_post(event.subtype.as_ref());

        Some(Self {
            channel_id,
            channel_type: event.origin.channel_type.as_ref().map(|t| t.0.to_owned()),
            user_id: event.sender.user.as_ref().map(|u| u.0.to_owned()).unwrap_or_default(),
            ts: event.origin.ts.0.to_owned(),
            thread_ts: event.origin.thread_ts.as_ref().map(|t| t.0.to_owned()).filter(|t| !t.is_empty()),
            text: event.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default(),
            is_bot,
            is_system,
        })
    }

    /// Whether this message was sent in a direct-message channel.
    pub fn is_direct(&self) -> bool {
        self.channel_type.as_deref() == Some("im")
    }

    /// Whether a person wrote this message (not a bot, an edit or a system event).
    pub fn is_user_post(&self) -> bool {
        !self.is_bot && !self.is_system && !self.user_id.is_empty()
    }

    /// The timestamp of the thread this message belongs to (its own for top-level messages).
    pub fn root_ts(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }

    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts.is_some()
    }
}

/// Subtypes that still carry a user's own post.
fn is_user_post(subtype: Option<&SlackMessageEventType>) -> bool {
    matches!(subtype, None | Some(SlackMessageEventType::FileShare) | Some(SlackMessageEventType::ThreadBroadcast))
}

/// A `link_shared` event: links posted in a channel the bot can unfurl.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedLink {
    pub channel_id: String,
    pub message_ts: String,
    pub user_id: String,
    pub urls: Vec<String>,
}

impl SharedLink {
    pub fn from_slack(event: &SlackLinkSharedEvent) -> Self {
        Self {
            channel_id: event.channel.0.to_owned(),
            message_ts: event.message_ts.0.to_owned(),
            user_id: event.user.0.to_owned(),
            urls: event.links.iter().map(|link| link.url.to_string()).collect(),
        }
    }
}

/// A click on a button or a picker selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockAction {
    pub user_id: String,
    pub action_id: String,
    /// The button value, or the selected option's value for pickers.
    pub value: String,
    /// The thread of the message holding the clicked element, if known.
    pub thread_ts: Option<String>,
}

impl BlockAction {
    /// Build from a Slack `block_actions` payload; `None` without a user or action.
    pub fn from_slack(event: &SlackInteractionBlockActionsEvent) -> Option<Self> {
        let user_id = event.user.as_ref().map(|u| u.id.0.to_owned()).filter(|u| !u.is_empty())?;
        let action = event.actions.as_ref()?.first()?;

        let value = action
            .value
            .clone()
            .or_else(|| action.selected_option.as_ref().map(|o| o.value.clone()))
            .unwrap_or_default();

        // The clicked message's thread, or the message itself when it is top-level.
        let thread_ts = event
            .message
            .as_ref()
            .and_then(|m| m.origin.thread_ts.as_ref().or(Some(&m.origin.ts)))
            .map(|ts| ts.0.to_owned())
            .filter(|ts| !ts.is_empty());

        Some(Self {
            user_id,
            action_id: action.action_id.0.to_owned(),
            value,
            thread_ts,
        })
    }
}
