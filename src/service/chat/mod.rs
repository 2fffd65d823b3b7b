pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

use crate::base::types::{Res, ThreadSummary, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the core functionality for interacting with chat platforms
/// like Slack. Implementing this trait allows different chat services to be used
/// with the incident-bot.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// This sets up event listeners for the chat platform and begins processing
    /// incoming messages and events.
    async fn start(&self) -> Void;

    /// Send a message to a channel thread.
    ///
    /// An empty `thread_ts` posts a top-level message.
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void;

    /// Send a message with interactive blocks (buttons, pickers).
    ///
    /// `text` is the notification fallback; `blocks` is a JSON array of Block Kit blocks.
    async fn send_blocks(&self, channel_id: &str, thread_ts: &str, text: &str, blocks: Value) -> Void;

    /// Open (or reuse) the direct-message channel with a user, and return its ID.
    async fn open_dm(&self, user_id: &str) -> Res<String>;

    /// Get the text of the message posted at `ts`, if it can be found.
    async fn get_message_text(&self, channel_id: &str, ts: &str) -> Res<Option<String>>;

    /// Find a user ID by real name or display name (case-insensitive).
    async fn find_user_by_name(&self, name: &str) -> Res<Option<String>>;

    /// List the most recent top-level messages of a channel.
    async fn recent_threads(&self, channel_id: &str, limit: u16) -> Res<Vec<ThreadSummary>>;

    /// Publish the App Home view for a user.
    ///
    /// `view` is a JSON Block Kit `home` view.
    async fn publish_home(&self, user_id: &str, view: Value) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
