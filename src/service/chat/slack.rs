//! Slack chat service integration for incident-bot.
//!
//! This module provides the socket-mode Slack client:
//! - Receiving DM messages, shared links, App Home opens and button clicks
//! - Sending messages, interactive blocks and Home views
//! - Looking up DM channels, users and recent threads
//!
//! Events are converted to the platform-neutral types in
//! [`crate::interaction::event`] before being handed to the handlers.

use crate::{
    base::{
        config::Config,
        types::{Res, ThreadSummary, Void},
    },
    interaction::{
        self,
        event::{BlockAction, IncomingMessage, SharedLink},
    },
    runtime::Runtime,
    service::{docs::DocsClient, llm::LlmClient, state::StateStore, tracker::TrackerClient},
};
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use serde_json::Value;
use slack_morphism::prelude::*;
use tracing::{debug, info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config, store: StateStore, llm: LlmClient, tracker: TrackerClient, docs: DocsClient) -> Res<Self> {
        let client = SlackChatClient::new(config, store, llm, tracker, docs).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

impl From<SlackChatClient> for ChatClient {
    fn from(client: SlackChatClient) -> Self {
        Self { inner: Arc::new(client) }
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    runtime: Runtime,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    pub app_token: SlackApiToken,
    pub bot_token: SlackApiToken,
    pub bot_user_id: String,
    pub client: Arc<FullClient>,
    pub config: Config,
    pub store: StateStore,
    pub llm: LlmClient,
    pub tracker: TrackerClient,
    pub docs: DocsClient,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config, store: StateStore, llm: LlmClient, tracker: TrackerClient, docs: DocsClient) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
            config: config.clone(),
            store,
            llm,
            tracker,
            docs,
        })
    }

    /// Fetch history messages, newest first.
    async fn history(&self, request: &SlackApiConversationsHistoryRequest) -> Res<Vec<SlackHistoryMessage>> {
        let session = self.client.open_session(&self.bot_token);
        let response = session.conversations_history(request).await.map_err(|e| anyhow::anyhow!("Failed to read history: {}", e))?;

        Ok(response.messages)
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let runtime = Runtime {
            config: self.config.clone(),
            store: self.store.clone(),
            llm: self.llm.clone(),
            tracker: self.tracker.clone(),
            docs: self.docs.clone(),
            chat: ChatClient::from(self.clone()),
        };

        let listener_environment = Arc::new(SlackClientEventsListenerEnvironment::new(self.client.clone()).with_user_state(SlackUserState { runtime }));

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events.
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Serve until Ctrl-C.
        socket_mode_listener.serve().await;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message);
        if !thread_ts.is_empty() {
            request = request.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self, text, blocks))]
    async fn send_blocks(&self, channel_id: &str, thread_ts: &str, text: &str, blocks: Value) -> Void {
        let blocks: Vec<SlackBlock> = serde_json::from_value(blocks)?;
        let message = SlackMessageContent::new().with_text(text.to_string()).with_blocks(blocks);

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message);
        if !thread_ts.is_empty() {
            request = request.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow::anyhow!("Failed to send blocks: {}", e))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn open_dm(&self, user_id: &str) -> Res<String> {
        let request = SlackApiConversationsOpenRequest::new().with_users(vec![SlackUserId(user_id.to_string())]);
        let session = self.client.open_session(&self.bot_token);

        let response = session.conversations_open(&request).await.map_err(|e| anyhow::anyhow!("Failed to open DM: {}", e))?;

        Ok(response.channel.id.0)
    }

    #[instrument(skip(self))]
    async fn get_message_text(&self, channel_id: &str, ts: &str) -> Res<Option<String>> {
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel_id.to_string()))
            .with_latest(SlackTs(ts.to_string()))
            .with_inclusive(true)
            .with_limit(1);

        let messages = self.history(&request).await?;

        Ok(messages.into_iter().next().and_then(|m| m.content.text))
    }

    #[instrument(skip(self))]
    async fn find_user_by_name(&self, name: &str) -> Res<Option<String>> {
        let request = SlackApiUsersListRequest::new().with_limit(200);
        let session = self.client.open_session(&self.bot_token);

        let response = session.users_list(&request).await.map_err(|e| anyhow::anyhow!("Failed to list users: {}", e))?;

        let wanted = name.trim().to_lowercase();
        let found = response.members.iter().find_map(|member| {
            let profile = member.profile.as_ref()?;
            let shown = profile.real_name.as_deref().filter(|n| !n.is_empty()).or(profile.display_name.as_deref())?;

            if shown.to_lowercase() == wanted { Some(member.id.0.clone()) } else { None }
        });

        debug!("User lookup for `{}` found {:?}", name, found);

        Ok(found)
    }

    #[instrument(skip(self))]
    async fn recent_threads(&self, channel_id: &str, limit: u16) -> Res<Vec<ThreadSummary>> {
        let request = SlackApiConversationsHistoryRequest::new()
            .with_channel(SlackChannelId(channel_id.to_string()))
            .with_inclusive(true)
            .with_limit(limit);

        let messages = self.history(&request).await?;

        let threads = messages
            .into_iter()
            .map(|m| ThreadSummary {
                is_bot: m.sender.bot_id.is_some() || matches!(m.subtype, Some(SlackMessageEventType::BotMessage)),
                ts: m.origin.ts.0,
                thread_ts: m.origin.thread_ts.map(|t| t.0),
                latest_reply: m.parent.latest_reply.map(|t| t.0),
                user: m.sender.user.map(|u| u.0),
            })
            .collect();

        Ok(threads)
    }

    #[instrument(skip(self, view))]
    async fn publish_home(&self, user_id: &str, view: Value) -> Void {
        let view: SlackView = serde_json::from_value(view)?;
        let request = SlackApiViewsPublishRequest::new(SlackUserId(user_id.to_string()), view);
        let session = self.client.open_session(&self.bot_token);

        let _ = session.views_publish(&request).await.map_err(|e| anyhow::anyhow!("Failed to publish App Home: {}", e))?;

        Ok(())
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(
        SlackMessageContent::new().with_text("No slash commands are supported. Send me a direct message to report an incident.".into()),
    ))
}

/// Handles interaction events (button clicks, picker selections) from Slack.
#[instrument(skip_all)]
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;

    match event {
        SlackInteractionEvent::BlockActions(block_actions_event) => {
            match BlockAction::from_slack(&block_actions_event) {
                Some(action) => {
                    info!("Received block action `{}` ...", action.action_id);
                    interaction::block_action::handle_block_action(action, user_state.runtime.clone());
                }
                None => warn!("Received block action without user or action."),
            }
        }
        _ => {
            warn!("Received unhandled interaction event.")
        }
    }

    Ok(())
}

/// Handles push events from Slack.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let event = event_callback.event;
    let states = states.read().await;
    let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow::anyhow!("Failed to get user state"))?;
    let runtime = user_state.runtime.clone();

    match event {
        SlackEventCallbackBody::Message(slack_message_event) => {
            debug!("Received message event ...");

            let Some(message) = IncomingMessage::from_slack(&slack_message_event) else {
                warn!("Skipping message event without a channel.");
                return Ok(());
            };

            // Only new posts by humans drive the intake; edits and deletions do not.
            if !message.is_user_post() || message.user_id == runtime.chat.bot_user_id() {
                debug!("Skipping message event from a bot or a system subtype.");
                return Ok(());
            }

            if !message.is_direct() {
                debug!("Skipping message event outside a DM.");
                return Ok(());
            }

            interaction::dm_message::handle_dm_message(message, runtime);
        }
        SlackEventCallbackBody::LinkShared(slack_link_shared_event) => {
            info!("Received link shared event ...");
            interaction::link_shared::handle_link_shared(SharedLink::from_slack(&slack_link_shared_event), runtime);
        }
        SlackEventCallbackBody::AppHomeOpened(slack_app_home_opened_event) => {
            info!("Received app home opened event ...");
            interaction::app_home::handle_app_home_opened(slack_app_home_opened_event.user.0, runtime);
        }
        _ => {
            warn!("Received unhandled push event.")
        }
    }

    Ok(())
}
