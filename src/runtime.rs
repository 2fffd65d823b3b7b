//! Runtime services and shared state for the incident-bot.

use tracing::{instrument, warn};

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, docs::DocsClient, llm::LlmClient, state::StateStore, tracker::TrackerClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the store, service clients, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The in-memory conversation and session store.
    pub store: StateStore,
    /// The LLM client instance.
    pub llm: LlmClient,
    /// The issue tracker client instance.
    pub tracker: TrackerClient,
    /// The document export client instance.
    pub docs: DocsClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the store.
        let store = StateStore::new(&config);

        // Initialize the LLM client.
        let llm = LlmClient::openai(&config);

        // Initialize the tracker; a missing configuration is reported when a report is filed.
        let tracker = match TrackerClient::jira(&config) {
            Ok(tracker) => tracker,
            Err(err) => {
                warn!("Jira is unavailable: {}", err);
                TrackerClient::unavailable(err.to_string())
            }
        };

        // Initialize the docs export; like the tracker, a broken configuration surfaces on use.
        let docs = match DocsClient::apps_script(&config) {
            Ok(docs) => docs,
            Err(err) => {
                warn!("Google Docs export is unavailable: {}", err);
                DocsClient::unavailable(err.to_string())
            }
        };

        // Initialize the slack client.
        let chat = ChatClient::slack(&config, store.clone(), llm.clone(), tracker.clone(), docs.clone()).await?;

        Ok(Self {
            config,
            store,
            llm,
            tracker,
            docs,
            chat,
        })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
