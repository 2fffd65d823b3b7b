pub mod openai;

use crate::base::types::{DraftTurn, Res};
use async_trait::async_trait;
use std::ops::Deref;
use std::sync::Arc;

// Traits.

/// Generic LLM client trait that clients must implement.
///
/// This trait defines the prose-rewriting functionality the intake relies on.
/// Implementing this trait allows different LLM providers to be used with the incident-bot.
#[async_trait]
pub trait GenericLlmClient: Send + Sync + 'static {
    /// Rewrite a raw answer into concise prose for the given field.
    ///
    /// The model may only use the raw text as its source. Blank input yields an
    /// empty string without calling the model.
    async fn rewrite_field(&self, label: &str, raw: &str) -> Res<String>;

    /// Revise the current draft of a field.
    ///
    /// `history` is the running user/assistant exchange for the field, and
    /// `instructions` is the user's latest revision request. A blank instruction
    /// yields the last assistant draft.
    async fn revise_field(&self, history: &[DraftTurn], instructions: &str) -> Res<String>;
}

// Structs.

/// LLM client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct LlmClient {
    inner: Arc<dyn GenericLlmClient>,
}

impl Deref for LlmClient {
    type Target = dyn GenericLlmClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl LlmClient {
    pub fn new(inner: Arc<dyn GenericLlmClient>) -> Self {
        Self { inner }
    }
}
