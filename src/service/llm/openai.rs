//! OpenAI implementation of the prose rewriter.
//!
//! Both operations go through the Responses API with a fixed system directive,
//! a bounded retry loop, and plain text output.

use std::sync::Arc;
use std::time::Duration;

use crate::base::{
    config::Config,
    prompts,
    types::{DraftRole, DraftTurn, Res},
};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ReasoningEffort,
        responses::{Content, CreateResponseArgs, Input, InputItem, InputMessageArgs, OutputContent, ReasoningConfigArgs, Response, Role, TextConfig, TextResponseFormat},
    },
};
use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

use super::{GenericLlmClient, LlmClient};

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// OpenAI LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.openai_api_key.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build a text request with the configured model settings.
    fn build_request(&self, instructions: &str, input: Input) -> Res<CreateResponseArgs> {
        let mut request = CreateResponseArgs::default();
        request
            .instructions(instructions.trim().to_string())
            .max_output_tokens(self.config.openai_max_tokens)
            .model(&self.config.openai_model)
            .text(TextConfig { format: TextResponseFormat::Text })
            .input(input);

        // Add the temperature for the non-reasoning models.
        if self.config.openai_model.starts_with("gpt") {
            request.temperature(self.config.openai_temperature);
        }

        // Add the reasoning effort for `o` models.
        if self.config.openai_model.starts_with("o") {
            let reasoning_effort = parse_openai_reasoning_effort(&self.config.openai_reasoning_effort)?;
            request.reasoning(ReasoningConfigArgs::default().effort(reasoning_effort).build()?);
        }

        Ok(request)
    }

    /// Helper function to make OpenAI API calls with retry logic and timeout handling.
    async fn call_openai_api(&self, request_builder: CreateResponseArgs) -> Res<Response> {
        const MAX_RETRIES: u32 = 3;
        const TIMEOUT: u64 = 120;
        const RETRY_DELAY_MS: u64 = 1000;

        let mut retries = 0;

        loop {
            let request = request_builder.build()?;
            let result = timeout(Duration::from_secs(TIMEOUT), self.client.responses().create(request)).await;

            match result {
                Ok(Ok(response)) => {
                    info!("OpenAI API call succeeded after {} attempts", retries + 1);
                    return Ok(response);
                }
                Ok(Err(err)) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call failed after {MAX_RETRIES} retries: {err}"));
                    }
                    retries += 1;
                    warn!("OpenAI API call failed, retrying {retries}/{MAX_RETRIES}: {err}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
                Err(_) => {
                    if retries >= MAX_RETRIES {
                        return Err(anyhow::anyhow!("OpenAI API call timed out after {MAX_RETRIES} attempts"));
                    }
                    retries += 1;
                    warn!("OpenAI API call timed out, retrying {retries}/{MAX_RETRIES}");

                    let delay = Duration::from_millis(RETRY_DELAY_MS * 2_u64.pow(retries - 1));
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// Send a request and return its trimmed text output.
    async fn complete(&self, instructions: &str, input: Input) -> Res<String> {
        let request = self.build_request(instructions, input)?;
        let response = self.call_openai_api(request).await?;

        parse_openai_text(&response)
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::rewrite_field", skip(self, raw))]
    async fn rewrite_field(&self, label: &str, raw: &str) -> Res<String> {
        if raw.trim().is_empty() {
            return Ok(String::new());
        }

        let input = build_rewrite_input(label, raw)?;

        self.complete(&self.config.rewriter_system_directive, input).await
    }

    #[instrument(name = "OpenAiLlmClient::revise_field", skip_all)]
    async fn revise_field(&self, history: &[DraftTurn], instructions: &str) -> Res<String> {
        if instructions.trim().is_empty() {
            return Ok(last_assistant_draft(history));
        }

        let input = build_revision_input(history, instructions)?;

        self.complete(&self.config.revision_system_directive, input).await
    }
}

/// Build the input for a single-field rewrite.
fn build_rewrite_input(label: &str, raw: &str) -> Res<Input> {
    Ok(Input::Items(vec![InputItem::Message(
        InputMessageArgs::default().role(Role::User).content(prompts::rewriter_user_prompt(label, raw.trim())).build()?,
    )]))
}

/// Build the input for a revision: the non-empty history, then the latest instruction.
fn build_revision_input(history: &[DraftTurn], instructions: &str) -> Res<Input> {
    let mut items = Vec::with_capacity(history.len() + 1);

    for turn in history.iter().filter(|t| !t.content.trim().is_empty()) {
        let role = match turn.role {
            DraftRole::User => Role::User,
            DraftRole::Assistant => Role::Assistant,
        };

        items.push(InputItem::Message(InputMessageArgs::default().role(role).content(turn.content.clone()).build()?));
    }

    items.push(InputItem::Message(InputMessageArgs::default().role(Role::User).content(instructions.trim().to_string()).build()?));

    Ok(Input::Items(items))
}

/// The most recent assistant draft, or empty when there is none.
fn last_assistant_draft(history: &[DraftTurn]) -> String {
    history
        .iter()
        .rev()
        .find(|t| t.role == DraftRole::Assistant)
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default()
}

/// Parse the OpenAI text response into a single trimmed string.
#[instrument(skip_all)]
pub fn parse_openai_text(response: &Response) -> Res<String> {
    let mut result = Vec::new();

    debug!("LLM response has {} outputs.", response.output.len());
    for output in &response.output {
        match output {
            OutputContent::Message(message) => {
                for message_content in &message.content {
                    match message_content {
                        Content::OutputText(text) => result.push(text.text.clone()),
                        Content::Refusal(reason) => {
                            return Err(anyhow::anyhow!("Request refused: {reason:#?}"));
                        }
                    }
                }
            }
            _ => {
                warn!("Unexpected output: {output:#?}");
            }
        }
    }

    Ok(result.join("\n").trim().to_string())
}

/// Convert a string reasoning effort to ReasoningEffort enum.
fn parse_openai_reasoning_effort(effort: &str) -> Res<ReasoningEffort> {
    match effort.to_lowercase().as_str() {
        "low" => Ok(ReasoningEffort::Low),
        "medium" => Ok(ReasoningEffort::Medium),
        "high" => Ok(ReasoningEffort::High),
        _ => Err(crate::base::types::Err::msg(format!("Invalid reasoning effort: {effort}. Must be one of: low, medium, high"))),
    }
}

// Tests.
