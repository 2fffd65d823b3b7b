//! Library root for `incident-bot`.
//!
//! Incident-bot is a Slack direct-message assistant for security incident intake, designed to:
//! - Walk a reporter through a fixed preface and report questionnaire
//! - Rewrite free-text answers into concise prose for confirmation
//! - Render the answers as a Markdown incident report
//! - File the report in Jira, or update the issue the reporter shared
//!
//! The bot integrates with Slack for chat, OpenAI for rewriting, and Jira for
//! filing. State lives in process memory. The architecture is built around
//! extensible traits that allow for different implementations of each service.

pub mod base;
pub mod interaction;
pub mod render;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the incident-bot runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the store, LLM, tracker, and chat clients
/// - Starts the main event loop for processing events
pub async fn start(config: Config) -> Void {
    info!("Starting incident-bot ...");

    // Start the crypto provider.
    crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install the rustls crypto provider."))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
