//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the incident-bot:
//! - Chat services (e.g., Slack)
//! - LLM services (e.g., OpenAI)
//! - Issue trackers (e.g., Jira)
//! - Document stores (e.g., Google Docs)
//! - The in-memory conversation and session store
//!
//! Each external service module defines both a generic trait and a concrete
//! implementation, allowing for extensibility and easy testing.

pub mod chat;
pub mod docs;
pub mod llm;
pub mod state;
pub mod tracker;
