//! Core components, types, and utilities for the incident-bot.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - The incident report schema (fields, labels, questions).
//! - User-facing message texts and LLM directives.
//! - Common types and result handling.

pub mod config;
pub mod input;
pub mod messages;
pub mod prompts;
pub mod schema;
pub mod types;
