//! Event handling and user interactions for incident-bot.
//!
//! This module provides functionality for handling chat events:
//! - Driving the per-thread intake questionnaire from direct messages
//! - Offering an intake when an incident issue link is shared
//! - Handling link buttons, the pending-incident picker and the App Home tab

pub mod app_home;
pub mod block_action;
pub mod command;
pub mod conversation;
pub mod dm_message;
pub mod event;
pub mod intake;
pub mod link_shared;
