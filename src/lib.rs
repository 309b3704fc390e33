//! Bot Broadcaster Library
//!
//! A bulk message broadcaster for the Telegram Bot API.
//!
//! This crate provides the core functionality for:
//! - Loading bot tokens, targets and message templates from text files
//! - Resolving `@handles` and `t.me` links to chat ids per bot
//! - Sending under a global sliding-window throttle with per-chat pauses
//! - Retrying transient failures and waiting out rate limits
//! - Running rounds once or on a fixed interval

pub mod config;
pub mod scheduler;
pub mod telegram;
