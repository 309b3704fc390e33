//! Telegram Bot API module.
//!
//! Provides the HTTP transport, the delivery state machine with retries,
//! chat identifier resolution and the global send throttle.

mod client;
mod rate_limiter;
mod resolver;
mod retry;
mod types;

pub use client::{
    BotApi, DeliveryClient, HttpBotApi, SendOutcome, TransportError, fetch_identity,
};
pub use rate_limiter::RateLimiter;
pub use resolver::{ChatResolver, normalize_handle, parse_chat_id, target_without_lookup};
pub use retry::{
    BACKOFF_JITTER_MAX, DEFAULT_RETRY_AFTER_SECS, MAX_BACKOFF, RATE_LIMIT_MARGIN, ReplyClass,
    backoff_base, backoff_delay, classify, random_jitter, rate_limit_wait,
};
pub use types::{
    ApiReply, ApiResponse, BotIdentity, ChatId, ChatInfo, ChatTarget, Credential, MessageOptions,
    ParseMode, ResponseParameters, SendMessageRequest,
};
