//! Resolution of chat ids, `@handles` and `t.me` links to numeric chat ids.
//!
//! Resolution goes through `getChat` with a specific bot's token, so the same
//! handle can resolve for one bot and fail for another that is not a member.

use tracing::debug;

use super::client::BotApi;
use super::types::{ChatId, ChatInfo, ChatTarget, Credential};

/// Share-link prefixes stripped before lookup, longest first.
const LINK_PREFIXES: [&str; 3] = ["https://t.me/", "http://t.me/", "t.me/"];

/// Parses a token that is already a numeric chat id.
#[must_use]
pub fn parse_chat_id(token: &str) -> Option<ChatId> {
    token.trim().parse().ok().map(ChatId)
}

/// Normalizes a handle or share link to the `@handle` form `getChat` expects.
///
/// `foo`, `@foo`, `t.me/foo` and `https://t.me/foo/42` all become `@foo`.
#[must_use]
pub fn normalize_handle(token: &str) -> String {
    let token = token.trim();

    let handle = LINK_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .map_or(token, |rest| {
            rest.split(['/', '?', '#']).next().unwrap_or_default()
        });

    if handle.starts_with('@') {
        handle.to_owned()
    } else {
        format!("@{handle}")
    }
}

/// Turns a raw token into a send target without any network call.
///
/// Used when resolution is disabled: numeric ids pass through, anything else
/// is sent as a normalized `@handle`.
#[must_use]
pub fn target_without_lookup(token: &str) -> ChatTarget {
    parse_chat_id(token).map_or_else(
        || ChatTarget::Username(normalize_handle(token)),
        ChatTarget::Id,
    )
}

/// Resolves destination tokens through a [`BotApi`].
#[derive(Debug, Clone)]
pub struct ChatResolver<A> {
    api: A,
}

impl<A: BotApi> ChatResolver<A> {
    #[must_use]
    pub const fn new(api: A) -> Self {
        Self { api }
    }

    /// Resolves `token` for `credential`; `None` if the bot cannot see the chat.
    pub async fn resolve(&self, credential: &Credential, token: &str) -> Option<ChatId> {
        if let Some(id) = parse_chat_id(token) {
            return Some(id);
        }

        let handle = normalize_handle(token);
        let reply = match self.api.get_chat(credential, &handle).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!("getChat {} failed: {}", handle, e);
                return None;
            }
        };

        let Some(chat) = reply.payload.and_then(|p| p.result_as::<ChatInfo>()) else {
            debug!("getChat {} returned no chat (HTTP {})", handle, reply.status);
            return None;
        };

        debug!(
            "Resolved {} to {} ({}, {})",
            handle,
            chat.id,
            chat.kind.as_deref().unwrap_or("unknown type"),
            chat.title.as_deref().or(chat.username.as_deref()).unwrap_or("untitled")
        );
        Some(ChatId(chat.id))
    }
}
