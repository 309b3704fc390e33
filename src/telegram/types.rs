//! Bot API wire types and broadcast domain types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A bot token.
///
/// `Debug` and `Display` only show the last six characters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Wraps a raw bot token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token for building request URLs.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the token as `****` followed by its last six characters.
    #[must_use]
    pub fn masked(&self) -> String {
        let count = self.0.chars().count();
        let tail: String = self.0.chars().skip(count.saturating_sub(6)).collect();
        format!("****{tail}")
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl std::fmt::Display for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.masked())
    }
}

/// Canonical numeric chat identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Destination of a single send.
///
/// `Username` is only produced when handle resolution is disabled and the
/// handle is passed to the API as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatTarget {
    Id(ChatId),
    Username(String),
}

impl std::fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => f.write_str(name),
        }
    }
}

impl From<ChatId> for ChatTarget {
    fn from(id: ChatId) -> Self {
        Self::Id(id)
    }
}

/// Text formatting mode for `sendMessage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

/// Options applied to every outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOptions {
    pub disable_web_page_preview: bool,
    pub parse_mode: Option<ParseMode>,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            disable_web_page_preview: true,
            parse_mode: None,
        }
    }
}

/// JSON body of a `sendMessage` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    pub chat_id: ChatTarget,
    pub text: String,
    pub disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
}

impl SendMessageRequest {
    #[must_use]
    pub fn new(chat_id: ChatTarget, text: impl Into<String>, options: MessageOptions) -> Self {
        Self {
            chat_id,
            text: text.into(),
            disable_web_page_preview: options.disable_web_page_preview,
            parse_mode: options.parse_mode,
        }
    }
}

/// Standard Bot API response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parameters: Option<ResponseParameters>,
}

impl ApiResponse {
    /// Deserializes `result` into `T` when the call succeeded.
    #[must_use]
    pub fn result_as<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.ok {
            return None;
        }
        self.result
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Server-advised wait in seconds, if present.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        self.parameters.as_ref().and_then(|p| p.retry_after)
    }
}

/// Extra error details attached to some failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseParameters {
    #[serde(default)]
    pub retry_after: Option<u64>,
}

/// Subset of the `getChat` result.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatInfo {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

/// Subset of the `getMe` result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

impl std::fmt::Display for BotIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.username {
            Some(name) => write!(f, "@{name} (id {})", self.id),
            None => write!(f, "id {}", self.id),
        }
    }
}

/// A raw HTTP reply: status, the parsed envelope if the body was JSON, and the body.
#[derive(Debug, Clone)]
pub struct ApiReply {
    pub status: u16,
    pub payload: Option<ApiResponse>,
    pub raw: String,
}

impl ApiReply {
    /// Builds a reply from a status and body, parsing the body when possible.
    #[must_use]
    pub fn new(status: u16, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let payload = serde_json::from_str(&raw).ok();
        Self {
            status,
            payload,
            raw,
        }
    }
}
