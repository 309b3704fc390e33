//! Bot API transport and the message delivery state machine.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::retry::{ReplyClass, backoff_delay, classify, rate_limit_wait};
use super::types::{
    ApiReply, BotIdentity, ChatTarget, Credential, MessageOptions, SendMessageRequest,
};
use crate::config::ApiConfig;

/// Errors raised below the HTTP layer.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            // The URL carries the bot token.
            Self::Network(err.without_url().to_string())
        }
    }
}

/// The three Bot API calls the broadcaster makes.
///
/// Implementations return the raw reply for any HTTP status and only fail
/// on transport problems; interpreting the reply is up to the caller.
#[async_trait]
pub trait BotApi: Send + Sync {
    /// `POST sendMessage`.
    async fn send_message(
        &self,
        credential: &Credential,
        request: &SendMessageRequest,
    ) -> Result<ApiReply, TransportError>;

    /// `GET getChat?chat_id=<handle>`.
    async fn get_chat(&self, credential: &Credential, chat: &str)
    -> Result<ApiReply, TransportError>;

    /// `GET getMe`.
    async fn get_me(&self, credential: &Credential) -> Result<ApiReply, TransportError>;
}

#[async_trait]
impl<T: BotApi + ?Sized> BotApi for Arc<T> {
    async fn send_message(
        &self,
        credential: &Credential,
        request: &SendMessageRequest,
    ) -> Result<ApiReply, TransportError> {
        (**self).send_message(credential, request).await
    }

    async fn get_chat(
        &self,
        credential: &Credential,
        chat: &str,
    ) -> Result<ApiReply, TransportError> {
        (**self).get_chat(credential, chat).await
    }

    async fn get_me(&self, credential: &Credential) -> Result<ApiReply, TransportError> {
        (**self).get_me(credential).await
    }
}

/// [`BotApi`] over HTTPS with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpBotApi {
    http: reqwest::Client,
    config: ApiConfig,
}

impl HttpBotApi {
    /// Creates a client for the given endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ApiConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn method_url(&self, credential: &Credential, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.config.base_url.trim_end_matches('/'),
            credential.expose()
        )
    }

    async fn read_reply(response: reqwest::Response) -> Result<ApiReply, TransportError> {
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(ApiReply::new(status, body))
    }
}

#[async_trait]
impl BotApi for HttpBotApi {
    async fn send_message(
        &self,
        credential: &Credential,
        request: &SendMessageRequest,
    ) -> Result<ApiReply, TransportError> {
        let response = self
            .http
            .post(self.method_url(credential, "sendMessage"))
            .json(request)
            .send()
            .await?;
        Self::read_reply(response).await
    }

    async fn get_chat(
        &self,
        credential: &Credential,
        chat: &str,
    ) -> Result<ApiReply, TransportError> {
        let response = self
            .http
            .get(self.method_url(credential, "getChat"))
            .query(&[("chat_id", chat)])
            .send()
            .await?;
        Self::read_reply(response).await
    }

    async fn get_me(&self, credential: &Credential) -> Result<ApiReply, TransportError> {
        let response = self
            .http
            .get(self.method_url(credential, "getMe"))
            .timeout(self.config.identity_timeout())
            .send()
            .await?;
        Self::read_reply(response).await
    }
}

/// Fetches the bot's own identity; `None` on any failure.
pub async fn fetch_identity<A: BotApi + ?Sized>(
    api: &A,
    credential: &Credential,
) -> Option<BotIdentity> {
    match api.get_me(credential).await {
        Ok(reply) => reply.payload.and_then(|p| p.result_as::<BotIdentity>()),
        Err(e) => {
            debug!("getMe for {} failed: {}", credential, e);
            None
        }
    }
}

/// Final result of delivering one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Accepted by the API after `attempts` counted attempts.
    Delivered { attempts: u32 },

    /// Rejected in a way retrying cannot fix.
    PermanentFailure { code: i64, description: String },

    /// Network or server errors outlasted the retry budget.
    TransientExhausted { detail: String },
}

impl SendOutcome {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

/// Sends messages with rate-limit waits and bounded retries.
///
/// 429 replies are waited out for as long as the server keeps asking and do
/// not count against `max_retries`; network errors and 5xx replies do.
#[derive(Debug, Clone)]
pub struct DeliveryClient<A> {
    api: A,
    options: MessageOptions,
    max_retries: u32,
}

impl<A: BotApi> DeliveryClient<A> {
    #[must_use]
    pub const fn new(api: A, options: MessageOptions, max_retries: u32) -> Self {
        Self {
            api,
            options,
            max_retries,
        }
    }

    /// Delivers `text` to `target` as `credential`.
    pub async fn send(
        &self,
        credential: &Credential,
        target: &ChatTarget,
        text: &str,
    ) -> SendOutcome {
        let request = SendMessageRequest::new(target.clone(), text, self.options);
        let mut attempt: u32 = 1;

        loop {
            let reply = match self.api.send_message(credential, &request).await {
                Ok(reply) => reply,
                Err(e) => {
                    if attempt <= self.max_retries {
                        let backoff = backoff_delay(attempt);
                        warn!(
                            "Network error: {}. Retry {}/{} in {:.2}s",
                            e,
                            attempt,
                            self.max_retries,
                            backoff.as_secs_f64()
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        continue;
                    }
                    error!("Network error to {}: {}. Giving up", target, e);
                    return SendOutcome::TransientExhausted {
                        detail: e.to_string(),
                    };
                }
            };

            match classify(&reply) {
                ReplyClass::Success => return SendOutcome::Delivered { attempts: attempt },
                ReplyClass::RateLimited { retry_after } => {
                    warn!("429 rate limit, told to wait {}s", retry_after);
                    tokio::time::sleep(rate_limit_wait(retry_after)).await;
                }
                ReplyClass::Permanent { code, description } => {
                    match code {
                        401 => error!("401 Unauthorized: token {} is wrong or revoked", credential),
                        403 => error!("403 Forbidden: bot is blocked or lacks rights in {}", target),
                        400 => error!("400 Bad Request: {}", description),
                        _ => debug!("Unhandled reply {} for {}", code, target),
                    }
                    return SendOutcome::PermanentFailure { code, description };
                }
                ReplyClass::ServerError { code, description } => {
                    if attempt <= self.max_retries {
                        let backoff = backoff_delay(attempt);
                        warn!(
                            "Server error {}: {}. Retry {}/{} in {:.2}s",
                            code,
                            description,
                            attempt,
                            self.max_retries,
                            backoff.as_secs_f64()
                        );
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        continue;
                    }
                    error!("Server error {} to {}: retries exhausted", code, target);
                    return SendOutcome::TransientExhausted {
                        detail: format!("{code}: {description}"),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let api = HttpBotApi::new(ApiConfig::with_base_url("http://localhost:9/")).unwrap();
        let url = api.method_url(&Credential::new("1:abc"), "getMe");
        assert_eq!(url, "http://localhost:9/bot1:abc/getMe");
    }

    #[test]
    fn test_outcome_is_delivered() {
        assert!(SendOutcome::Delivered { attempts: 1 }.is_delivered());
        assert!(
            !SendOutcome::TransientExhausted {
                detail: String::new()
            }
            .is_delivered()
        );
    }
}
