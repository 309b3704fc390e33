//! Scripted in-memory Bot API for driving the delivery and round logic.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::time::Instant;

use bot_broadcaster::telegram::{
    ApiReply, BotApi, ChatTarget, Credential, SendMessageRequest, TransportError,
};

/// One `sendMessage` call as seen by the fake API.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub token: String,
    pub chat_id: ChatTarget,
    pub text: String,
    pub at: Instant,
}

/// Fake API: `sendMessage` replies come from a script (then default to 200),
/// `getChat` succeeds only for registered `(token, handle)` pairs.
#[derive(Default)]
pub struct ScriptedApi {
    send_script: Mutex<VecDeque<Result<ApiReply, TransportError>>>,
    chats: Mutex<HashMap<(String, String), i64>>,
    sends: Mutex<Vec<SentMessage>>,
    get_chat_calls: AtomicUsize,
    get_me_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies for the next `sendMessage` calls.
    pub fn script(self, replies: impl IntoIterator<Item = Result<ApiReply, TransportError>>) -> Self {
        self.send_script.lock().unwrap().extend(replies);
        self
    }

    /// Lets `token` see `handle` as chat `id`.
    pub fn with_chat(self, token: &str, handle: &str, id: i64) -> Self {
        self.chats
            .lock()
            .unwrap()
            .insert((token.to_owned(), handle.to_owned()), id);
        self
    }

    pub fn sends(&self) -> Vec<SentMessage> {
        self.sends.lock().unwrap().clone()
    }

    pub fn sends_for(&self, token: &str) -> Vec<SentMessage> {
        self.sends()
            .into_iter()
            .filter(|sent| sent.token == token)
            .collect()
    }

    pub fn get_chat_calls(&self) -> usize {
        self.get_chat_calls.load(Ordering::SeqCst)
    }

    pub fn get_me_calls(&self) -> usize {
        self.get_me_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BotApi for ScriptedApi {
    async fn send_message(
        &self,
        credential: &Credential,
        request: &SendMessageRequest,
    ) -> Result<ApiReply, TransportError> {
        self.sends.lock().unwrap().push(SentMessage {
            token: credential.expose().to_owned(),
            chat_id: request.chat_id.clone(),
            text: request.text.clone(),
            at: Instant::now(),
        });
        self.send_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ok_reply()))
    }

    async fn get_chat(
        &self,
        credential: &Credential,
        chat: &str,
    ) -> Result<ApiReply, TransportError> {
        self.get_chat_calls.fetch_add(1, Ordering::SeqCst);
        let id = self
            .chats
            .lock()
            .unwrap()
            .get(&(credential.expose().to_owned(), chat.to_owned()))
            .copied();
        Ok(match id {
            Some(id) => ApiReply::new(
                200,
                format!(r#"{{"ok":true,"result":{{"id":{id},"type":"supergroup","title":"t"}}}}"#),
            ),
            None => ApiReply::new(
                400,
                r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
            ),
        })
    }

    async fn get_me(&self, credential: &Credential) -> Result<ApiReply, TransportError> {
        self.get_me_calls.fetch_add(1, Ordering::SeqCst);
        let id: String = credential
            .expose()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        Ok(ApiReply::new(
            200,
            format!(r#"{{"ok":true,"result":{{"id":{id},"is_bot":true,"username":"bot{id}"}}}}"#),
        ))
    }
}

pub fn ok_reply() -> ApiReply {
    ApiReply::new(200, r#"{"ok":true,"result":{"message_id":1}}"#)
}

pub fn error_reply(code: u16, description: &str) -> ApiReply {
    ApiReply::new(
        code,
        format!(r#"{{"ok":false,"error_code":{code},"description":"{description}"}}"#),
    )
}

pub fn rate_limited(retry_after: u64) -> ApiReply {
    ApiReply::new(
        429,
        format!(
            r#"{{"ok":false,"error_code":429,"description":"Too Many Requests: retry after {retry_after}","parameters":{{"retry_after":{retry_after}}}}}"#
        ),
    )
}

pub fn network_error() -> TransportError {
    TransportError::Network("connection reset".to_owned())
}
