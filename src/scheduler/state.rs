//! Per-round delivery tallies.

use chrono::{DateTime, Local};

use crate::telegram::{BotIdentity, ChatTarget};

/// What happened for one bot during a round.
#[derive(Debug, Clone, Default)]
pub struct CredentialReport {
    /// Masked token.
    pub credential: String,

    /// `getMe` result, if the lookup worked.
    pub identity: Option<BotIdentity>,

    /// Targets this bot could send to, in input order.
    pub resolved: Vec<ChatTarget>,

    /// Raw tokens this bot could not resolve.
    pub unresolved: Vec<String>,

    /// Messages accepted by the API.
    pub delivered: usize,

    /// Messages that ended in a permanent or exhausted failure.
    pub failed: usize,
}

impl CredentialReport {
    #[must_use]
    pub fn new(credential: String) -> Self {
        Self {
            credential,
            ..Self::default()
        }
    }

    /// True when nothing resolved and the bot was skipped.
    #[must_use]
    pub fn skipped(&self) -> bool {
        self.resolved.is_empty()
    }
}

/// Result of one broadcast round.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// Local time the round started.
    pub started_at: DateTime<Local>,

    /// One entry per credential, in input order.
    pub credentials: Vec<CredentialReport>,
}

impl RoundReport {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started_at: Local::now(),
            credentials: Vec::new(),
        }
    }

    #[must_use]
    pub fn delivered(&self) -> usize {
        self.credentials.iter().map(|c| c.delivered).sum()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.credentials.iter().map(|c| c.failed).sum()
    }

    #[must_use]
    pub fn unresolved(&self) -> usize {
        self.credentials.iter().map(|c| c.unresolved.len()).sum()
    }

    #[must_use]
    pub fn skipped_credentials(&self) -> usize {
        self.credentials.iter().filter(|c| c.skipped()).count()
    }
}
