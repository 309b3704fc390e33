//! Per-chat pause between consecutive sends.

use std::time::Duration;

use crate::config::BroadcastSettings;
use crate::telegram::{ChatTarget, random_jitter};

/// Rough chat category used to pick a pause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// Groups, supergroups and channels (negative ids).
    Group,
    /// Everything else, including handles that were never resolved.
    Private,
}

impl ChatKind {
    /// Classifies a target by the sign of its numeric id.
    #[must_use]
    pub const fn of(target: &ChatTarget) -> Self {
        match target {
            ChatTarget::Id(id) if id.0 < 0 => Self::Group,
            _ => Self::Private,
        }
    }
}

/// Computes the pause after a send: a per-kind base plus random jitter.
#[derive(Debug, Clone, Copy)]
pub struct DelayPolicy {
    group_base: Duration,
    private_base: Duration,
    jitter_max: Duration,
}

impl DelayPolicy {
    #[must_use]
    pub const fn new(group_base: Duration, private_base: Duration, jitter_max: Duration) -> Self {
        Self {
            group_base,
            private_base,
            jitter_max,
        }
    }

    #[must_use]
    pub fn from_settings(settings: &BroadcastSettings) -> Self {
        Self::new(
            settings.base_delay_group(),
            settings.base_delay_private(),
            settings.jitter_max(),
        )
    }

    /// Base pause for a chat kind, before jitter.
    #[must_use]
    pub const fn base_for(&self, kind: ChatKind) -> Duration {
        match kind {
            ChatKind::Group => self.group_base,
            ChatKind::Private => self.private_base,
        }
    }

    /// Pause to apply after sending to `target`.
    #[must_use]
    pub fn delay_for(&self, target: &ChatTarget) -> Duration {
        self.base_for(ChatKind::of(target))
            .saturating_add(random_jitter(self.jitter_max))
    }
}

impl Default for DelayPolicy {
    fn default() -> Self {
        Self::from_settings(&BroadcastSettings::default())
    }
}
