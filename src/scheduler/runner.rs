//! Broadcast scheduler.
//!
//! Runs a single round, or rounds forever with a pause of
//! `interval + uniform(0, jitter_max)` between the end of one round and the
//! start of the next.

use std::time::Duration;

use chrono::Local;
use tracing::info;

use super::Broadcaster;
use super::state::RoundReport;
use crate::config::BroadcastSettings;
use crate::telegram::{BotApi, random_jitter};

/// How many rounds to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One round, then return.
    Once,
    /// Rounds until the process is terminated.
    Continuous {
        interval: Duration,
        jitter_max: Duration,
    },
}

impl RunMode {
    #[must_use]
    pub fn from_settings(settings: &BroadcastSettings) -> Self {
        if settings.run_forever {
            Self::Continuous {
                interval: settings.round_interval(),
                jitter_max: settings.round_jitter_max(),
            }
        } else {
            Self::Once
        }
    }
}

/// Drives a [`Broadcaster`] according to a [`RunMode`].
pub struct BroadcastScheduler<A> {
    broadcaster: Broadcaster<A>,
    mode: RunMode,
}

impl<A: BotApi> BroadcastScheduler<A> {
    #[must_use]
    pub const fn new(broadcaster: Broadcaster<A>, mode: RunMode) -> Self {
        Self { broadcaster, mode }
    }

    #[must_use]
    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    /// Runs rounds according to the mode.
    ///
    /// In [`RunMode::Once`] returns the single round's report; in
    /// [`RunMode::Continuous`] never returns.
    pub async fn run(&self) -> RoundReport {
        match self.mode {
            RunMode::Once => {
                let report = self.broadcaster.run_round().await;
                info!("Done (single round mode)");
                report
            }
            RunMode::Continuous {
                interval,
                jitter_max,
            } => loop {
                self.broadcaster.run_round().await;

                let pause = round_pause(interval, jitter_max);
                let next = Local::now()
                    + chrono::Duration::from_std(pause).unwrap_or_else(|_| chrono::Duration::zero());
                info!(
                    "Waiting {:.1}s until next round (at {})",
                    pause.as_secs_f64(),
                    next.format("%H:%M:%S")
                );
                tokio::time::sleep(pause).await;
            },
        }
    }
}

/// Pause between rounds: `interval` plus up to `jitter_max`, saturating.
fn round_pause(interval: Duration, jitter_max: Duration) -> Duration {
    interval.saturating_add(random_jitter(jitter_max))
}

impl<A> std::fmt::Debug for BroadcastScheduler<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastScheduler")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}
