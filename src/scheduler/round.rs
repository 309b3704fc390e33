//! One broadcast round: every bot sends to every target it can reach.
//!
//! For each credential, in input order:
//! 1. Log the bot identity (best effort)
//! 2. Resolve all targets for this bot, skipping those it cannot see
//! 3. For each resolved target: throttle, pick a template, send, log, pause

use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{error, info, warn};

use super::DelayPolicy;
use super::state::{CredentialReport, RoundReport};
use crate::config::{BroadcastInputs, BroadcastSettings};
use crate::telegram::{
    BotApi, ChatResolver, ChatTarget, Credential, DeliveryClient, MessageOptions, ParseMode,
    RateLimiter, SendOutcome, fetch_identity, target_without_lookup,
};

/// Runs broadcast rounds over a fixed set of inputs.
pub struct Broadcaster<A> {
    api: Arc<A>,
    client: DeliveryClient<Arc<A>>,
    resolver: ChatResolver<Arc<A>>,
    rate_limiter: Arc<RateLimiter>,
    delay_policy: DelayPolicy,
    inputs: Arc<BroadcastInputs>,
    resolve_targets: bool,
}

impl<A: BotApi> Broadcaster<A> {
    /// Creates a broadcaster from settings.
    #[must_use]
    pub fn new(
        api: Arc<A>,
        inputs: Arc<BroadcastInputs>,
        settings: &BroadcastSettings,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        let options = MessageOptions {
            disable_web_page_preview: settings.disable_web_page_preview,
            parse_mode: settings.use_html.then_some(ParseMode::Html),
        };

        Self {
            client: DeliveryClient::new(Arc::clone(&api), options, settings.max_retries_other),
            resolver: ChatResolver::new(Arc::clone(&api)),
            api,
            rate_limiter,
            delay_policy: DelayPolicy::from_settings(settings),
            inputs,
            resolve_targets: settings.resolve_targets,
        }
    }

    /// Replaces the pause policy.
    #[must_use]
    pub const fn with_delay_policy(mut self, policy: DelayPolicy) -> Self {
        self.delay_policy = policy;
        self
    }

    /// Sends one round and returns its tallies.
    pub async fn run_round(&self) -> RoundReport {
        info!("Starting round");
        let mut report = RoundReport::start();

        for credential in &self.inputs.credentials {
            let credential_report = self.run_credential(credential).await;
            report.credentials.push(credential_report);
        }

        info!(
            "Round finished: {} delivered, {} failed, {} unresolved, {} bot(s) skipped",
            report.delivered(),
            report.failed(),
            report.unresolved(),
            report.skipped_credentials()
        );
        report
    }

    async fn run_credential(&self, credential: &Credential) -> CredentialReport {
        let mut report = CredentialReport::new(credential.masked());

        report.identity = fetch_identity(self.api.as_ref(), credential).await;
        match &report.identity {
            Some(identity) => info!("Bot active: {}", identity),
            None => warn!("getMe failed for token {}, trying to send anyway", credential),
        }

        self.resolve_all(credential, &mut report).await;
        if report.resolved.is_empty() {
            warn!("No usable targets for token {}, skipping", credential);
            return report;
        }

        info!(
            "===== Bot {} | valid targets: {} =====",
            credential,
            report.resolved.len()
        );

        let targets = report.resolved.clone();
        for target in &targets {
            self.rate_limiter.admit().await;

            let Some(text) = self.inputs.templates.choose(&mut rand::thread_rng()).cloned() else {
                warn!("No templates loaded, nothing to send");
                break;
            };

            match self.client.send(credential, target, &text).await {
                SendOutcome::Delivered { .. } => {
                    report.delivered += 1;
                    info!("Sent to {}", target);
                }
                SendOutcome::PermanentFailure { code, description } => {
                    report.failed += 1;
                    error!("Failed to send to {}: {} | {}", target, code, description);
                }
                SendOutcome::TransientExhausted { detail } => {
                    report.failed += 1;
                    error!("Failed to send to {}: {}", target, detail);
                }
            }

            let pause = self.delay_policy.delay_for(target);
            info!("Pausing {:.2}s before next target", pause.as_secs_f64());
            tokio::time::sleep(pause).await;
        }

        report
    }

    async fn resolve_all(&self, credential: &Credential, report: &mut CredentialReport) {
        for token in &self.inputs.targets {
            if !self.resolve_targets {
                report.resolved.push(target_without_lookup(token));
                continue;
            }

            match self.resolver.resolve(credential, token).await {
                Some(id) => report.resolved.push(ChatTarget::Id(id)),
                None => {
                    warn!(
                        "Could not resolve '{}' for token {}. Check the bot has access and the username is right",
                        token, credential
                    );
                    report.unresolved.push(token.clone());
                }
            }
        }
    }
}

impl<A> std::fmt::Debug for Broadcaster<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("rate_limiter", &self.rate_limiter)
            .field("delay_policy", &self.delay_policy)
            .field("resolve_targets", &self.resolve_targets)
            .finish_non_exhaustive()
    }
}
