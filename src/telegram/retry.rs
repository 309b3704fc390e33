//! Reply classification and backoff timing for the delivery state machine.

use std::time::Duration;

use rand::Rng;

use super::ApiReply;

/// Cap of the exponential part of the backoff.
pub const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Upper bound of the jitter added to each backoff.
pub const BACKOFF_JITTER_MAX: Duration = Duration::from_millis(250);

/// Added on top of the server-advised `retry_after`.
pub const RATE_LIMIT_MARGIN: Duration = Duration::from_millis(250);

/// Used when a 429 reply carries no usable `retry_after`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

/// What a reply means for the delivery state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyClass {
    /// HTTP 200.
    Success,

    /// HTTP 429; wait `retry_after` seconds and try again.
    RateLimited { retry_after: u64 },

    /// Retrying cannot help (bad token, bad request, blocked, unknown code).
    Permanent { code: i64, description: String },

    /// 5xx; retry within the transient budget.
    ServerError { code: i64, description: String },
}

/// Classifies a raw Bot API reply.
///
/// The HTTP status decides success and rate limiting; everything else uses
/// the JSON `error_code`, falling back to the HTTP status.
#[must_use]
pub fn classify(reply: &ApiReply) -> ReplyClass {
    if reply.status == 200 {
        return ReplyClass::Success;
    }

    let payload = reply.payload.as_ref();

    if reply.status == 429 {
        let retry_after = payload
            .and_then(super::ApiResponse::retry_after)
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return ReplyClass::RateLimited { retry_after };
    }

    let code = payload
        .and_then(|p| p.error_code)
        .unwrap_or_else(|| i64::from(reply.status));
    let description = payload.and_then(|p| p.description.clone());

    match code {
        400 | 401 | 403 => ReplyClass::Permanent {
            code,
            description: description.unwrap_or_default(),
        },
        500..=599 => ReplyClass::ServerError {
            code,
            description: description.unwrap_or_default(),
        },
        _ => ReplyClass::Permanent {
            code,
            description: reply.raw.clone(),
        },
    }
}

/// Base backoff before retry number `attempt` (1-based): `min(2^attempt, 8)` seconds.
#[must_use]
pub fn backoff_base(attempt: u32) -> Duration {
    let secs = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

/// Backoff with jitter before retry number `attempt`.
#[must_use]
pub fn backoff_delay(attempt: u32) -> Duration {
    backoff_base(attempt) + random_jitter(BACKOFF_JITTER_MAX)
}

/// Wait applied for a 429 reply.
#[must_use]
pub const fn rate_limit_wait(retry_after: u64) -> Duration {
    Duration::from_secs(retry_after).saturating_add(RATE_LIMIT_MARGIN)
}

/// Uniformly random duration in `[0, max]`.
#[must_use]
pub fn random_jitter(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    let secs = rand::thread_rng().gen_range(0.0..=max.as_secs_f64());
    Duration::try_from_secs_f64(secs).map_or(max, |jitter| jitter.min(max))
}
