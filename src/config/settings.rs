//! Broadcast settings and Bot API configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::DEFAULT_API_BASE_URL;

/// Bot API endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Bot API, without the `/bot<token>` suffix.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for `sendMessage` and `getChat` requests, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout for the best-effort `getMe` identity lookup, in seconds.
    #[serde(default = "default_identity_timeout")]
    pub identity_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_API_BASE_URL.to_owned()
}

fn default_request_timeout() -> u64 {
    15
}

fn default_identity_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            identity_timeout_secs: default_identity_timeout(),
        }
    }
}

impl ApiConfig {
    /// Creates configuration pointing at the given base URL with default timeouts.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Creates configuration from environment variables.
    ///
    /// Reads `BOT_API_BASE_URL`, `BROADCAST_TIMEOUT_SECS` and
    /// `BROADCAST_IDENTITY_TIMEOUT_SECS`; all are optional.
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout variable is set but not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var("BOT_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_owned())
            .unwrap_or_else(|_| default_base_url());

        let config = Self {
            base_url,
            request_timeout_secs: parse_or(env_var("BROADCAST_TIMEOUT_SECS"), default_request_timeout())?,
            identity_timeout_secs: parse_or(
                env_var("BROADCAST_IDENTITY_TIMEOUT_SECS"),
                default_identity_timeout(),
            )?,
        };

        if config.request_timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                name: "BROADCAST_TIMEOUT_SECS",
                reason: "must be greater than zero",
            });
        }

        Ok(config)
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Returns the identity lookup timeout.
    #[must_use]
    pub const fn identity_timeout(&self) -> Duration {
        Duration::from_secs(self.identity_timeout_secs)
    }
}

/// Paths of the three input files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputPaths {
    /// One bot token per line.
    pub credentials: PathBuf,

    /// One chat id, `@handle` or `t.me` link per line.
    pub targets: PathBuf,

    /// Message template(s).
    pub templates: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            credentials: PathBuf::from("tokens.txt"),
            targets: PathBuf::from("chat_ids.txt"),
            templates: PathBuf::from("messages.txt"),
        }
    }
}

/// Pacing, retry and mode settings for a broadcast run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastSettings {
    /// Pause after a send to a private chat or channel handle, in seconds.
    #[serde(default = "default_base_delay_private")]
    pub base_delay_private_secs: f64,

    /// Pause after a send to a group or supergroup, in seconds.
    #[serde(default = "default_base_delay_group")]
    pub base_delay_group_secs: f64,

    /// Upper bound of the random jitter added to every per-chat pause.
    #[serde(default = "default_jitter_max")]
    pub jitter_max_secs: f64,

    /// Ceiling on sends in any trailing one-second window, across all bots.
    #[serde(default = "default_global_max_per_sec")]
    pub global_max_per_sec: usize,

    /// Retry budget for network failures and 5xx responses (429 is not counted).
    #[serde(default = "default_max_retries_other")]
    pub max_retries_other: u32,

    /// Send with `parse_mode = HTML`.
    #[serde(default)]
    pub use_html: bool,

    /// Suppress link previews in sent messages.
    #[serde(default = "default_true")]
    pub disable_web_page_preview: bool,

    /// Repeat rounds forever instead of running once.
    #[serde(default)]
    pub run_forever: bool,

    /// Pause between rounds in continuous mode, in seconds.
    #[serde(default = "default_round_interval")]
    pub round_interval_secs: u64,

    /// Upper bound of the random jitter added to the round interval, in seconds.
    #[serde(default = "default_round_jitter_max")]
    pub round_jitter_max_secs: f64,

    /// Resolve handles and links to numeric ids through `getChat` per bot.
    #[serde(default = "default_true")]
    pub resolve_targets: bool,

    /// Split the template file on blank lines into several templates.
    #[serde(default = "default_true")]
    pub split_templates: bool,
}

fn default_base_delay_private() -> f64 {
    2.0
}

fn default_base_delay_group() -> f64 {
    3.0
}

fn default_jitter_max() -> f64 {
    0.5
}

fn default_global_max_per_sec() -> usize {
    25 // stays under the ~30 msg/s Bot API ceiling
}

fn default_max_retries_other() -> u32 {
    3
}

fn default_round_interval() -> u64 {
    600
}

fn default_round_jitter_max() -> f64 {
    10.0
}

fn default_true() -> bool {
    true
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            base_delay_private_secs: default_base_delay_private(),
            base_delay_group_secs: default_base_delay_group(),
            jitter_max_secs: default_jitter_max(),
            global_max_per_sec: default_global_max_per_sec(),
            max_retries_other: default_max_retries_other(),
            use_html: false,
            disable_web_page_preview: true,
            run_forever: false,
            round_interval_secs: default_round_interval(),
            round_jitter_max_secs: default_round_jitter_max(),
            resolve_targets: true,
            split_templates: true,
        }
    }
}

impl BroadcastSettings {
    /// Creates settings from `BROADCAST_*` environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_env_with_defaults() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Creates settings from a variable lookup, using defaults for unset names.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unparsable value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &'static str| lookup(name).map(|raw| (name, raw));

        Ok(Self {
            base_delay_private_secs: parse_or(
                value("BROADCAST_BASE_DELAY_PRIVATE"),
                default_base_delay_private(),
            )?,
            base_delay_group_secs: parse_or(
                value("BROADCAST_BASE_DELAY_GROUP"),
                default_base_delay_group(),
            )?,
            jitter_max_secs: parse_or(value("BROADCAST_JITTER_MAX"), default_jitter_max())?,
            global_max_per_sec: parse_or(
                value("BROADCAST_GLOBAL_MAX_PER_SEC"),
                default_global_max_per_sec(),
            )?,
            max_retries_other: parse_or(
                value("BROADCAST_MAX_RETRIES"),
                default_max_retries_other(),
            )?,
            use_html: flag_or(value("BROADCAST_USE_HTML"), false)?,
            disable_web_page_preview: flag_or(value("BROADCAST_DISABLE_PREVIEW"), true)?,
            run_forever: flag_or(value("BROADCAST_RUN_FOREVER"), false)?,
            round_interval_secs: parse_or(
                value("BROADCAST_ROUND_INTERVAL"),
                default_round_interval(),
            )?,
            round_jitter_max_secs: parse_or(
                value("BROADCAST_ROUND_JITTER_MAX"),
                default_round_jitter_max(),
            )?,
            resolve_targets: flag_or(value("BROADCAST_RESOLVE_TARGETS"), true)?,
            split_templates: flag_or(value("BROADCAST_SPLIT_TEMPLATES"), true)?,
        })
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("BROADCAST_BASE_DELAY_PRIVATE", self.base_delay_private_secs),
            ("BROADCAST_BASE_DELAY_GROUP", self.base_delay_group_secs),
            ("BROADCAST_JITTER_MAX", self.jitter_max_secs),
            ("BROADCAST_ROUND_JITTER_MAX", self.round_jitter_max_secs),
        ];

        for (name, value) in durations {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::OutOfRange {
                    name,
                    reason: "must be a non-negative number of seconds that fits in a duration",
                });
            }
        }

        if self.global_max_per_sec == 0 {
            return Err(ConfigError::OutOfRange {
                name: "BROADCAST_GLOBAL_MAX_PER_SEC",
                reason: "must be at least 1",
            });
        }

        Ok(())
    }

    /// Pause after a send to a private-like chat.
    #[must_use]
    pub fn base_delay_private(&self) -> Duration {
        seconds(self.base_delay_private_secs)
    }

    /// Pause after a send to a group-like chat.
    #[must_use]
    pub fn base_delay_group(&self) -> Duration {
        seconds(self.base_delay_group_secs)
    }

    /// Per-chat jitter upper bound.
    #[must_use]
    pub fn jitter_max(&self) -> Duration {
        seconds(self.jitter_max_secs)
    }

    /// Pause between rounds, before jitter.
    #[must_use]
    pub const fn round_interval(&self) -> Duration {
        Duration::from_secs(self.round_interval_secs)
    }

    /// Round jitter upper bound.
    #[must_use]
    pub fn round_jitter_max(&self) -> Duration {
        seconds(self.round_jitter_max_secs)
    }
}

/// Converts seconds to a duration, saturating values `validate` would reject.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

/// Parses a `(name, raw)` variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(
    var: Option<(&'static str, String)>,
    default: T,
) -> Result<T, ConfigError> {
    match var {
        Some((name, raw)) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}

/// Parses a boolean flag accepting `true/false`, `1/0`, `yes/no` and `on/off`.
fn flag_or(var: Option<(&'static str, String)>, default: bool) -> Result<bool, ConfigError> {
    match var {
        Some((name, raw)) => {
            parse_flag(&raw).ok_or(ConfigError::InvalidValue { name, value: raw })
        }
        None => Ok(default),
    }
}

fn env_var(name: &'static str) -> Option<(&'static str, String)> {
    std::env::var(name).ok().map(|raw| (name, raw))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Setting {name} is out of range: {reason}")]
    OutOfRange {
        name: &'static str,
        reason: &'static str,
    },
}
