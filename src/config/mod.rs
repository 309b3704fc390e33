//! Configuration module for the broadcaster.
//!
//! Handles loading of the credential, target and template files and the
//! pacing/retry settings read from the environment.

mod inputs;
mod settings;

pub use inputs::{
    BroadcastInputs, InputError, InputKind, parse_lines, read_lines, split_templates_text,
};
pub use settings::{ApiConfig, BroadcastSettings, ConfigError, InputPaths};

/// Default Bot API base URL.
pub const DEFAULT_API_BASE_URL: &str = "https://api.telegram.org";

/// Maximum text length of a single Bot API message.
pub const MAX_MESSAGE_LENGTH: usize = 4096;
