//! Bot Broadcaster - Main Entry Point
//!
//! Sends message templates to a list of chats through one or more bots,
//! once or on a fixed interval.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use bot_broadcaster::config::{ApiConfig, BroadcastInputs, BroadcastSettings, InputPaths};
use bot_broadcaster::scheduler::{BroadcastScheduler, Broadcaster, RunMode};
use bot_broadcaster::telegram::{HttpBotApi, RateLimiter};

/// Rate-limited bulk message broadcaster for Telegram bots.
#[derive(Parser, Debug)]
#[command(name = "broadcast")]
#[command(about = "Broadcast message templates to Telegram chats through one or more bots")]
#[command(version)]
struct Args {
    /// File with one bot token per line.
    #[arg(short = 't', long, default_value = "tokens.txt")]
    tokens: PathBuf,

    /// File with one chat id, @handle or t.me link per line.
    #[arg(short = 'c', long, default_value = "chat_ids.txt")]
    chats: PathBuf,

    /// Message template file (blocks separated by blank lines).
    #[arg(short, long, default_value = "messages.txt")]
    messages: PathBuf,

    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Run a single round, overriding BROADCAST_RUN_FOREVER.
    #[arg(long, conflicts_with = "forever")]
    once: bool,

    /// Repeat rounds on the configured interval.
    #[arg(long)]
    forever: bool,

    /// Send to targets as written instead of resolving them per bot.
    #[arg(long)]
    no_resolve: bool,

    /// Use the whole message file as one template.
    #[arg(long)]
    single_message: bool,

    /// Send messages with parse_mode HTML.
    #[arg(long)]
    html: bool,

    /// Print the effective settings as JSON and exit.
    #[arg(long)]
    show_config: bool,
}

impl Args {
    /// Applies command-line toggles on top of environment settings.
    fn apply_overrides(&self, settings: &mut BroadcastSettings) {
        if self.once {
            settings.run_forever = false;
        }
        if self.forever {
            settings.run_forever = true;
        }
        if self.no_resolve {
            settings.resolve_targets = false;
        }
        if self.single_message {
            settings.split_templates = false;
        }
        if self.html {
            settings.use_html = true;
        }
    }

    fn input_paths(&self) -> InputPaths {
        InputPaths {
            credentials: self.tokens.clone(),
            targets: self.chats.clone(),
            templates: self.messages.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Load configurations
    let api_config = ApiConfig::from_env().context("Failed to load Bot API configuration")?;

    let mut settings = BroadcastSettings::from_env_with_defaults()
        .context("Failed to load broadcast settings from environment")?;
    args.apply_overrides(&mut settings);
    settings.validate().context("Invalid broadcast settings")?;

    if args.show_config {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        println!("{}", serde_json::to_string_pretty(&api_config)?);
        return Ok(());
    }

    let inputs = BroadcastInputs::load(&args.input_paths(), settings.split_templates)
        .context("Failed to load broadcast inputs")?;

    for index in inputs.oversized_templates() {
        warn!(
            "Template #{} is longer than the Bot API message limit and will be rejected",
            index + 1
        );
    }

    info!(
        "Start. Bots: {}, targets (raw): {}, templates: {}",
        inputs.credentials.len(),
        inputs.targets.len(),
        inputs.templates.len()
    );

    let api = Arc::new(HttpBotApi::new(api_config).context("Failed to build HTTP client")?);
    let rate_limiter = Arc::new(RateLimiter::new(settings.global_max_per_sec));
    let broadcaster = Broadcaster::new(api, Arc::new(inputs), &settings, rate_limiter);
    let scheduler = BroadcastScheduler::new(broadcaster, RunMode::from_settings(&settings));

    info!("Run mode: {:?}", scheduler.mode());

    tokio::select! {
        report = scheduler.run() => {
            info!(
                "Finished: {} delivered, {} failed",
                report.delivered(),
                report.failed()
            );
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
