//! Standalone validator for broadcast input files.
//!
//! Checks the token, target and message files the broadcaster reads,
//! without contacting the Bot API.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use bot_broadcaster::config::{BroadcastInputs, InputPaths, MAX_MESSAGE_LENGTH};
use bot_broadcaster::scheduler::ChatKind;
use bot_broadcaster::telegram::{ChatTarget, normalize_handle, parse_chat_id};

/// Broadcast input validator.
#[derive(Parser, Debug)]
#[command(name = "validate_inputs")]
#[command(about = "Validates token, target and message files for the broadcaster")]
#[command(version)]
struct Args {
    /// File with one bot token per line.
    #[arg(short = 't', long, default_value = "tokens.txt")]
    tokens: PathBuf,

    /// File with one chat id, @handle or t.me link per line.
    #[arg(short = 'c', long, default_value = "chat_ids.txt")]
    chats: PathBuf,

    /// Message template file.
    #[arg(short, long, default_value = "messages.txt")]
    messages: PathBuf,

    /// Treat the whole message file as one template.
    #[arg(long)]
    single_message: bool,

    /// Show detailed information for each target and template.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let paths = InputPaths {
        credentials: args.tokens.clone(),
        targets: args.chats.clone(),
        templates: args.messages.clone(),
    };

    println!("Validating:");
    println!("  tokens:   {}", paths.credentials.display());
    println!("  targets:  {}", paths.targets.display());
    println!("  messages: {}\n", paths.templates.display());

    let inputs = match BroadcastInputs::load(&paths, !args.single_message) {
        Ok(inputs) => inputs,
        Err(e) => {
            eprintln!("✗ {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut problems = 0usize;
    problems += check_tokens(&inputs);
    report_targets(&inputs, args.verbose);
    problems += check_templates(&inputs, args.verbose);

    println!();
    if problems == 0 {
        println!("✓ Inputs are valid");
        ExitCode::SUCCESS
    } else {
        eprintln!("✗ Found {problems} problem(s)");
        ExitCode::FAILURE
    }
}

/// Bot tokens look like `<digits>:<secret>`.
fn check_tokens(inputs: &BroadcastInputs) -> usize {
    println!("Tokens: {}", inputs.credentials.len());
    let mut problems = 0;
    for (index, credential) in inputs.credentials.iter().enumerate() {
        let well_formed = credential
            .expose()
            .split_once(':')
            .is_some_and(|(id, secret)| {
                !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()) && !secret.is_empty()
            });
        if !well_formed {
            eprintln!("  ✗ token #{} ({credential}) is not in <id>:<secret> form", index + 1);
            problems += 1;
        }
    }
    problems
}

fn report_targets(inputs: &BroadcastInputs, verbose: bool) {
    let mut groups = 0;
    let mut private = 0;
    let mut handles = 0;

    for token in &inputs.targets {
        let line = match parse_chat_id(token) {
            Some(id) => match ChatKind::of(&ChatTarget::Id(id)) {
                ChatKind::Group => {
                    groups += 1;
                    format!("{token}: group/channel id")
                }
                ChatKind::Private => {
                    private += 1;
                    format!("{token}: private chat id")
                }
            },
            None => {
                handles += 1;
                format!("{token}: resolved per bot as {}", normalize_handle(token))
            }
        };
        if verbose {
            println!("  {line}");
        }
    }

    println!(
        "Targets: {} ({groups} group ids, {private} private ids, {handles} handles)",
        inputs.targets.len()
    );
}

fn check_templates(inputs: &BroadcastInputs, verbose: bool) -> usize {
    println!("Templates: {}", inputs.templates.len());
    if verbose {
        for (index, text) in inputs.templates.iter().enumerate() {
            println!("  #{} ({} chars)", index + 1, text.chars().count());
        }
    }

    let oversized = inputs.oversized_templates();
    for index in &oversized {
        eprintln!(
            "  ✗ template #{} exceeds {MAX_MESSAGE_LENGTH} characters",
            index + 1
        );
    }
    oversized.len()
}
