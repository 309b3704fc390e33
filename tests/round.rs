//! Round orchestration and scheduling tests against a scripted API.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use bot_broadcaster::config::{BroadcastInputs, BroadcastSettings, InputPaths};
use bot_broadcaster::scheduler::{BroadcastScheduler, Broadcaster, DelayPolicy, RunMode};
use bot_broadcaster::telegram::{ChatId, ChatTarget, Credential, RateLimiter};
use tokio::time::Instant;

mod common;
use common::{ScriptedApi, error_reply};

const BOT_A: &str = "111:aaaaaaaa";
const BOT_B: &str = "222:bbbbbbbb";

fn inputs(tokens: &[&str], targets: &[&str], templates: &[&str]) -> Arc<BroadcastInputs> {
    Arc::new(BroadcastInputs::new(
        tokens.iter().copied().map(Credential::new).collect(),
        targets.iter().map(|t| (*t).to_owned()).collect(),
        templates.iter().map(|t| (*t).to_owned()).collect(),
    ))
}

fn broadcaster(
    api: &Arc<ScriptedApi>,
    inputs: Arc<BroadcastInputs>,
    settings: &BroadcastSettings,
) -> Broadcaster<ScriptedApi> {
    let limiter = Arc::new(RateLimiter::new(settings.global_max_per_sec));
    Broadcaster::new(Arc::clone(api), inputs, settings, limiter)
}

#[tokio::test(start_paused = true)]
async fn test_resolution_failure_is_per_credential() {
    // BOT_A is not a member of @bar; BOT_B sees every chat.
    let api = Arc::new(
        ScriptedApi::new()
            .with_chat(BOT_A, "@foo", -100_1)
            .with_chat(BOT_B, "@foo", -100_1)
            .with_chat(BOT_B, "@bar", -100_2),
    );
    let inputs = inputs(&[BOT_A, BOT_B], &["42", "t.me/foo", "bar"], &["hello"]);

    let report = broadcaster(&api, inputs, &BroadcastSettings::default())
        .run_round()
        .await;

    let a_targets: Vec<_> = api.sends_for(BOT_A).into_iter().map(|s| s.chat_id).collect();
    let b_targets: Vec<_> = api.sends_for(BOT_B).into_iter().map(|s| s.chat_id).collect();

    assert_eq!(
        a_targets,
        vec![ChatTarget::Id(ChatId(42)), ChatTarget::Id(ChatId(-100_1))]
    );
    assert_eq!(
        b_targets,
        vec![
            ChatTarget::Id(ChatId(42)),
            ChatTarget::Id(ChatId(-100_1)),
            ChatTarget::Id(ChatId(-100_2)),
        ]
    );

    assert_eq!(report.credentials.len(), 2);
    assert_eq!(report.credentials[0].unresolved, vec!["bar".to_owned()]);
    assert_eq!(report.credentials[0].delivered, 2);
    assert_eq!(report.credentials[1].delivered, 3);
    assert_eq!(report.delivered(), 5);

    // Numeric targets never hit getChat: two handles for each of two bots.
    assert_eq!(api.get_chat_calls(), 4);
    assert_eq!(api.get_me_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_credentials_processed_in_order() {
    let api = Arc::new(ScriptedApi::new());
    let inputs = inputs(&[BOT_B, BOT_A], &["1", "2"], &["x"]);

    broadcaster(&api, inputs, &BroadcastSettings::default())
        .run_round()
        .await;

    let tokens: Vec<_> = api.sends().into_iter().map(|s| s.token).collect();
    assert_eq!(tokens, vec![BOT_B, BOT_B, BOT_A, BOT_A]);
}

#[tokio::test(start_paused = true)]
async fn test_credential_without_targets_is_skipped() {
    let api = Arc::new(ScriptedApi::new().with_chat(BOT_B, "@only_b", 7));
    let inputs = inputs(&[BOT_A, BOT_B], &["@only_b"], &["x"]);

    let report = broadcaster(&api, inputs, &BroadcastSettings::default())
        .run_round()
        .await;

    assert!(api.sends_for(BOT_A).is_empty());
    assert_eq!(api.sends_for(BOT_B).len(), 1);
    assert!(report.credentials[0].skipped());
    assert_eq!(report.skipped_credentials(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failures_do_not_stop_the_round() {
    let api = Arc::new(ScriptedApi::new().script([Ok(error_reply(403, "Forbidden: bot was blocked"))]));
    let inputs = inputs(&[BOT_A], &["1", "2", "3"], &["x"]);

    let report = broadcaster(&api, inputs, &BroadcastSettings::default())
        .run_round()
        .await;

    assert_eq!(api.sends().len(), 3);
    assert_eq!(report.failed(), 1);
    assert_eq!(report.delivered(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_without_resolution_handles_pass_through() {
    let api = Arc::new(ScriptedApi::new());
    let inputs = inputs(&[BOT_A], &["-100500", "https://t.me/news"], &["x"]);
    let settings = BroadcastSettings {
        resolve_targets: false,
        ..BroadcastSettings::default()
    };

    broadcaster(&api, inputs, &settings).run_round().await;

    let targets: Vec<_> = api.sends().into_iter().map(|s| s.chat_id).collect();
    assert_eq!(
        targets,
        vec![
            ChatTarget::Id(ChatId(-100_500)),
            ChatTarget::Username("@news".to_owned())
        ]
    );
    assert_eq!(api.get_chat_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pause_follows_chat_kind() {
    let api = Arc::new(ScriptedApi::new());
    let inputs = inputs(&[BOT_A], &["-1", "5", "6"], &["x"]);
    let policy = DelayPolicy::new(Duration::from_secs(3), Duration::from_secs(2), Duration::ZERO);

    broadcaster(&api, inputs, &BroadcastSettings::default())
        .with_delay_policy(policy)
        .run_round()
        .await;

    let sends = api.sends();
    let after_group = sends[1].at.duration_since(sends[0].at);
    let after_private = sends[2].at.duration_since(sends[1].at);
    let tolerance = Duration::from_millis(5);
    assert!(after_group >= Duration::from_secs(3) && after_group <= Duration::from_secs(3) + tolerance);
    assert!(
        after_private >= Duration::from_secs(2) && after_private <= Duration::from_secs(2) + tolerance
    );
}

#[tokio::test(start_paused = true)]
async fn test_templates_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let paths = InputPaths {
        credentials: dir.path().join("tokens.txt"),
        targets: dir.path().join("chat_ids.txt"),
        templates: dir.path().join("messages.txt"),
    };
    std::fs::write(&paths.credentials, format!("\n{BOT_A}\n\n")).unwrap();
    std::fs::write(&paths.targets, "12345\n").unwrap();
    std::fs::write(&paths.templates, "Hello\n\nWorld").unwrap();

    let loaded = BroadcastInputs::load(&paths, true).unwrap();
    assert_eq!(loaded.templates, vec!["Hello", "World"]);

    let api = Arc::new(ScriptedApi::new());
    broadcaster(&api, Arc::new(loaded), &BroadcastSettings::default())
        .run_round()
        .await;

    let sends = api.sends();
    assert_eq!(sends.len(), 1);
    assert!(sends[0].text == "Hello" || sends[0].text == "World");
}

#[tokio::test(start_paused = true)]
async fn test_templates_are_all_used_eventually() {
    let api = Arc::new(ScriptedApi::new());
    let targets: Vec<String> = (1..=60).map(|i| i.to_string()).collect();
    let target_refs: Vec<&str> = targets.iter().map(String::as_str).collect();
    let inputs = inputs(&[BOT_A], &target_refs, &["a", "b"]);

    broadcaster(&api, inputs, &BroadcastSettings::default())
        .run_round()
        .await;

    let texts: HashSet<_> = api.sends().into_iter().map(|s| s.text).collect();
    assert_eq!(texts.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_once_mode_runs_one_round() {
    let api = Arc::new(ScriptedApi::new());
    let inputs = inputs(&[BOT_A], &["1"], &["x"]);
    let scheduler = BroadcastScheduler::new(
        broadcaster(&api, inputs, &BroadcastSettings::default()),
        RunMode::Once,
    );

    let report = scheduler.run().await;

    assert_eq!(report.delivered(), 1);
    assert_eq!(api.get_me_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_continuous_mode_repeats_rounds() {
    let api = Arc::new(ScriptedApi::new());
    let inputs = inputs(&[BOT_A], &["1"], &["x"]);
    let settings = BroadcastSettings {
        run_forever: true,
        base_delay_private_secs: 0.0,
        jitter_max_secs: 0.0,
        ..BroadcastSettings::default()
    };
    let scheduler =
        BroadcastScheduler::new(broadcaster(&api, inputs, &settings), RunMode::from_settings(&settings));

    // Rounds start at 0s, 600-610s and 1200-1220s.
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(1250), scheduler.run()).await;

    assert!(result.is_err(), "continuous mode returned");
    assert_eq!(api.get_me_calls(), 3);

    let sends = api.sends();
    assert_eq!(sends.len(), 3);
    let second = sends[1].at.duration_since(started);
    assert!(second >= Duration::from_secs(600) && second <= Duration::from_secs(611));
}
