use fieldproof::app::command_handlers::run_cli_with_settings;
use fieldproof::config::Settings;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn settings(root: &Path, extra: &str) -> Settings {
    serde_yaml::from_str(&format!(
        r#"
state_root: {}
evaluator:
  endpoint: http://127.0.0.1:9/v1/chat/completions
  timeout_seconds: 2
{extra}
"#,
        root.join("state").display()
    ))
    .expect("settings")
}

#[test]
fn send_drives_the_workflow_and_sessions_lists_it() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(dir.path(), "");

    let reply = run_cli_with_settings(args(&["send", "+15550001", "DR0000001"]), &settings)
        .expect("send identifier");
    assert!(reply.contains("New installation created: DR0000001"));

    let reply = run_cli_with_settings(
        args(&["send", "+15550001", "--location", "geo:1,2", "--id", "m-2"]),
        &settings,
    )
    .expect("send location");
    assert!(reply.contains("Location verified"));

    let replay = run_cli_with_settings(
        args(&["send", "+15550001", "--location", "geo:1,2", "--id", "m-2"]),
        &settings,
    )
    .expect("replay location");
    assert_eq!(replay, reply);

    let listing = run_cli_with_settings(args(&["sessions"]), &settings).expect("sessions");
    assert!(listing.starts_with("sessions=1"));
    assert!(listing.contains("+15550001 installation=DR0000001 step_cursor=1"));
}

#[test]
fn photo_with_unreachable_evaluator_asks_for_a_retry() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(
        dir.path(),
        &format!("media:\n  local_roots: [{}]", dir.path().display()),
    );
    let photo = dir.path().join("house.jpg");
    fs::write(&photo, b"\xFF\xD8\xFFfake-jpeg").expect("write photo");

    run_cli_with_settings(args(&["send", "+15550001", "DR0000001"]), &settings)
        .expect("identifier");
    run_cli_with_settings(
        args(&["send", "+15550001", "--location", "geo:1,2"]),
        &settings,
    )
    .expect("location");
    let reply = run_cli_with_settings(
        args(&["send", "+15550001", "--photo", &photo.display().to_string()]),
        &settings,
    )
    .expect("photo");
    assert!(reply.contains("could not check your photo for Step 1"));

    let log = fs::read_to_string(dir.path().join("state/logs/workflow.log")).expect("log");
    assert!(log.contains("evaluator.failure"));
}

#[test]
fn export_writes_all_sessions() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(dir.path(), "");
    for agent in ["+15550001", "+15550002"] {
        run_cli_with_settings(args(&["send", agent, "HI"]), &settings).expect("greeting");
    }

    let target = dir.path().join("out/sessions.json");
    let output = run_cli_with_settings(
        args(&["export", &target.display().to_string()]),
        &settings,
    )
    .expect("export");
    assert!(output.starts_with("exported 2 sessions"));
    let exported: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&target).expect("read export")).expect("json");
    assert!(exported.get("+15550001").is_some());
    assert!(exported.get("+15550002").is_some());

    let output = run_cli_with_settings(args(&["export"]), &settings).expect("default export");
    assert!(output.contains("exports/sessions.json"));
}

#[test]
fn sweep_and_rubric_report_plain_summaries() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(dir.path(), "");

    let output = run_cli_with_settings(args(&["sweep"]), &settings).expect("sweep");
    assert_eq!(output, "abandoned=0");

    let output = run_cli_with_settings(args(&["rubric"]), &settings).expect("rubric");
    assert!(output.starts_with("steps=12"));
    assert!(output.contains(" 1. House Photo - "));
}

#[test]
fn admin_queries_require_an_authorized_agent() {
    let dir = tempdir().expect("temp dir");
    let open = settings(
        dir.path(),
        "environment: development\nadmin:\n  enabled: true\n  allowed_agents: [\"+15550009\"]",
    );
    run_cli_with_settings(args(&["send", "+15550001", "DR0000001"]), &open).expect("identifier");

    let stats = run_cli_with_settings(args(&["admin", "stats", "--as", "+15550009"]), &open)
        .expect("stats");
    assert!(stats.contains("total_sessions=1"));
    assert!(stats.contains("sessions_with_active_installation=1"));
    assert!(stats.contains("threshold=8.0"));

    let active = run_cli_with_settings(args(&["admin", "sessions", "--as", "+15550009"]), &open)
        .expect("active sessions");
    assert!(active.contains("\"installation\": \"DR0000001\""));

    let err = run_cli_with_settings(args(&["admin", "stats", "--as", "+15550001"]), &open)
        .expect_err("not allowlisted");
    assert!(err.contains("not authorized"));

    let closed = settings(dir.path(), "");
    assert!(
        run_cli_with_settings(args(&["admin", "stats", "--as", "+15550009"]), &closed).is_err()
    );
}

#[test]
fn unknown_commands_and_bad_usage_are_errors() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(dir.path(), "");
    assert_eq!(
        run_cli_with_settings(args(&["launch"]), &settings).expect_err("unknown"),
        "unknown command `launch`"
    );
    assert!(run_cli_with_settings(args(&["send"]), &settings).is_err());
    assert!(run_cli_with_settings(args(&["chat"]), &settings).is_err());
    assert!(run_cli_with_settings(args(&["help"]), &settings)
        .expect("help")
        .contains("Commands:"));
}

#[test]
fn local_photos_need_a_configured_media_root() {
    let dir = tempdir().expect("temp dir");
    let settings = settings(dir.path(), "");
    let photo = dir.path().join("house.jpg");
    fs::write(&photo, b"\xFF\xD8\xFFfake-jpeg").expect("write photo");

    run_cli_with_settings(args(&["send", "+15550001", "DR0000001"]), &settings)
        .expect("identifier");
    run_cli_with_settings(
        args(&["send", "+15550001", "--location", "geo:1,2"]),
        &settings,
    )
    .expect("location");
    let reply = run_cli_with_settings(
        args(&["send", "+15550001", "--photo", &photo.display().to_string()]),
        &settings,
    )
    .expect("photo");
    assert!(reply.contains("could not download your photo for Step 1"));

    let log = fs::read_to_string(dir.path().join("state/logs/workflow.log")).expect("log");
    assert!(log.contains("acquire.failure"));
    assert!(log.contains("local_access_denied"));
    assert!(!log.contains("evaluator.failure"));
}
