//! Binary-level checks of exit codes and output formats.
//!
//! `echo` and `false` stand in for kubectl: `echo` succeeds without
//! printing any canary rows, `false` fails every query.

use std::process::{Command, Output};

fn command(dir: &std::path::Path, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_flagger-monitor"));
    command
        .args(args)
        .current_dir(dir)
        .env_remove("KUBECONFIG")
        .env_remove("FLAGGER_MONITOR_TOKEN")
        .env_remove("RUST_LOG");
    command
}

fn flagger_monitor(dir: &std::path::Path, args: &[&str]) -> Output {
    command(dir, args).output().unwrap()
}

#[cfg(unix)]
#[test]
fn never_reported_canary_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let output = flagger_monitor(
        dir.path(),
        &[
            "watch",
            "--canaries",
            "podinfo",
            "--kubectl",
            "echo",
            "--initial-delay",
            "0",
            "--poll-interval",
            "1",
            "--timeout",
            "1",
            "--output",
            "json",
        ],
    );

    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["result"], "Failed");
    assert_eq!(doc["outcome"]["verdict"], "timed_out");
    assert_eq!(doc["outcome"]["pending"][0], "podinfo");
    assert_eq!(doc["polls"], 1);
}

#[cfg(unix)]
#[test]
fn failing_kubectl_exits_with_two() {
    let dir = tempfile::tempdir().unwrap();
    let output = flagger_monitor(
        dir.path(),
        &[
            "watch",
            "--canaries",
            "podinfo",
            "--kubectl",
            "false",
            "--initial-delay",
            "0",
            "--output",
            "pipeline",
        ],
    );

    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("##vso[task.complete result=Failed;]Error executing kubectl command."));
}

#[cfg(unix)]
#[test]
fn kubeconfig_list_from_environment_reaches_polling() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    std::fs::write(&a, "apiVersion: v1\nkind: Config\n").unwrap();
    std::fs::write(&b, "apiVersion: v1\nkind: Config\n").unwrap();

    let output = command(
        dir.path(),
        &[
            "watch",
            "--canaries",
            "podinfo",
            "--kubectl",
            "echo",
            "--initial-delay",
            "0",
            "--poll-interval",
            "1",
            "--timeout",
            "1",
            "--output",
            "json",
        ],
    )
    .env("KUBECONFIG", std::env::join_paths([&a, &b]).unwrap())
    .output()
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(doc["outcome"]["verdict"], "timed_out");
}

#[test]
fn missing_canaries_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = flagger_monitor(dir.path(), &["watch", "--kubectl", "echo"]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no canaries given"));
}

#[test]
fn init_then_watch_reads_config() {
    let dir = tempfile::tempdir().unwrap();
    let init = flagger_monitor(
        dir.path(),
        &["init", "--canaries", "podinfo", "--namespace", "test"],
    );
    assert!(init.status.success());
    assert!(dir.path().join("flagger-monitor.toml").exists());

    // A bad kubeconfig path from the flags stops the run before polling.
    let output = flagger_monitor(
        dir.path(),
        &["watch", "--kubeconfig", "/nonexistent/config", "--context", "x"],
    );
    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kubeconfig"));
}
