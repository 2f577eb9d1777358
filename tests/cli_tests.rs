//! End-to-end tests of the calltrace binary
#![allow(deprecated)] // suppress assert_cmd::Command::cargo_bin deprecation in tests

use predicates::prelude::*;
use std::fs;

fn calltrace() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("calltrace")
}

#[test]
fn test_cli_help() {
    calltrace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--scenario"));
}

#[test]
fn test_basic_scenario_prints_call_graph() {
    let dir = tempfile::tempdir().unwrap();

    calltrace()
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Call Graph:\n"))
        .stdout(predicate::str::contains("main calls: function_d function_b \n"))
        .stdout(predicate::str::contains("function_d calls: function_a function_b \n"));

    for name in [
        "event_log.txt",
        "call_graph.txt",
        "dynamic_call_graph.dot",
        "call_context_tree.dot",
        "path_profiles.txt",
    ] {
        assert!(dir.path().join(name).exists(), "{name} missing");
    }

    let log = fs::read_to_string(dir.path().join("event_log.txt")).unwrap();
    assert_eq!(log.lines().next(), Some("Entering main"));
}

#[test]
fn test_output_dir_and_options() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("reports");

    calltrace()
        .current_dir(dir.path())
        .args(["--scenario", "extended", "--theme", "dark", "--json", "--no-event-log"])
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote"));

    assert!(!out.join("event_log.txt").exists());
    assert!(out.join("path_profiles.json").exists());

    let dot = fs::read_to_string(out.join("call_context_tree.dot")).unwrap();
    assert!(dot.contains("bgcolor=\"black\""));
    assert!(dot.contains("\"function_b\" -> \"function_c\" [label=\"4\"];"));

    let table = fs::read_to_string(out.join("path_profiles.txt")).unwrap();
    assert!(table.contains("main -> function_d -> function_b -> function_c"));
}

#[test]
fn test_recursive_scenario_terminates() {
    let dir = tempfile::tempdir().unwrap();

    calltrace()
        .current_dir(dir.path())
        .args(["--scenario", "recursive", "--no-event-log"])
        .assert()
        .success()
        .stdout(predicate::str::contains("countdown calls: countdown countdown countdown \n"));

    let hierarchy = fs::read_to_string(dir.path().join("call_graph.txt")).unwrap();
    assert!(hierarchy.starts_with("Call Graph Tree:\nmain\n"));
}

#[test]
fn test_custom_event_log_path() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("trace.log");

    calltrace()
        .current_dir(dir.path())
        .arg("--event-log")
        .arg(&log)
        .assert()
        .success();

    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.contains("Exiting function_c (Execution Time: "));
    assert!(!dir.path().join("event_log.txt").exists());
}

#[test]
fn test_render_failure_keeps_exit_status() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("calltrace.toml");
    fs::write(
        &config,
        "[render]\nenabled = true\nprogram = \"calltrace-no-such-renderer\"\n",
    )
    .unwrap();

    calltrace()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: Graph renderer"));

    assert!(dir.path().join("call_context_tree.dot").exists());
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("calltrace.toml");
    fs::write(&config, "[output]\nunknown_key = 1\n").unwrap();

    calltrace()
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("calltrace.toml"));
}

#[test]
fn test_unknown_scenario_fails() {
    calltrace()
        .args(["--scenario", "nested"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
