//! CLI integration tests
//!
//! End-to-end tests for the tasq command-line interface against real
//! vault directories.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

use common::TestVault;

/// Get a Command for the tasq binary
fn tasq() -> Command {
    Command::cargo_bin("tasq").expect("Failed to find tasq binary")
}

/// A small vault with a mix of records and plain notes
fn setup_vault() -> TestVault {
    let vault = TestVault::new();
    vault.write_doc(
        "inbox/rent.md",
        "task: true\ntitle: Pay rent\nstatus: open\npriority: high\ndue: 2025-06-01\ncontexts: [home]",
    );
    vault.write_doc(
        "inbox/groceries.md",
        "task: true\ntitle: Buy groceries\nstatus: done\ncontexts: [errand]",
    );
    vault.write_doc(
        "recurring/standup.md",
        "task: true\ntitle: Standup\nscheduled: 2025-01-06\nrecurrence: FREQ=WEEKLY",
    );
    vault.write_doc("notes/ideas.md", "title: Just a note");
    vault
}

#[test]
fn test_help_output() {
    tasq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Queryable task index"));
}

#[test]
fn test_version_output() {
    tasq()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tasq"));
}

#[test]
fn test_query_lists_records_not_notes() {
    let vault = setup_vault();
    tasq()
        .args(["query", vault.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pay rent"))
        .stdout(predicate::str::contains("Buy groceries"))
        .stdout(predicate::str::contains("Standup"))
        .stdout(predicate::str::contains("Just a note").not());
}

#[test]
fn test_query_filter_flag() {
    let vault = setup_vault();
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "status is open",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pay rent"))
        .stdout(predicate::str::contains("Buy groceries").not());
}

#[test]
fn test_query_repeated_filters_are_anded() {
    let vault = setup_vault();
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "status is open",
            "--filter",
            "contexts has errand",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching records"));
}

#[test]
fn test_query_grouped_output_has_headers() {
    let vault = setup_vault();
    tasq()
        .args(["query", vault.path().to_str().unwrap(), "--group", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("open"))
        .stdout(predicate::str::contains("done"));
}

#[test]
fn test_query_observed_date_projects_recurrence() {
    let vault = setup_vault();
    // 2025-01-13 is a Monday: the weekly standup is due.
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "due on observed",
            "--date",
            "2025-01-13",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standup"));

    // Tuesday: it is not.
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "due on observed",
            "--date",
            "2025-01-14",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Standup").not());
}

#[test]
fn test_query_observed_without_date_fails() {
    let vault = setup_vault();
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "due on observed",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("observation date"));
}

#[test]
fn test_query_json_output_is_parseable() {
    let vault = setup_vault();
    let output = tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--group",
            "status",
            "--json",
        ])
        .output()
        .expect("Failed to run tasq");
    assert!(output.status.success());

    let groups: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Invalid JSON output");
    let labels: Vec<&str> = groups
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["open", "done", "uncategorized"]);
}

#[test]
fn test_query_rejects_malformed_filter() {
    let vault = setup_vault();
    tasq()
        .args([
            "query",
            vault.path().to_str().unwrap(),
            "--filter",
            "flavor is sweet",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flavor"));
}

#[test]
fn test_show_record() {
    let vault = setup_vault();
    tasq()
        .args(["show", vault.path().to_str().unwrap(), "inbox/rent.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pay rent"))
        .stdout(predicate::str::contains("2025-06-01"));
}

#[test]
fn test_show_unknown_record_fails() {
    let vault = setup_vault();
    tasq()
        .args(["show", vault.path().to_str().unwrap(), "nope.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no record"));
}

#[test]
fn test_stats_counts_records() {
    let vault = setup_vault();
    tasq()
        .args(["stats", vault.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Records:   3"));
}

#[test]
fn test_vault_config_overrides_identifying_tag() {
    let vault = TestVault::new();
    std::fs::write(
        vault.path().join(".tasq.toml"),
        "identifying_tag = \"todo\"\n",
    )
    .expect("Failed to write config");
    vault.write_doc("a.md", "tags: [todo]\ntitle: Tagged todo");
    vault.write_doc("b.md", "task: true\ntitle: Default marker only");

    tasq()
        .args(["query", vault.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tagged todo"));
}
