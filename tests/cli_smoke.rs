//! CLI-level smoke tests: exit codes and basic argument validation.

use assert_cmd::Command;
use predicates::str::contains;
use std::fs;

#[test]
fn syncs_and_exits_zero_with_yes_flag() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"hello").unwrap();

    Command::cargo_bin("dirsync")
        .unwrap()
        .arg(src.path())
        .arg(dst.path())
        .arg("--yes")
        .assert()
        .success();

    assert_eq!(fs::read(dst.path().join("a.txt")).unwrap(), b"hello");
}

#[test]
fn rejects_nonexistent_source_with_nonzero_exit() {
    let dst = tempfile::tempdir().unwrap();

    Command::cargo_bin("dirsync")
        .unwrap()
        .arg("/no/such/source/path")
        .arg(dst.path())
        .arg("--yes")
        .assert()
        .failure()
        .stderr(contains("does not exist"));
}

#[test]
fn rejects_identical_source_and_destination() {
    let dir = tempfile::tempdir().unwrap();

    Command::cargo_bin("dirsync")
        .unwrap()
        .arg(dir.path())
        .arg(dir.path())
        .arg("--yes")
        .assert()
        .failure();
}

#[test]
fn empty_source_reports_nothing_to_do() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();

    Command::cargo_bin("dirsync")
        .unwrap()
        .arg(src.path())
        .arg(dst.path())
        .assert()
        .success()
        .stdout(contains("Nothing to do"));
}
