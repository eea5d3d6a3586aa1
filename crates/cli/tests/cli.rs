use std::fs;
use std::path::Path;

use assert_cmd::Command;

fn annexx(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("annexx").unwrap();
    cmd.env_remove("ANNEXX_ENV")
        .env_remove("ANNEXX_CONFIG_DIR")
        .env_remove("RUST_LOG")
        .arg("--root")
        .arg(root);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn env_merges_environment_over_base() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env"), "A=1\n").unwrap();
    fs::write(dir.path().join(".env.staging"), "A=2\nB=3\n").unwrap();

    let stdout = stdout_of(
        annexx(dir.path())
            .args(["--environment", "staging", "env", "--show-values"]),
    );

    assert!(stdout.contains("environment: staging"));
    assert!(stdout.contains("A=2"));
    assert!(stdout.contains("B=3"));
    assert!(!stdout.contains("A=1"));
    assert!(!stdout.contains("warning:"));
}

#[test]
fn env_warns_when_environment_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".env"), "A=1\n").unwrap();

    let mut cmd = annexx(dir.path());
    cmd.args(["-e", "production", "env"]);
    cmd.assert().success();
    let stdout = stdout_of(&mut cmd);

    assert!(stdout.contains("warning: environment file"));
    assert!(stdout.lines().any(|line| line == "A"));
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    annexx(dir.path())
        .args(["-e", "qa", "env"])
        .assert()
        .failure();
}

#[test]
fn db_status_reports_each_role() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing").join("queue.sqlite3");
    fs::write(
        dir.path().join(".env.test"),
        format!(
            "ANNEXX_DATABASE__PRIMARY__URL=sqlite::memory:\n\
             ANNEXX_DATABASE__CACHE__URL=sqlite::memory:\n\
             ANNEXX_DATABASE__CABLE__URL=sqlite::memory:\n\
             ANNEXX_DATABASE__QUEUE__URL=sqlite://{}\n",
            missing.display()
        ),
    )
    .unwrap();

    let mut cmd = annexx(dir.path());
    cmd.args(["-e", "test", "db", "status"]);
    let output = cmd.output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["primary"]["ok"], true);
    assert_eq!(status["queue"]["ok"], false);
}

#[test]
fn db_status_for_single_healthy_role() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join(".env.test"),
        "ANNEXX_DATABASE__CACHE__URL=sqlite::memory:\n",
    )
    .unwrap();

    let mut cmd = annexx(dir.path());
    cmd.args(["-e", "test", "db", "status", "--role", "cache"]);
    let output = cmd.output().unwrap();

    assert!(output.status.success());
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["ok"], true);
}

#[test]
fn db_status_rejects_unknown_role() {
    let dir = tempfile::tempdir().unwrap();
    let output = annexx(dir.path())
        .args(["db", "status", "--role", "nonexistent"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("unknown database role 'nonexistent'"));
}
