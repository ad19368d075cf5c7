// url-count/tests/cli_integration.rs

mod common;

use assert_cmd::cargo::CommandCargoExt;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::process::{self, Child, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

/// The binary with the user's environment and config files kept out.
fn isolated_command() -> process::Command {
    let mut cmd = process::Command::cargo_bin("url-count").unwrap();
    cmd.env_remove("URL_COUNT_CONCURRENCY")
        .env_remove("URL_COUNT_CONFIG")
        .env_remove("RUST_LOG")
        .env("HOME", std::env::temp_dir())
        .env("XDG_CONFIG_HOME", std::env::temp_dir());
    cmd
}

fn url_count() -> Command {
    let mut cmd = Command::from_std(isolated_command());
    cmd.timeout(Duration::from_secs(30));
    cmd
}

/// Start the binary with piped stdio, for tests that drive it while it runs.
fn spawn_url_count(args: &[&str]) -> Child {
    isolated_command()
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start url-count")
}

/// Helper to create a file with the given contents
fn create_file(content: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("Failed to create temp file");
    fs::write(file.path(), content).expect("Failed to write to temp file");
    file
}

#[test]
fn test_help_shows_flags() {
    url_count()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--concurrency"))
        .stdout(predicate::str::contains("--file"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_empty_input_prints_zero_total() {
    url_count()
        .write_stdin("")
        .assert()
        .success()
        .stdout("total: 0\n");
}

#[test]
fn test_counts_each_url() {
    let base = common::serve("Go Go Go", Duration::ZERO);
    let input = format!("{0}/one\n{0}/two\n", base);

    url_count()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("count for {}/one: 3", base)))
        .stdout(predicate::str::contains(format!("count for {}/two: 3", base)))
        .stdout(predicate::str::ends_with("total: 6\n"));
}

#[test]
fn test_failed_url_is_skipped_not_fatal() {
    let base = common::serve("Go", Duration::ZERO);
    let dead = common::dead_url();
    let input = format!("{}\n{}/ok\n", dead, base);

    url_count()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("count for {}/ok: 1", base)))
        .stdout(predicate::str::contains(dead.as_str()).not())
        .stdout(predicate::str::ends_with("total: 1\n"))
        .stderr(predicate::str::contains("could not be counted"));
}

#[test]
fn test_blank_and_comment_lines_are_ignored() {
    let base = common::serve("Go", Duration::ZERO);
    let input = format!("# urls\n\n{}/a\n\n", base);

    url_count()
        .write_stdin(input)
        .assert()
        .success()
        .stdout(format!("count for {}/a: 1\ntotal: 1\n", base));
}

#[test]
fn test_reads_urls_from_file() {
    let base = common::serve("Go and Go", Duration::ZERO);
    let file = create_file(&format!("{}/x\n", base));

    url_count()
        .arg("--file")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("count for"))
        .stdout(predicate::str::ends_with("total: 2\n"));
}

#[test]
fn test_missing_url_file_fails() {
    url_count()
        .args(["--file", "/no/such/urls.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_invalid_concurrency_rejected() {
    url_count()
        .args(["-c", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 100"));
}

#[test]
fn test_explicit_config_file() {
    let base = common::serve("Go", Duration::ZERO);
    let config = create_file("[pipeline]\nconcurrency = 4\n");

    url_count()
        .arg("--config")
        .arg(config.path())
        .write_stdin(format!("{}/a\n", base))
        .assert()
        .success()
        .stdout(predicate::str::ends_with("total: 1\n"));
}

#[test]
fn test_invalid_config_file_fails() {
    let config = create_file("[pipeline]\nconcurrency = 0\n");

    url_count()
        .arg("--config")
        .arg(config.path())
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_invalid_env_concurrency_is_ignored() {
    url_count()
        .env("URL_COUNT_CONCURRENCY", "lots")
        .write_stdin("")
        .assert()
        .success()
        .stdout("total: 0\n");
}

#[test]
fn test_requests_run_concurrently() {
    let base = common::serve("Go", Duration::from_millis(300));
    let input: String = (0..8).map(|i| format!("{}/{}\n", base, i)).collect();

    let start = Instant::now();
    url_count()
        .args(["-c", "8"])
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::ends_with("total: 8\n"));

    // Serially this would take at least 2.4s.
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "took {:?}",
        start.elapsed()
    );
}

#[cfg(unix)]
fn interrupt(child: &Child) {
    let status = process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .expect("Failed to run kill");
    assert!(status.success());
}

#[cfg(unix)]
#[test]
fn test_first_interrupt_lets_dispatched_requests_finish() {
    let base = common::serve("Go", Duration::from_secs(2));
    let mut child = spawn_url_count(&["-c", "2"]);

    // Stdin stays open, so the reader is still blocked when the signal lands.
    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(format!("{0}/a\n{0}/b\n", base).as_bytes())
        .unwrap();
    stdin.flush().unwrap();

    thread::sleep(Duration::from_millis(500));
    interrupt(&child);

    let output = child.wait_with_output().unwrap();
    drop(stdin);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains(&format!("count for {}/a: 1", base)), "stdout: {}", stdout);
    assert!(stdout.contains(&format!("count for {}/b: 1", base)), "stdout: {}", stdout);
    assert!(stdout.ends_with("total: 2\n"), "stdout: {}", stdout);
}

#[cfg(unix)]
#[test]
fn test_second_interrupt_aborts_in_flight_requests() {
    let base = common::serve("Go", Duration::from_secs(30));
    let mut child = spawn_url_count(&["-c", "2"]);

    let mut stdin = child.stdin.take().unwrap();
    stdin
        .write_all(format!("{0}/a\n{0}/b\n", base).as_bytes())
        .unwrap();
    stdin.flush().unwrap();

    thread::sleep(Duration::from_millis(500));
    interrupt(&child);
    thread::sleep(Duration::from_millis(300));
    interrupt(&child);

    let start = Instant::now();
    let output = child.wait_with_output().unwrap();
    drop(stdin);

    // The server would hold each request for 30s.
    assert!(start.elapsed() < Duration::from_secs(10), "took {:?}", start.elapsed());
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "total: 0\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("requests aborted"));
}

#[cfg(unix)]
#[test]
fn test_closed_stdout_aborts_cleanly() {
    let base = common::serve("Go", Duration::ZERO);
    let mut child = spawn_url_count(&["--debug"]);
    drop(child.stdout.take());

    let input: String = (0..20).map(|i| format!("{}/{}\n", base, i)).collect();
    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(input.as_bytes()).unwrap();
    drop(stdin);

    let output = child.wait_with_output().unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(stderr.contains("stdout closed, aborting"), "stderr: {}", stderr);
}
