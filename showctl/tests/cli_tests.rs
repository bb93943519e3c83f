/// Binary tests: drive the `showctl` executable through stdin with no config
/// file (`-f`) and check what it echoes to stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

// ── Helpers ───────────────────────────────────────────────────────────────────

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_showctl"))
}

/// Run the binary with `args`, feeding `input` on stdin.
fn run(args: &[&str], input: &str, cwd: &Path) -> Output {
    let mut child = Command::new(binary())
        .args(args)
        .current_dir(cwd)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn showctl");
    {
        let stdin = child.stdin.as_mut().expect("stdin not open");
        stdin.write_all(input.as_bytes()).expect("write to stdin");
    }
    child.wait_with_output().expect("wait failed")
}

fn stdout_lines(out: &Output) -> Vec<String> {
    String::from_utf8_lossy(&out.stdout).lines().map(str::to_owned).collect()
}

// ── Console ───────────────────────────────────────────────────────────────────

#[test]
fn console_commands_echo() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["-f"], "define x 6\nmultiply x 7\nprint var x\nquit\n", dir.path());
    assert!(out.status.success());
    assert_eq!(stdout_lines(&out), ["x = 42"]);
}

#[test]
fn errors_are_echoed_and_session_continues() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["-f"], "frobnicate\nprint text ok\n", dir.path());
    assert!(out.status.success());
    let lines = stdout_lines(&out);
    assert_eq!(lines.len(), 2, "{lines:?}");
    assert!(lines[0].starts_with("% "));
    assert_eq!(lines[1], "ok");
}

#[test]
fn startup_commands_run_first() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["-f", "-cdefine n 2", "-c", "add n 1"], "print var n\n", dir.path());
    assert_eq!(stdout_lines(&out), ["n = 3"]);
}

// ── Scripts ───────────────────────────────────────────────────────────────────

#[test]
fn script_argument_plays_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("show.sts"), "print text opening\nwait duration 0.05\nprint text closing\n")
        .unwrap();
    let out = run(&["show.sts", "-f"], "", dir.path());
    assert!(out.status.success());
    assert_eq!(stdout_lines(&out), ["opening", "closing"]);
}

#[test]
fn missing_script_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["absent.sts", "-f"], "", dir.path());
    assert!(!out.status.success());
}

#[test]
fn bad_option_prints_usage() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(&["-z"], "", dir.path());
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Usage"));
}
