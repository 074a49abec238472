use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn run_glyphreel(cwd: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_glyphreel"))
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("glyphreel command should run")
}

#[test]
fn help_lists_playback_flags() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_glyphreel(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--color", "--true-fps", "--no-audio", "[VIDEO]"] {
        assert!(stdout.contains(flag), "help should mention {flag}:\n{stdout}");
    }
}

#[test]
fn directory_without_videos_reports_no_video_found() {
    let dir = tempdir().expect("tempdir should create");
    fs::write(dir.path().join("notes.txt"), "not a video").expect("file should write");

    let output = run_glyphreel(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("NO_VIDEO_FOUND"), "stderr was:\n{stderr}");
}

#[test]
fn missing_video_reports_source_unavailable() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_glyphreel(dir.path(), &["missing.mp4", "--no-audio"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SOURCE_UNAVAILABLE"), "stderr was:\n{stderr}");
}

#[test]
fn undecodable_default_video_fails_with_status_one() {
    let dir = tempdir().expect("tempdir should create");
    fs::write(dir.path().join("clip.mp4"), b"definitely not an mp4 container")
        .expect("file should write");

    let output = run_glyphreel(dir.path(), &["--no-audio"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("SOURCE_UNAVAILABLE"), "stderr was:\n{stderr}");
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let dir = tempdir().expect("tempdir should create");
    let output = run_glyphreel(dir.path(), &["--colour"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--colour"), "stderr was:\n{stderr}");
}
