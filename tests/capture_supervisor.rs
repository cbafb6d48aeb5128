//! Capture process lifetime guarantees, exercised with real `sh` processes
//! standing in for ffmpeg.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;

use meetcap::capture::{CaptureProcess, STOP_GRACE};

/// A stand-in capture process that behaves like ffmpeg: writes its output
/// file, then blocks on stdin and exits once it reads the quit byte.
fn fake_capture(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(script)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

#[tokio::test]
async fn capture_runs_for_budget_then_stops_gracefully() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp3");
    let script = format!(
        "touch '{}'; head -c 1 > /dev/null",
        output.display()
    );

    let start = Instant::now();
    let mut process = CaptureProcess::spawn(fake_capture(&script), output.clone()).unwrap();
    process.run_for(Duration::from_millis(300)).await;
    process.stop().await;
    let elapsed = start.elapsed();

    // lifetime is at least the budget and well inside budget + grace
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(300) + STOP_GRACE);

    let artifact = process.finish();
    assert!(artifact.exists);
    assert_eq!(artifact.path, output);
}

#[tokio::test]
async fn missing_output_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("never-written.mp3");

    let mut process =
        CaptureProcess::spawn(fake_capture("head -c 1 > /dev/null"), output.clone()).unwrap();
    process.run_for(Duration::from_millis(50)).await;
    process.stop().await;

    let artifact = process.finish();
    assert!(!artifact.exists);
    assert_eq!(artifact.path, output);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp3");
    let script = format!("touch '{}'; head -c 1 > /dev/null", output.display());

    let mut process = CaptureProcess::spawn(fake_capture(&script), output).unwrap();
    process.run_for(Duration::from_millis(50)).await;
    process.stop().await;
    process.stop().await;

    assert!(process.finish().exists);
}

#[tokio::test]
#[ignore] // waits out the full 10s stop grace before the kill path fires
async fn stubborn_process_is_killed_after_grace() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.mp3");
    // ignores stdin entirely, so only the kill path can end it
    let script = format!("touch '{}'; exec sleep 600", output.display());

    let start = Instant::now();
    let mut process = CaptureProcess::spawn(fake_capture(&script), output).unwrap();
    process.run_for(Duration::from_millis(100)).await;
    process.stop().await;
    let elapsed = start.elapsed();

    assert!(elapsed >= STOP_GRACE);
    assert!(elapsed < STOP_GRACE + Duration::from_secs(5));
    assert!(process.finish().exists);
}
