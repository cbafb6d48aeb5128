//! Time-bounded audio capture via an ffmpeg subprocess.
//!
//! The supervisor owns exactly one capture process per session and
//! guarantees it never outlives the session: stop escalates from a graceful
//! quit to a kill after a fixed grace period, and `kill_on_drop` covers
//! cancellation of the surrounding task.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::session::SessionError;

/// How long `stop` waits for ffmpeg to exit on its own before killing it.
pub const STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Encoder binary, normally ffmpeg.
    pub program: String,
    /// PulseAudio source to record from.
    pub source: String,
    /// Constant bitrate for the mp3 stream.
    pub bitrate: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            program: "ffmpeg".to_string(),
            source: "default".to_string(),
            bitrate: "192k".to_string(),
        }
    }
}

/// Output file of a finished capture, with its existence checked at
/// completion time. A missing file is a normal failure outcome, not a fault.
#[derive(Debug, Clone)]
pub struct CaptureArtifact {
    pub path: PathBuf,
    pub exists: bool,
}

/// Builds the encoder invocation: read the named pulse source, encode to
/// constant-bitrate mp3, overwrite any existing file at `output`.
pub fn capture_command(config: &CaptureConfig, output: &Path) -> Command {
    let mut cmd = Command::new(&config.program);
    cmd.arg("-y")
        .args(["-f", "pulse"])
        .args(["-i", &config.source])
        .args(["-c:a", "libmp3lame"])
        .args(["-b:a", &config.bitrate])
        .arg(output)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd
}

/// A live capture subprocess. Running -> Stopping -> Terminated.
#[derive(Debug)]
pub struct CaptureProcess {
    child: Child,
    output: PathBuf,
    stopped: bool,
}

impl CaptureProcess {
    pub fn spawn(mut cmd: Command, output: PathBuf) -> Result<Self, SessionError> {
        let child = cmd.spawn().map_err(|e| {
            SessionError::CaptureUnavailable(format!("failed to spawn capture process: {e}"))
        })?;
        debug!("capture process started for {}", output.display());
        Ok(Self {
            child,
            output,
            stopped: false,
        })
    }

    /// Suspends for the capture budget while the subprocess records
    /// independently. The single designed suspension point of a session.
    pub async fn run_for(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Requests graceful termination (ffmpeg quits and finalizes the file on
    /// `q`), waits up to [`STOP_GRACE`], then kills. Idempotent.
    pub async fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        if let Some(mut stdin) = self.child.stdin.take() {
            let _ = stdin.write_all(b"q").await;
            let _ = stdin.shutdown().await;
        }

        match tokio::time::timeout(STOP_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => debug!("capture process exited with {status}"),
            Ok(Err(e)) => warn!("failed to reap capture process: {e}"),
            Err(_) => {
                warn!(
                    "capture process did not exit within {}s, killing",
                    STOP_GRACE.as_secs()
                );
                if let Err(e) = self.child.kill().await {
                    warn!("failed to kill capture process: {e}");
                }
            }
        }
    }

    /// Consumes the handle and reports whether the artifact made it to disk.
    pub fn finish(self) -> CaptureArtifact {
        let exists = self.output.exists();
        CaptureArtifact {
            path: self.output,
            exists,
        }
    }
}

/// Capture seam used by the orchestrator.
#[async_trait]
pub trait Recorder: Send + Sync {
    /// Records the named source to `output` for `duration`, terminating the
    /// capture process before returning.
    async fn record(
        &self,
        output: &Path,
        duration: Duration,
    ) -> Result<CaptureArtifact, SessionError>;
}

pub struct FfmpegRecorder {
    config: CaptureConfig,
}

impl FfmpegRecorder {
    pub fn new(config: CaptureConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Recorder for FfmpegRecorder {
    async fn record(
        &self,
        output: &Path,
        duration: Duration,
    ) -> Result<CaptureArtifact, SessionError> {
        info!(
            "capturing '{}' to {} for {}s",
            self.config.source,
            output.display(),
            duration.as_secs()
        );
        let cmd = capture_command(&self.config, output);
        let mut process = CaptureProcess::spawn(cmd, output.to_path_buf())?;
        process.run_for(duration).await;
        process.stop().await;
        Ok(process.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn capture_command_encodes_constant_bitrate_mp3() {
        let config = CaptureConfig::default();
        let cmd = capture_command(&config, Path::new("out.mp3"));
        assert_eq!(cmd.as_std().get_program(), "ffmpeg");
        let args = argv(&cmd);
        assert_eq!(
            args,
            vec![
                "-y", "-f", "pulse", "-i", "default", "-c:a", "libmp3lame", "-b:a", "192k",
                "out.mp3"
            ]
        );
    }

    #[test]
    fn capture_command_uses_configured_source() {
        let config = CaptureConfig {
            source: "alsa_output.monitor".to_string(),
            ..CaptureConfig::default()
        };
        let args = argv(&capture_command(&config, Path::new("x.mp3")));
        assert!(args.contains(&"alsa_output.monitor".to_string()));
    }

    #[tokio::test]
    async fn spawn_failure_is_capture_unavailable() {
        let config = CaptureConfig {
            program: "/nonexistent/ffmpeg".to_string(),
            ..CaptureConfig::default()
        };
        let cmd = capture_command(&config, Path::new("out.mp3"));
        let err = CaptureProcess::spawn(cmd, PathBuf::from("out.mp3")).unwrap_err();
        assert!(matches!(err, SessionError::CaptureUnavailable(_)));
    }
}
