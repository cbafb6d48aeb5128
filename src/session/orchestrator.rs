use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::SessionError;
use crate::automation::{AutomationLauncher, MeetingAutomation};
use crate::capture::Recorder;
use crate::config::Credentials;
use crate::drive::Uploader;

/// One inbound recording request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub meeting_url: String,
    pub duration: Duration,
    pub folder_name: String,
}

impl SessionRequest {
    /// Rejects unusable input before any resource is acquired.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.meeting_url.trim().is_empty() {
            return Err(SessionError::InvalidRequest(
                "meeting URL must not be empty".to_string(),
            ));
        }
        let url: reqwest::Url = self.meeting_url.parse().map_err(|e| {
            SessionError::InvalidRequest(format!("meeting URL is not a valid URL: {e}"))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::InvalidRequest(format!(
                "meeting URL must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.duration.is_zero() {
            return Err(SessionError::InvalidRequest(
                "duration must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Meeting identifier used in the artifact name: the last URL path
    /// segment.
    pub fn meeting_id(&self) -> &str {
        self.meeting_url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.meeting_url)
    }
}

/// Terminal value of a session, handed back to the API boundary.
#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub succeeded: bool,
    pub artifact_path: Option<PathBuf>,
    pub remote_link: Option<String>,
    pub message: String,
}

/// Local artifact naming convention: `{meeting-id}_{YYYYMMDD_HHMMSS}.mp3`.
/// Timestamped per invocation so concurrent sessions never collide.
pub fn artifact_file_name(meeting_id: &str, now: DateTime<Local>) -> String {
    format!("{meeting_id}_{}.mp3", now.format("%Y%m%d_%H%M%S"))
}

/// Drives one recording session end to end: join the meeting through the
/// automation session, capture for the duration budget, then archive.
/// Browser and capture processes are released on every exit path.
#[derive(Clone)]
pub struct SessionOrchestrator {
    launcher: Arc<dyn AutomationLauncher>,
    recorder: Arc<dyn Recorder>,
    uploader: Arc<dyn Uploader>,
    credentials: Credentials,
    output_dir: PathBuf,
}

impl SessionOrchestrator {
    pub fn new(
        launcher: Arc<dyn AutomationLauncher>,
        recorder: Arc<dyn Recorder>,
        uploader: Arc<dyn Uploader>,
        credentials: Credentials,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            launcher,
            recorder,
            uploader,
            credentials,
            output_dir,
        }
    }

    /// Runs the session and always returns exactly one outcome; no fault
    /// escapes this boundary.
    ///
    /// The session runs on a detached task: dropping the returned future
    /// (e.g. the client disconnects mid-request) does not cancel it, so
    /// browser teardown and capture termination always run to completion.
    pub async fn run(&self, request: SessionRequest) -> SessionOutcome {
        let this = self.clone();
        match tokio::spawn(async move { this.run_to_completion(request).await }).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("recording session task failed: {err}");
                SessionOutcome {
                    succeeded: false,
                    artifact_path: None,
                    remote_link: None,
                    message: format!("recording session task failed: {err}"),
                }
            }
        }
    }

    async fn run_to_completion(&self, request: SessionRequest) -> SessionOutcome {
        let session_id = Uuid::new_v4();
        info!(%session_id, meeting = %request.meeting_url, "starting recording session");

        let outcome = match self.execute(&request).await {
            Ok((artifact, Some(link))) => SessionOutcome {
                succeeded: true,
                artifact_path: Some(artifact),
                remote_link: Some(link),
                message: "Recording completed and uploaded to Google Drive".to_string(),
            },
            Ok((artifact, None)) => SessionOutcome {
                succeeded: true,
                artifact_path: Some(artifact),
                remote_link: None,
                message: "Recording completed but failed to upload to Google Drive".to_string(),
            },
            Err(err) => {
                error!(%session_id, "recording session failed: {err}");
                SessionOutcome {
                    succeeded: false,
                    artifact_path: None,
                    remote_link: None,
                    message: err.to_string(),
                }
            }
        };

        info!(%session_id, succeeded = outcome.succeeded, "session finished");
        outcome
    }

    async fn execute(
        &self,
        request: &SessionRequest,
    ) -> Result<(PathBuf, Option<String>), SessionError> {
        request.validate()?;

        let mut session = self.launcher.open().await?;
        let captured = self.attend_and_capture(session.as_mut(), request).await;
        // release the browser no matter how the meeting went
        session.close().await;
        let artifact = captured?;

        let remote_link = match self.uploader.upload(&artifact, &request.folder_name).await {
            Ok(uploaded) => uploaded.web_view_link,
            Err(err) => {
                let err = SessionError::UploadFailed(format!("{err:#}"));
                warn!("{err}");
                None
            }
        };
        Ok((artifact, remote_link))
    }

    async fn attend_and_capture(
        &self,
        session: &mut dyn MeetingAutomation,
        request: &SessionRequest,
    ) -> Result<PathBuf, SessionError> {
        session
            .authenticate(&self.credentials.identity, &self.credentials.secret)
            .await?;
        session.join(&request.meeting_url).await?;

        let file_name = artifact_file_name(request.meeting_id(), Local::now());
        let output = self.output_dir.join(file_name);

        let artifact = self.recorder.record(&output, request.duration).await?;
        if !artifact.exists {
            return Err(SessionError::CaptureIncomplete(artifact.path));
        }
        Ok(artifact.path)
    }
}
