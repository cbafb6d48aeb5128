use std::path::PathBuf;
use thiserror::Error;

/// Failure taxonomy for a recording session.
///
/// Every variant is converted into a failed [`super::SessionOutcome`] by the
/// orchestrator; none of these escape its boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad input, rejected before any resource is acquired.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No usable browser/driver pair could be located or started.
    #[error("browser environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    /// The Google login flow did not reach its landing state.
    #[error("login failed: {0}")]
    AuthenticationFailed(String),

    /// The join control never became clickable within its wait window.
    #[error("could not join meeting: {0}")]
    JoinFailed(String),

    /// The capture subprocess could not be launched.
    #[error("audio capture could not start: {0}")]
    CaptureUnavailable(String),

    /// The capture subprocess terminated but left no artifact on disk.
    #[error("capture finished but no recording exists at {}", .0.display())]
    CaptureIncomplete(PathBuf),

    /// The artifact could not be archived. Non-fatal: the capture itself
    /// still counts as a success.
    #[error("upload failed: {0}")]
    UploadFailed(String),

    /// Anything unanticipated; carries a diagnostic message.
    #[error("{0}")]
    Internal(String),
}
