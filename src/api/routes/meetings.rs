//! Meeting recording endpoint.
//!
//! `POST /record-meeting` drives one full session: join, capture for the
//! requested duration, upload. The handler blocks until the session is done,
//! like the recording run it fronts.

use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::session::{SessionOrchestrator, SessionRequest};

pub const DEFAULT_DURATION_MINUTES: u64 = 30;
pub const DEFAULT_FOLDER_NAME: &str = "Meeting Recordings";

/// Request body for the record-meeting endpoint. Duration and folder fall
/// back to defaults when omitted.
#[derive(Debug, Clone, Deserialize)]
pub struct MeetingRequest {
    pub meeting_url: String,
    #[serde(default)]
    pub duration_minutes: Option<u64>,
    #[serde(default)]
    pub folder_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingResponse {
    pub status: String,
    pub message: String,
    pub meeting_url: String,
    pub duration_minutes: u64,
    pub recording_file: Option<String>,
    pub drive_link: Option<String>,
}

#[derive(Clone)]
pub struct MeetingState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

pub fn router(state: MeetingState) -> Router {
    Router::new()
        .route("/record-meeting", post(record_meeting))
        .with_state(state)
}

/// Records a meeting session and uploads the result to Google Drive.
///
/// Input-validation faults map to 400; everything else the orchestrator can
/// fail on comes back as a structured `failed` response.
async fn record_meeting(
    State(state): State<MeetingState>,
    Json(request): Json<MeetingRequest>,
) -> ApiResult<Json<MeetingResponse>> {
    let (session_request, duration_minutes) = to_session_request(&request);
    session_request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    info!(
        "record-meeting request for {} ({duration_minutes} min)",
        request.meeting_url
    );
    let outcome = state.orchestrator.run(session_request).await;

    Ok(Json(MeetingResponse {
        status: if outcome.succeeded {
            "completed".to_string()
        } else {
            "failed".to_string()
        },
        message: outcome.message,
        meeting_url: request.meeting_url,
        duration_minutes,
        recording_file: outcome.artifact_path.map(|p| p.display().to_string()),
        drive_link: outcome.remote_link,
    }))
}

fn to_session_request(request: &MeetingRequest) -> (SessionRequest, u64) {
    let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    let session_request = SessionRequest {
        meeting_url: request.meeting_url.clone(),
        duration: Duration::from_secs(duration_minutes.saturating_mul(60)),
        folder_name: request
            .folder_name
            .clone()
            .unwrap_or_else(|| DEFAULT_FOLDER_NAME.to_string()),
    };
    (session_request, duration_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_defaults_are_applied() {
        let request: MeetingRequest =
            serde_json::from_str(r#"{"meeting_url": "https://meet.example/abc"}"#).unwrap();
        let (session_request, minutes) = to_session_request(&request);
        assert_eq!(minutes, 30);
        assert_eq!(session_request.duration, Duration::from_secs(1800));
        assert_eq!(session_request.folder_name, "Meeting Recordings");
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let request: MeetingRequest = serde_json::from_str(
            r#"{"meeting_url": "https://meet.example/abc", "duration_minutes": 5, "folder_name": "Team Standups"}"#,
        )
        .unwrap();
        let (session_request, minutes) = to_session_request(&request);
        assert_eq!(minutes, 5);
        assert_eq!(session_request.duration, Duration::from_secs(300));
        assert_eq!(session_request.folder_name, "Team Standups");
    }

    #[test]
    fn zero_duration_fails_validation_before_any_resource() {
        let request: MeetingRequest = serde_json::from_str(
            r#"{"meeting_url": "https://meet.example/abc", "duration_minutes": 0}"#,
        )
        .unwrap();
        let (session_request, _) = to_session_request(&request);
        assert!(session_request.validate().is_err());
    }
}
