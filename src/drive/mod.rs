//! Google Drive upload collaborator.
//!
//! Given a local recording and a folder name, ensures the folder exists and
//! uploads the file under a timestamped name, returning the shareable link.
//! Authentication uses an OAuth2 refresh-token grant.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

use crate::config::DriveCredentials;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Remote metadata of an archived recording.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "webViewLink")]
    pub web_view_link: Option<String>,
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, local_path: &Path, folder_name: &str) -> Result<UploadedFile>;
}

pub struct DriveUploader {
    client: reqwest::Client,
    credentials: DriveCredentials,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

impl DriveUploader {
    pub fn new(credentials: DriveCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
        }
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("token refresh request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("token refresh rejected with status {status}: {body}");
        }

        let token: TokenResponse = response
            .json()
            .await
            .context("unreadable token refresh response")?;
        Ok(token.access_token)
    }

    /// Returns the id of the named folder, creating it if it does not exist.
    async fn ensure_folder(&self, token: &str, name: &str) -> Result<String> {
        let query = format!(
            "name='{}' and mimeType='{FOLDER_MIME}' and trashed=false",
            name.replace('\'', "\\'")
        );
        let list: FileList = self
            .client
            .get(FILES_URL)
            .bearer_auth(token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
            .send()
            .await
            .context("folder lookup request failed")?
            .error_for_status()
            .context("folder lookup rejected")?
            .json()
            .await
            .context("unreadable folder list response")?;

        if let Some(folder) = list.files.into_iter().next() {
            debug!("Drive folder '{name}' already exists");
            return Ok(folder.id);
        }

        let created: DriveFile = self
            .client
            .post(FILES_URL)
            .bearer_auth(token)
            .json(&json!({ "name": name, "mimeType": FOLDER_MIME }))
            .send()
            .await
            .context("folder create request failed")?
            .error_for_status()
            .context("folder create rejected")?
            .json()
            .await
            .context("unreadable folder create response")?;

        info!("created Drive folder '{name}'");
        Ok(created.id)
    }

    /// Resumable upload: open an upload session with the file metadata, then
    /// put the bytes against the returned session URI.
    async fn upload_file(
        &self,
        token: &str,
        path: &Path,
        folder_id: &str,
        file_name: &str,
    ) -> Result<UploadedFile> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let mime = mime_type_for(path);

        let start = self
            .client
            .post(format!(
                "{UPLOAD_URL}?uploadType=resumable&fields=id,name,webViewLink"
            ))
            .bearer_auth(token)
            .header("X-Upload-Content-Type", mime)
            .json(&json!({ "name": file_name, "parents": [folder_id] }))
            .send()
            .await
            .context("upload session request failed")?
            .error_for_status()
            .context("upload session rejected")?;

        let session_uri = start
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| anyhow!("upload session response missing location header"))?
            .to_string();

        let uploaded: UploadedFile = self
            .client
            .put(&session_uri)
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(bytes)
            .send()
            .await
            .context("upload request failed")?
            .error_for_status()
            .context("upload rejected")?
            .json()
            .await
            .context("unreadable upload response")?;

        Ok(uploaded)
    }
}

#[async_trait]
impl Uploader for DriveUploader {
    async fn upload(&self, local_path: &Path, folder_name: &str) -> Result<UploadedFile> {
        anyhow::ensure!(
            local_path.exists(),
            "recording not found: {}",
            local_path.display()
        );

        let token = self.access_token().await?;
        let folder_id = self.ensure_folder(&token, folder_name).await?;
        let file_name = remote_file_name(Local::now());

        info!(
            "uploading {} to Drive folder '{folder_name}' as {file_name}",
            local_path.display()
        );
        let uploaded = self
            .upload_file(&token, local_path, &folder_id, &file_name)
            .await?;
        info!("upload complete: {}", uploaded.name);
        Ok(uploaded)
    }
}

/// Remote naming convention: `meeting_recording_{YYYYMMDD_HHMMSS}.mp3`.
pub fn remote_file_name(now: DateTime<Local>) -> String {
    format!("meeting_recording_{}.mp3", now.format("%Y%m%d_%H%M%S"))
}

/// MIME detection by extension, octet-stream fallback.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn mime_detection_covers_audio_and_falls_back() {
        assert_eq!(mime_type_for(Path::new("a.mp3")), "audio/mpeg");
        assert_eq!(mime_type_for(Path::new("a.MP3")), "audio/mpeg");
        assert_eq!(mime_type_for(Path::new("a.wav")), "audio/wav");
        assert_eq!(mime_type_for(Path::new("a.xyz")), "application/octet-stream");
        assert_eq!(mime_type_for(Path::new("noext")), "application/octet-stream");
    }

    #[test]
    fn remote_name_is_timestamped_mp3() {
        let when = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(remote_file_name(when), "meeting_recording_20240309_140507.mp3");
    }
}
