//! Service bootstrap: config, credentials, collaborators, API server.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::api::ApiServer;
use crate::automation::ChromeLauncher;
use crate::capture::FfmpegRecorder;
use crate::config::{Config, Credentials, DriveCredentials};
use crate::drive::DriveUploader;
use crate::session::SessionOrchestrator;

pub async fn run_service(port_override: Option<u16>) -> Result<()> {
    info!("Starting meetcap service");

    let config = Config::load()?;

    // Configuration faults surface here, before any browser resource exists.
    let credentials =
        Credentials::from_env().context("meeting account credentials missing")?;
    let drive_credentials =
        DriveCredentials::from_env().context("Google Drive credentials missing")?;

    std::fs::create_dir_all(&config.recording.output_dir)
        .context("Failed to create recordings directory")?;

    let launcher = Arc::new(ChromeLauncher::new(config.browser.clone()));
    let recorder = Arc::new(FfmpegRecorder::new(config.capture.clone()));
    let uploader = Arc::new(DriveUploader::new(drive_credentials));

    let orchestrator = Arc::new(SessionOrchestrator::new(
        launcher,
        recorder,
        uploader,
        credentials,
        config.recording.output_dir.clone(),
    ));

    let port = port_override.unwrap_or(config.server.port);
    info!("meetcap is ready, try: curl -X POST http://127.0.0.1:{port}/record-meeting");

    ApiServer::new(port, orchestrator).start().await
}
