//! REST API server for meetcap.
//!
//! Provides HTTP endpoints for:
//! - Recording a meeting (POST /record-meeting)
//! - Service info (GET /)

pub mod error;
pub mod routes;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

use crate::session::SessionOrchestrator;
use self::routes::meetings::MeetingState;

pub struct ApiServer {
    port: u16,
    state: MeetingState,
}

impl ApiServer {
    pub fn new(port: u16, orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            port,
            state: MeetingState { orchestrator },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .merge(routes::meetings::router(self.state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", self.port)).await?;

        info!("API server listening on http://0.0.0.0:{}", self.port);
        info!("Endpoints:");
        info!("  GET  /               - Service info");
        info!("  POST /record-meeting - Record a meeting and upload to Drive");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetcap",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
