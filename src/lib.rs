//! meetcap joins a Google Meet session as a bot participant, records the
//! meeting audio for a bounded duration, and archives the recording to
//! Google Drive.

pub mod api;
pub mod app;
pub mod automation;
pub mod capture;
pub mod config;
pub mod drive;
pub mod session;
