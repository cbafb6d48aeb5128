//! Recording session orchestration.
//!
//! One session is one end-to-end attempt to join a meeting, capture its
//! audio, and archive the artifact. The orchestrator composes the browser
//! automation session, the capture supervisor, and the upload collaborator
//! into a single structured outcome.

pub mod error;
pub mod orchestrator;

pub use self::error::SessionError;
pub use self::orchestrator::{SessionOrchestrator, SessionOutcome, SessionRequest};
