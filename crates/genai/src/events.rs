//! Progress events emitted while a generation is in flight.
//!
//! These are for display only. Nothing in the poller depends on anyone
//! receiving them.

use serde::Serialize;
use veil_core::generation::{EXTEND_MESSAGE, SUBMIT_MESSAGE};
use veil_core::types::Timestamp;

/// A user-facing event about one generation job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GenerationEvent {
    /// The request was accepted and a job token assigned.
    Submitted {
        job: String,
        /// The job continues an earlier artifact.
        extension: bool,
        at: Timestamp,
    },

    /// The job is still pending after `attempt` status queries.
    Progress {
        job: String,
        attempt: u32,
        /// Rotating flavor text for the UI.
        message: String,
        at: Timestamp,
    },

    /// The job finished and its artifact was fetched.
    Completed {
        job: String,
        mime_type: String,
        bytes: usize,
        at: Timestamp,
    },

    /// The job or one of the calls around it failed.
    Failed {
        job: Option<String>,
        error: String,
        /// Set when the caller should select a new credential.
        credential: bool,
        at: Timestamp,
    },
}

impl GenerationEvent {
    /// Human-readable one-liner for status displays.
    pub fn display_text(&self) -> String {
        match self {
            Self::Submitted {
                extension: true, ..
            } => EXTEND_MESSAGE.to_string(),
            Self::Submitted { .. } => SUBMIT_MESSAGE.to_string(),
            Self::Progress { message, .. } => message.clone(),
            Self::Completed { mime_type, bytes, .. } => {
                format!("Manifested {mime_type} ({bytes} bytes)")
            }
            Self::Failed {
                credential: true, ..
            } => "Your key was rejected. Select a key to continue.".to_string(),
            Self::Failed { error, .. } => format!("The ritual failed: {error}"),
        }
    }
}
