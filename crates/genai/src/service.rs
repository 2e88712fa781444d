//! The seam between the poller and a remote generation backend.
//!
//! A [`GenerationService`] speaks the backend's long-running operation
//! protocol: submit once, query status by handle, fetch a finished
//! artifact. [`JobPoller`](crate::poller::JobPoller) drives the loop;
//! implementations only make single calls.

use async_trait::async_trait;
use veil_core::generation::{Artifact, ArtifactLocator, GenerationRequest, JobHandle, JobStatus};

/// A remote service that runs generation jobs asynchronously.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Submit a request and return the service-assigned handle.
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ServiceError>;

    /// Query the current status of a submitted job.
    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, ServiceError>;

    /// Retrieve the artifact behind a locator from a `Done` status.
    async fn fetch(&self, locator: &ArtifactLocator) -> Result<Artifact, ServiceError>;
}

/// Errors from a single call to a generation backend.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// The backend returned a non-2xx status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message extracted from the response body.
        message: String,
    },

    /// The response body did not have the expected shape.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// No API key is available in the session.
    #[error("No API key selected")]
    MissingCredential,
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
