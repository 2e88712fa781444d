//! Caller-facing outcome of a generation.

use std::time::Duration;

use veil_core::error::CoreError;

use crate::service::ServiceError;

/// Substring the remote service uses when the selected API key no
/// longer resolves to a project. Seeing it means the caller must pick a
/// key again.
pub const CREDENTIAL_NOT_FOUND_MARKER: &str = "Requested entity was not found";

/// Why a generation did not produce an artifact.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// A submit, poll or fetch call failed. Not retried.
    #[error("Generation failed: {0}")]
    Network(String),

    /// The selected credential is invalid or expired.
    #[error("Credential rejected: {0}")]
    Credential(String),

    /// The remote job finished with an error.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// The job finished without any result locator.
    #[error("Job finished without an artifact")]
    MissingArtifact,

    /// Waiting any longer would cross the request's deadline.
    #[error("Gave up waiting after {elapsed:?}")]
    DeadlineExceeded { elapsed: Duration },

    /// The request's attempt cap was reached while still pending.
    #[error("Gave up after {attempts} status queries")]
    AttemptsExhausted { attempts: u32 },

    /// The caller cancelled the wait.
    #[error("Generation cancelled")]
    Cancelled,

    /// The request failed validation and was never submitted.
    #[error(transparent)]
    InvalidRequest(#[from] CoreError),
}

impl GenerationError {
    /// Whether the caller should prompt for a new credential.
    pub fn is_credential(&self) -> bool {
        matches!(self, Self::Credential(_))
    }
}

/// Whether a remote error message signals a dead credential.
pub fn is_credential_message(message: &str) -> bool {
    message.contains(CREDENTIAL_NOT_FOUND_MARKER)
}

impl From<ServiceError> for GenerationError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MissingCredential => Self::Credential(err.to_string()),
            ServiceError::Api { ref message, .. } if is_credential_message(message) => {
                Self::Credential(message.clone())
            }
            other => {
                let message = other.to_string();
                if is_credential_message(&message) {
                    Self::Credential(message)
                } else {
                    Self::Network(message)
                }
            }
        }
    }
}

/// Map a terminal `Failed` status message onto an error.
pub fn job_failure(message: String) -> GenerationError {
    if is_credential_message(&message) {
        GenerationError::Credential(message)
    } else {
        GenerationError::JobFailed(message)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn not_found_api_error_is_credential() {
        let err = GenerationError::from(ServiceError::Api {
            status: 404,
            message: "Requested entity was not found.".into(),
        });
        assert!(err.is_credential());
    }

    #[test]
    fn other_api_error_is_network() {
        let err = GenerationError::from(ServiceError::Api {
            status: 404,
            message: "Model not found".into(),
        });
        assert_matches!(err, GenerationError::Network(_));
    }

    #[test]
    fn transport_error_with_marker_is_credential() {
        let err = GenerationError::from(ServiceError::Transport(
            "upstream said: Requested entity was not found".into(),
        ));
        assert!(err.is_credential());
    }

    #[test]
    fn marker_is_case_sensitive() {
        let err = GenerationError::from(ServiceError::Transport(
            "requested entity was not found".into(),
        ));
        assert!(!err.is_credential());
    }

    #[test]
    fn missing_key_is_credential() {
        assert!(GenerationError::from(ServiceError::MissingCredential).is_credential());
    }

    #[test]
    fn failed_status_classified() {
        assert_matches!(job_failure("quota".into()), GenerationError::JobFailed(m) if m == "quota");
        assert!(job_failure("Requested entity was not found.".into()).is_credential());
    }
}
