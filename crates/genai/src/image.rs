//! Image generation and transformation.
//!
//! `generateContent` on the image model answers synchronously, so
//! [`ImageService::submit`] makes the call and parks the outcome under a
//! fresh token. The first poll hands it back and forgets the token,
//! which keeps the submit-poll-fetch contract of [`GenerationService`].
//! Outcomes nobody polls for are dropped after [`PARKED_RESULT_TTL`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use veil_core::generation::{
    Artifact, ArtifactLocator, GenerationRequest, JobHandle, JobStatus, SeedArtifact,
};
use veil_core::types::DEFAULT_IMAGE_MIME;

use crate::api::GeminiApi;
use crate::messages::{GenerateContentRequest, Part};
use crate::service::{GenerationService, ServiceError};

/// Model for image output.
pub const IMAGE_MODEL: &str = "gemini-2.5-flash-image";

/// How long a generated image waits for its first poll.
pub const PARKED_RESULT_TTL: Duration = Duration::from_secs(600);

/// Failure reported when the model answers without any image part.
pub const NO_IMAGE_MESSAGE: &str = "model returned no image";

/// Instruction wrapped around the prompt when transforming a seed image.
pub fn transform_instruction(prompt: &str) -> String {
    format!(
        "Transform this character/image into a high-quality comic book style illustration \
         based on the following instructions: {prompt}. Return only the image."
    )
}

/// [`GenerationService`] backed by synchronous image generation.
pub struct ImageService {
    api: Arc<GeminiApi>,
    finished: Mutex<HashMap<String, Parked>>,
}

struct Parked {
    at: Instant,
    status: JobStatus,
}

impl ImageService {
    pub fn new(api: Arc<GeminiApi>) -> Self {
        Self {
            api,
            finished: Mutex::new(HashMap::new()),
        }
    }

    /// Build the REST body for `request`.
    ///
    /// A seed image turns the call into a transformation; without one
    /// the prompt is sent as-is.
    pub fn build_body(request: &GenerationRequest) -> GenerateContentRequest {
        let parts = match &request.seed {
            Some(SeedArtifact::Image { bytes, mime_type }) => vec![
                Part::text(transform_instruction(&request.prompt)),
                Part::inline(mime_type.clone(), bytes),
            ],
            _ => vec![Part::text(request.prompt.clone())],
        };
        GenerateContentRequest::from_parts(parts)
    }

    /// Park `status` under a fresh token, dropping expired entries.
    async fn park(&self, status: JobStatus) -> JobHandle {
        let token = uuid::Uuid::new_v4().to_string();
        let mut finished = self.finished.lock().await;
        evict_expired(&mut finished);
        tracing::debug!(job = %token, terminal = ?status, "Image generated");
        finished.insert(
            token.clone(),
            Parked {
                at: Instant::now(),
                status,
            },
        );
        JobHandle::new(token)
    }
}

fn evict_expired(finished: &mut HashMap<String, Parked>) {
    let before = finished.len();
    finished.retain(|_, parked| parked.at.elapsed() < PARKED_RESULT_TTL);
    let evicted = before - finished.len();
    if evicted > 0 {
        tracing::debug!(evicted, "Dropped unclaimed image results");
    }
}

#[async_trait]
impl GenerationService for ImageService {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ServiceError> {
        if matches!(request.seed, Some(SeedArtifact::PriorJob(_))) {
            return Err(ServiceError::Api {
                status: 400,
                message: "image generation cannot extend a prior job".to_string(),
            });
        }

        let response = self
            .api
            .generate_content(IMAGE_MODEL, &Self::build_body(request))
            .await?;

        let images = response.inline_artifacts();
        let status = if images.is_empty() {
            JobStatus::Failed(NO_IMAGE_MESSAGE.to_string())
        } else {
            JobStatus::Done(images)
        };

        Ok(self.park(status).await)
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, ServiceError> {
        let mut finished = self.finished.lock().await;
        evict_expired(&mut finished);
        finished
            .remove(handle.as_str())
            .map(|parked| parked.status)
            .ok_or_else(|| ServiceError::Api {
                status: 404,
                message: format!("unknown image job {handle}"),
            })
    }

    async fn fetch(&self, locator: &ArtifactLocator) -> Result<Artifact, ServiceError> {
        match locator {
            ArtifactLocator::Inline { .. } => Artifact::from_inline(locator)
                .ok_or_else(|| ServiceError::Decode("unreadable inline artifact".to_string())),
            ArtifactLocator::Uri(uri) => self.api.download(uri, DEFAULT_IMAGE_MIME).await,
        }
    }
}
