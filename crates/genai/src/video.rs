//! Video generation on Veo models.
//!
//! Fresh videos use the fast preview model; extending an earlier video
//! needs the full model, which is the only one that accepts a `video`
//! input.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use veil_core::generation::{
    Artifact, ArtifactLocator, GenerationRequest, JobHandle, JobStatus, SeedArtifact,
};
use veil_core::types::DEFAULT_VIDEO_MIME;

use crate::api::GeminiApi;
use crate::messages::{InlineImage, PredictRequest, VideoInstance, VideoParameters, VideoRef};
use crate::service::{GenerationService, ServiceError};

/// Model for new videos.
pub const VIDEO_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Model for extending a prior video.
pub const VIDEO_EXTEND_MODEL: &str = "veo-3.1-generate-preview";

/// [`GenerationService`] backed by Veo long-running operations.
pub struct VideoService {
    api: Arc<GeminiApi>,
}

impl VideoService {
    pub fn new(api: Arc<GeminiApi>) -> Self {
        Self { api }
    }

    /// Model to use for `request`.
    pub fn model_for(request: &GenerationRequest) -> &'static str {
        if request.is_extension() {
            VIDEO_EXTEND_MODEL
        } else {
            VIDEO_MODEL
        }
    }

    /// Build the REST body for `request`.
    pub fn build_body(request: &GenerationRequest) -> PredictRequest {
        let (image, video) = match &request.seed {
            Some(SeedArtifact::Image { bytes, mime_type }) => (
                Some(InlineImage {
                    bytes_base64_encoded: STANDARD.encode(bytes),
                    mime_type: mime_type.clone(),
                }),
                None,
            ),
            Some(SeedArtifact::PriorJob(ArtifactLocator::Uri(uri))) => {
                (None, Some(VideoRef { uri: uri.clone() }))
            }
            // Rejected by request validation before submission.
            Some(SeedArtifact::PriorJob(ArtifactLocator::Inline { .. })) | None => (None, None),
        };

        PredictRequest {
            instances: vec![VideoInstance {
                prompt: request.prompt.clone(),
                image,
                video,
            }],
            parameters: VideoParameters {
                sample_count: request.config.count,
                resolution: request.config.resolution.clone(),
                aspect_ratio: request.config.aspect_ratio.clone(),
            },
        }
    }
}

#[async_trait]
impl GenerationService for VideoService {
    async fn submit(&self, request: &GenerationRequest) -> Result<JobHandle, ServiceError> {
        let model = Self::model_for(request);
        let operation = self
            .api
            .predict_long_running(model, &Self::build_body(request))
            .await?;

        if operation.name.is_empty() {
            return Err(ServiceError::Decode(
                "operation response has no name".to_string(),
            ));
        }

        tracing::debug!(model, operation = %operation.name, "Video operation created");
        Ok(JobHandle::new(operation.name))
    }

    async fn poll(&self, handle: &JobHandle) -> Result<JobStatus, ServiceError> {
        let operation = self.api.get_operation(handle.as_str()).await?;
        Ok(operation.status())
    }

    async fn fetch(&self, locator: &ArtifactLocator) -> Result<Artifact, ServiceError> {
        match locator {
            ArtifactLocator::Uri(uri) => self.api.download(uri, DEFAULT_VIDEO_MIME).await,
            ArtifactLocator::Inline { .. } => Artifact::from_inline(locator)
                .ok_or_else(|| ServiceError::Decode("unreadable inline artifact".to_string())),
        }
    }
}
