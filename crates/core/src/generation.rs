//! Generation request, job status, and artifact types.
//!
//! A [`GenerationRequest`] is built once per submission and only ever
//! borrowed afterwards. The remote service hands back a [`JobHandle`]
//! which is polled until a terminal [`JobStatus`] arrives; the first
//! [`ArtifactLocator`] of a `Done` status is then fetched into an
//! [`Artifact`].

use std::fmt;

use crate::error::CoreError;
use crate::polling::PollPolicy;

// ---------------------------------------------------------------------------
// Output configuration
// ---------------------------------------------------------------------------

/// 720p output.
pub const RESOLUTION_720P: &str = "720p";
/// 1080p output.
pub const RESOLUTION_1080P: &str = "1080p";

/// All resolutions the remote service accepts.
pub const VALID_RESOLUTIONS: &[&str] = &[RESOLUTION_720P, RESOLUTION_1080P];

/// Landscape.
pub const ASPECT_16_9: &str = "16:9";
/// Portrait.
pub const ASPECT_9_16: &str = "9:16";

/// All aspect ratios the remote service accepts.
pub const VALID_ASPECT_RATIOS: &[&str] = &[ASPECT_16_9, ASPECT_9_16];

/// Upper bound on outputs requested in a single submission.
pub const MAX_OUTPUT_COUNT: u32 = 4;

// ---------------------------------------------------------------------------
// Progress flavor text
// ---------------------------------------------------------------------------

/// Shown while a fresh generation is being submitted.
pub const SUBMIT_MESSAGE: &str = "Initializing Timeline Ritual...";

/// Shown while an extension of a prior job is being submitted.
pub const EXTEND_MESSAGE: &str = "Extending path...";

/// Rotating messages shown at each pending poll tick.
pub const PROGRESS_MESSAGES: &[&str] = &[
    "Weaving threads...",
    "Manifesting echoes...",
    "Stabilizing rift...",
    "Polishing lens...",
    "Finalizing vision...",
];

/// Flavor text for the `tick`-th pending poll (zero-based), wrapping
/// around the fixed list.
pub fn progress_message(tick: u32) -> &'static str {
    PROGRESS_MESSAGES[tick as usize % PROGRESS_MESSAGES.len()]
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Output shape requested from the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationConfig {
    /// Number of outputs to generate (at least 1).
    pub count: u32,
    /// One of [`VALID_RESOLUTIONS`].
    pub resolution: String,
    /// One of [`VALID_ASPECT_RATIOS`].
    pub aspect_ratio: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            count: 1,
            resolution: RESOLUTION_720P.to_string(),
            aspect_ratio: ASPECT_16_9.to_string(),
        }
    }
}

/// Optional starting point for a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedArtifact {
    /// Raw image the output should start from.
    Image { bytes: Vec<u8>, mime_type: String },
    /// Output of an earlier job, e.g. a video being extended.
    PriorJob(ArtifactLocator),
}

/// Immutable description of one unit of work for the remote service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub seed: Option<SeedArtifact>,
    pub config: GenerationConfig,
    /// How long and how often to wait for the job.
    pub poll: PollPolicy,
}

impl GenerationRequest {
    /// A request with the default output config and poll policy.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            seed: None,
            config: GenerationConfig::default(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_seed(mut self, seed: SeedArtifact) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    /// Whether this request continues the output of a previous job.
    pub fn is_extension(&self) -> bool {
        matches!(self.seed, Some(SeedArtifact::PriorJob(_)))
    }
}

// ---------------------------------------------------------------------------
// Job handle and status
// ---------------------------------------------------------------------------

/// Opaque service-assigned token for an in-flight operation.
///
/// Deliberately not `Clone`: the poller owns the handle for exactly one
/// polling sequence and drops it once a terminal status is seen.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a finished result can be obtained from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocator {
    /// Remote resource that needs an authenticated GET.
    Uri(String),
    /// The service returned the media in its response body.
    Inline { bytes: Vec<u8>, mime_type: String },
}

impl ArtifactLocator {
    /// Short description suitable for log fields.
    pub fn describe(&self) -> String {
        match self {
            Self::Uri(uri) => uri.clone(),
            Self::Inline { bytes, mime_type } => {
                format!("inline {mime_type} ({} bytes)", bytes.len())
            }
        }
    }
}

/// Status of a submitted job as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    /// One or more result locators.
    Done(Vec<ArtifactLocator>),
    /// Diagnostic message from the service.
    Failed(String),
}


// ---------------------------------------------------------------------------
// Artifact
// ---------------------------------------------------------------------------

/// Fetched result of a finished job. Owned by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    /// URI the bytes were fetched from, `None` for inline results.
    pub source_uri: Option<String>,
}

impl Artifact {
    /// Materialize an inline locator without any I/O.
    ///
    /// Returns `None` for [`ArtifactLocator::Uri`], which must be fetched.
    pub fn from_inline(locator: &ArtifactLocator) -> Option<Self> {
        match locator {
            ArtifactLocator::Inline { bytes, mime_type } => Some(Self {
                bytes: bytes.clone(),
                mime_type: mime_type.clone(),
                source_uri: None,
            }),
            ArtifactLocator::Uri(_) => None,
        }
    }

    /// File extension matching the MIME type (without the dot).
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime_type)
    }

    /// Reference to this artifact usable as the seed of a follow-up job.
    pub fn as_prior_job(&self) -> Option<SeedArtifact> {
        self.source_uri
            .as_ref()
            .map(|uri| SeedArtifact::PriorJob(ArtifactLocator::Uri(uri.clone())))
    }
}

/// File extension for a MIME type, ignoring any parameters.
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// MIME type for an image file extension, if it is one we can upload.
pub fn image_mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate what a request asks the remote service to produce.
///
/// The request's [`PollPolicy`] is not checked here: callers may wait
/// with a different policy, and validate the one they actually use.
pub fn validate_request(request: &GenerationRequest) -> Result<(), CoreError> {
    if request.prompt.trim().is_empty() {
        return Err(CoreError::Validation("prompt must not be empty".to_string()));
    }
    validate_config(&request.config)?;
    if let Some(seed) = &request.seed {
        validate_seed(seed)?;
    }
    Ok(())
}

/// Validate the output shape of a request.
pub fn validate_config(config: &GenerationConfig) -> Result<(), CoreError> {
    if config.count == 0 || config.count > MAX_OUTPUT_COUNT {
        return Err(CoreError::Validation(format!(
            "count must be between 1 and {MAX_OUTPUT_COUNT}, got {}",
            config.count
        )));
    }
    if !VALID_RESOLUTIONS.contains(&config.resolution.as_str()) {
        return Err(CoreError::Validation(format!(
            "Invalid resolution '{}'. Must be one of: {}",
            config.resolution,
            VALID_RESOLUTIONS.join(", ")
        )));
    }
    if !VALID_ASPECT_RATIOS.contains(&config.aspect_ratio.as_str()) {
        return Err(CoreError::Validation(format!(
            "Invalid aspect ratio '{}'. Must be one of: {}",
            config.aspect_ratio,
            VALID_ASPECT_RATIOS.join(", ")
        )));
    }
    Ok(())
}

fn validate_seed(seed: &SeedArtifact) -> Result<(), CoreError> {
    match seed {
        SeedArtifact::Image { bytes, mime_type } => {
            if bytes.is_empty() {
                return Err(CoreError::Validation("seed image is empty".to_string()));
            }
            if !mime_type.starts_with("image/") {
                return Err(CoreError::Validation(format!(
                    "seed image has non-image MIME type '{mime_type}'"
                )));
            }
            Ok(())
        }
        SeedArtifact::PriorJob(ArtifactLocator::Uri(uri)) if uri.trim().is_empty() => Err(
            CoreError::Validation("prior job reference has an empty URI".to_string()),
        ),
        SeedArtifact::PriorJob(ArtifactLocator::Uri(_)) => Ok(()),
        SeedArtifact::PriorJob(ArtifactLocator::Inline { .. }) => Err(CoreError::Validation(
            "prior job reference must be a remote URI".to_string(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
