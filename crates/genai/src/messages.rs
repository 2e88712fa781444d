//! Gemini REST payload types.
//!
//! Video generation goes through `models/{model}:predictLongRunning`,
//! which answers with a long-running [`Operation`]. Image generation and
//! chat go through `models/{model}:generateContent`, which answers
//! synchronously with a [`GenerateContentResponse`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use veil_core::generation::{ArtifactLocator, JobStatus};

// ---------------------------------------------------------------------------
// predictLongRunning (video)
// ---------------------------------------------------------------------------

/// Body of a `predictLongRunning` call.
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

/// One video to generate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInstance {
    pub prompt: String,
    /// First frame to animate from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<InlineImage>,
    /// Earlier video to extend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRef {
    pub uri: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub sample_count: u32,
    pub resolution: String,
    pub aspect_ratio: String,
}

/// A long-running operation as returned by submission and by
/// `GET /v1beta/{name}`.
#[derive(Debug, Clone, Deserialize)]
pub struct Operation {
    /// Fully-qualified operation name, used as the job token.
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedSample {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

impl Operation {
    /// Map the operation onto the three-state job status.
    ///
    /// An `error` wins over `done`; a finished operation without any
    /// sample URIs yields `Done` with an empty list.
    pub fn status(&self) -> JobStatus {
        if let Some(error) = &self.error {
            let message = if error.message.is_empty() {
                format!("operation failed with code {}", error.code)
            } else {
                error.message.clone()
            };
            return JobStatus::Failed(message);
        }
        if !self.done {
            return JobStatus::Pending;
        }

        let locators = self
            .response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
            .map(|r| {
                r.generated_samples
                    .iter()
                    .filter_map(|s| s.video.as_ref())
                    .map(|v| ArtifactLocator::Uri(v.uri.clone()))
                    .collect()
            })
            .unwrap_or_default();

        JobStatus::Done(locators)
    }
}

// ---------------------------------------------------------------------------
// generateContent (image, chat)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationSettings>,
}

impl GenerateContentRequest {
    /// A single-turn request made of the given parts.
    pub fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            contents: vec![Content { parts }],
            system_instruction: None,
            generation_config: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.into(),
                data: STANDARD.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationSettings {
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or(&[])
    }

    /// Concatenated text of the first candidate, `None` when blank.
    pub fn text(&self) -> Option<String> {
        let text: String = self
            .first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Decoded inline media of the first candidate, in part order.
    ///
    /// Parts whose payload is not valid base64 are skipped.
    pub fn inline_artifacts(&self) -> Vec<ArtifactLocator> {
        self.first_parts()
            .iter()
            .filter_map(|p| p.inline_data.as_ref())
            .filter_map(|d| {
                STANDARD
                    .decode(&d.data)
                    .ok()
                    .map(|bytes| ArtifactLocator::Inline {
                        bytes,
                        mime_type: d.mime_type.clone(),
                    })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Pull `error.message` out of a Google API error body, falling back to
/// the raw body when it is not in that shape.
pub fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_request_uses_rest_field_names() {
        let req = PredictRequest {
            instances: vec![VideoInstance {
                prompt: "a glowing orb".into(),
                image: Some(InlineImage {
                    bytes_base64_encoded: "AAEC".into(),
                    mime_type: "image/png".into(),
                }),
                video: None,
            }],
            parameters: VideoParameters {
                sample_count: 1,
                resolution: "720p".into(),
                aspect_ratio: "16:9".into(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["instances"][0]["prompt"], "a glowing orb");
        assert_eq!(json["instances"][0]["image"]["bytesBase64Encoded"], "AAEC");
        assert_eq!(json["instances"][0]["image"]["mimeType"], "image/png");
        assert!(json["instances"][0].get("video").is_none());
        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
    }

    #[test]
    fn pending_operation() {
        let op: Operation = serde_json::from_str(r#"{"name":"models/veo/operations/1"}"#).unwrap();
        assert_eq!(op.status(), JobStatus::Pending);
    }

    #[test]
    fn finished_operation_lists_uris() {
        let json = r#"{
            "name": "models/veo/operations/1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [
                {"video": {"uri": "https://x/a.mp4"}},
                {"video": {"uri": "https://x/b.mp4"}}
            ]}}
        }"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(
            op.status(),
            JobStatus::Done(vec![
                ArtifactLocator::Uri("https://x/a.mp4".into()),
                ArtifactLocator::Uri("https://x/b.mp4".into()),
            ])
        );
    }

    #[test]
    fn finished_operation_without_samples_is_empty_done() {
        let op: Operation =
            serde_json::from_str(r#"{"name":"op","done":true,"response":{}}"#).unwrap();
        assert_eq!(op.status(), JobStatus::Done(vec![]));
    }

    #[test]
    fn operation_error_is_failed() {
        let json = r#"{"name":"op","done":true,"error":{"code":3,"message":"prompt blocked"}}"#;
        let op: Operation = serde_json::from_str(json).unwrap();
        assert_eq!(op.status(), JobStatus::Failed("prompt blocked".into()));
    }

    #[test]
    fn operation_error_without_message_reports_code() {
        let op: Operation =
            serde_json::from_str(r#"{"name":"op","error":{"code":13}}"#).unwrap();
        assert_eq!(
            op.status(),
            JobStatus::Failed("operation failed with code 13".into())
        );
    }

    #[test]
    fn content_request_skips_empty_fields() {
        let req = GenerateContentRequest::from_parts(vec![
            Part::text("make it gritty"),
            Part::inline("image/png", &[0, 1, 2]),
        ]);
        let json = serde_json::to_value(&req).unwrap();

        assert!(json.get("systemInstruction").is_none());
        assert_eq!(json["contents"][0]["parts"][0]["text"], "make it gritty");
        assert!(json["contents"][0]["parts"][0].get("inlineData").is_none());
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "AAEC");
    }

    #[test]
    fn response_text_concatenates_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"Hold "},{"text":"the line."}]}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text().as_deref(), Some("Hold the line."));
    }

    #[test]
    fn blank_response_has_no_text() {
        let resp: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(resp.text().is_none());
        assert!(resp.inline_artifacts().is_empty());
    }

    #[test]
    fn response_inline_images_decoded() {
        let json = r#"{"candidates":[{"content":{"parts":[
            {"text":"here you go"},
            {"inlineData":{"mimeType":"image/png","data":"AAEC"}}
        ]}}]}"#;
        let resp: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.inline_artifacts(),
            vec![ArtifactLocator::Inline {
                bytes: vec![0, 1, 2],
                mime_type: "image/png".into(),
            }]
        );
    }

    #[test]
    fn error_message_extracted_from_envelope() {
        let body = r#"{"error":{"code":404,"message":"Requested entity was not found.","status":"NOT_FOUND"}}"#;
        assert_eq!(error_message(body), "Requested entity was not found.");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }
}
