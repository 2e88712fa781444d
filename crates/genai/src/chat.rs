//! One-shot text calls: the league's lore assistant and image style
//! analysis.
//!
//! Both calls degrade to a fixed fallback string instead of failing, so
//! a chat panel always has something to show. Credential rejections
//! still invalidate the session.

use std::sync::Arc;

use veil_core::data_url::DataUrl;

use crate::api::GeminiApi;
use crate::error::is_credential_message;
use crate::messages::{Content, GenerateContentRequest, GenerationSettings, Part};
use crate::service::ServiceError;

/// Model for text answers.
pub const CHAT_MODEL: &str = "gemini-3-flash-preview";

/// Default persona for the lore assistant.
pub const CHRONOSCRIBE_INSTRUCTION: &str = "You are the ChronoScribe, keeper of knowledge for \
    the DC Universe Online league 'The Ashen Veil'. You provide expert advice on builds, raids, \
    farming, and lore.";

/// Sampling temperature for chat answers.
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Returned when the model answers with no text.
pub const EMPTY_ANSWER_FALLBACK: &str = "I cannot see the path clearly at this moment...";

/// Returned when the chat call fails.
pub const CHAT_ERROR_FALLBACK: &str = "The void whispers of an error in our connection.";

/// Instruction for style analysis.
pub const STYLE_INSTRUCTION: &str = "Analyze the visual theme, color palette, lighting style, \
    and overall aesthetic of this image. Provide 15 descriptive keywords suitable for generating \
    matching game UI assets. Include details like lighting color (e.g., 'amber glow'), material \
    properties (e.g., 'brushed obsidian', 'glowing crystalline'), and overall vibe (e.g., \
    'gritty noir', 'neon cyberpunk').";

/// Returned when style analysis yields no text.
pub const STYLE_EMPTY_FALLBACK: &str =
    "mystical, high-fidelity, superhero game style, cinematic lighting";

/// Returned when style analysis fails.
pub const STYLE_ERROR_FALLBACK: &str = "cinematic, heroic, detailed, high-tech";

/// Text-only client on top of [`GeminiApi`].
pub struct ChatClient {
    api: Arc<GeminiApi>,
    system_instruction: String,
}

impl ChatClient {
    /// A client using the ChronoScribe persona.
    pub fn new(api: Arc<GeminiApi>) -> Self {
        Self::with_instruction(api, CHRONOSCRIBE_INSTRUCTION)
    }

    pub fn with_instruction(api: Arc<GeminiApi>, system_instruction: impl Into<String>) -> Self {
        Self {
            api,
            system_instruction: system_instruction.into(),
        }
    }

    /// Answer `prompt` in persona. Never fails; see the fallback constants.
    pub async fn respond(&self, prompt: &str) -> String {
        let body = GenerateContentRequest {
            system_instruction: Some(Content {
                parts: vec![Part::text(self.system_instruction.clone())],
            }),
            generation_config: Some(GenerationSettings {
                temperature: CHAT_TEMPERATURE,
            }),
            ..GenerateContentRequest::from_parts(vec![Part::text(prompt)])
        };

        match self.api.generate_content(CHAT_MODEL, &body).await {
            Ok(response) => response
                .text()
                .unwrap_or_else(|| EMPTY_ANSWER_FALLBACK.to_string()),
            Err(e) => {
                self.note_failure(&e, "Chat completion failed");
                CHAT_ERROR_FALLBACK.to_string()
            }
        }
    }

    /// Describe the visual style of an image as generation keywords.
    ///
    /// `source` is either a `data:` URL, sent inline, or a remote URL,
    /// which is only mentioned in the text.
    pub async fn analyze_style(&self, source: &str) -> String {
        let parts = if source.starts_with("data:") {
            match DataUrl::parse(source) {
                Ok(image) => vec![
                    Part::text(STYLE_INSTRUCTION),
                    Part::inline(image.mime_type, &image.bytes),
                ],
                Err(e) => {
                    tracing::warn!(error = %e, "Style source is not a usable data URL");
                    return STYLE_ERROR_FALLBACK.to_string();
                }
            }
        } else {
            vec![Part::text(format!("{STYLE_INSTRUCTION} Image Source URL: {source}"))]
        };

        let body = GenerateContentRequest::from_parts(parts);
        match self.api.generate_content(CHAT_MODEL, &body).await {
            Ok(response) => response
                .text()
                .unwrap_or_else(|| STYLE_EMPTY_FALLBACK.to_string()),
            Err(e) => {
                self.note_failure(&e, "Style analysis failed");
                STYLE_ERROR_FALLBACK.to_string()
            }
        }
    }

    fn note_failure(&self, err: &ServiceError, what: &str) {
        tracing::error!(error = %err, "{what}");
        let credential = matches!(err, ServiceError::MissingCredential)
            || is_credential_message(&err.to_string());
        if credential {
            self.api.session().invalidate();
        }
    }
}
