//! `data:` URL helpers for inline media.
//!
//! Uploaded images arrive as `data:<mime>;base64,<payload>` strings and
//! generated images are handed back in the same shape.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::CoreError;
use crate::generation::SeedArtifact;

/// A decoded `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Parse a base64 `data:` URL.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let rest = input
            .strip_prefix("data:")
            .ok_or_else(|| CoreError::InvalidDataUrl("missing 'data:' prefix".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| CoreError::InvalidDataUrl("missing ',' separator".to_string()))?;

        let mut params = header.split(';');
        let mime_type = params.next().unwrap_or("").trim();
        if mime_type.is_empty() {
            return Err(CoreError::InvalidDataUrl("missing MIME type".to_string()));
        }
        if !params.any(|p| p.trim() == "base64") {
            return Err(CoreError::InvalidDataUrl(
                "only base64 payloads are supported".to_string(),
            ));
        }

        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| CoreError::InvalidDataUrl(format!("bad base64 payload: {e}")))?;

        Ok(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }

    /// Encode bytes as a base64 `data:` URL.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
        format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
    }

    /// Use the decoded image as a generation seed.
    pub fn into_seed(self) -> SeedArtifact {
        SeedArtifact::Image {
            bytes: self.bytes,
            mime_type: self.mime_type,
        }
    }
}
