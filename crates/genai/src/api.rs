//! REST client for the Gemini generative-language endpoints.
//!
//! Wraps the three calls the services need (`generateContent`,
//! `predictLongRunning`, operation lookup) plus the authenticated
//! download of generated media, using [`reqwest`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use veil_core::generation::Artifact;

use crate::messages::{
    error_message, GenerateContentRequest, GenerateContentResponse, Operation, PredictRequest,
};
use crate::service::ServiceError;
use crate::session::Session;

/// Public Gemini API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// API version prefix used for every call.
const API_VERSION: &str = "v1beta";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for one Gemini endpoint.
pub struct GeminiApi {
    client: reqwest::Client,
    base_url: String,
    session: Arc<Session>,
}

impl GeminiApi {
    /// Create a new API client.
    ///
    /// * `base_url` - scheme and host, e.g. [`DEFAULT_BASE_URL`].
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, session)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        session: Arc<Session>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// `POST /v1beta/models/{model}:generateContent`.
    pub async fn generate_content(
        &self,
        model: &str,
        body: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, ServiceError> {
        self.post_json(&format!("models/{model}:generateContent"), body)
            .await
    }

    /// `POST /v1beta/models/{model}:predictLongRunning`.
    ///
    /// Returns the freshly created operation.
    pub async fn predict_long_running(
        &self,
        model: &str,
        body: &PredictRequest,
    ) -> Result<Operation, ServiceError> {
        self.post_json(&format!("models/{model}:predictLongRunning"), body)
            .await
    }

    /// `GET /v1beta/{operation_name}`.
    pub async fn get_operation(&self, name: &str) -> Result<Operation, ServiceError> {
        let key = self.key()?;
        let response = self
            .client
            .get(self.url(name))
            .header(API_KEY_HEADER, key)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download a generated file.
    ///
    /// The key goes both in the header and as the `key` query parameter,
    /// since download links are sometimes served from hosts that only
    /// honour the latter. `default_mime` is used when the response has
    /// no `Content-Type`.
    pub async fn download(&self, uri: &str, default_mime: &str) -> Result<Artifact, ServiceError> {
        let key = self.key()?;
        let response = self
            .client
            .get(uri)
            .query(&[("key", key.as_str())])
            .header(API_KEY_HEADER, &key)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(default_mime)
            .to_string();
        let bytes = response.bytes().await?.to_vec();

        Ok(Artifact {
            bytes,
            mime_type,
            source_uri: Some(uri.to_string()),
        })
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}/{API_VERSION}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn key(&self) -> Result<String, ServiceError> {
        self.session.api_key().ok_or(ServiceError::MissingCredential)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ServiceError> {
        let key = self.key()?;
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, key)
            .json(body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ServiceError::Api`]
    /// carrying the API error message on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ServiceError::Api {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_version_and_path() {
        let api = GeminiApi::new("http://localhost:9999/", Arc::new(Session::empty()));
        assert_eq!(
            api.url("models/veo:predictLongRunning"),
            "http://localhost:9999/v1beta/models/veo:predictLongRunning"
        );
        assert_eq!(
            api.url("/models/veo/operations/7"),
            "http://localhost:9999/v1beta/models/veo/operations/7"
        );
    }

    #[tokio::test]
    async fn calls_without_key_fail_before_sending() {
        // Nothing listens on this port; a missing key must short-circuit first.
        let api = GeminiApi::new("http://127.0.0.1:9", Arc::new(Session::empty()));
        let err = api.get_operation("models/veo/operations/1").await.unwrap_err();
        assert!(matches!(err, ServiceError::MissingCredential));
    }
}
