//! REST client for a `generateContent`-style image-generation endpoint.
//!
//! Sends inline base64 images plus a text instruction and asks for image
//! output, using [`reqwest`]. One request per call; no retries here.

use async_trait::async_trait;
use backdrop_core::asset::CanonicalAsset;

use crate::error::ServiceError;
use crate::messages::{GenerationResponse, InlineData};
use crate::service::GenerationService;

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the generation API.
pub struct GenerationApi {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GenerationApi {
    /// Create a new API client.
    ///
    /// * `api_url` - Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, api_key, model)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for connection pooling).
    pub fn with_client(
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        model: String,
    ) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_url, self.model)
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ServiceError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ServiceError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerationService for GenerationApi {
    async fn generate(
        &self,
        inputs: &[CanonicalAsset],
        instructions: &str,
    ) -> Result<GenerationResponse, ServiceError> {
        let body = build_request(inputs, instructions);

        tracing::debug!(
            model = %self.model,
            input_count = inputs.len(),
            "Submitting generation request",
        );

        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.json::<GenerationResponse>().await?)
    }
}

/// Build the JSON request body: every input image as an inline part,
/// followed by the instructions as a text part.
pub fn build_request(inputs: &[CanonicalAsset], instructions: &str) -> serde_json::Value {
    let mut parts: Vec<serde_json::Value> = inputs
        .iter()
        .map(|asset| {
            serde_json::json!({
                "inlineData": InlineData::encode(asset.mime_type.clone(), &asset.data),
            })
        })
        .collect();
    parts.push(serde_json::json!({ "text": instructions }));

    serde_json::json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": { "responseModalities": ["TEXT", "IMAGE"] },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_puts_images_before_instructions() {
        let inputs = vec![
            CanonicalAsset::new("image/png", b"subject".to_vec()),
            CanonicalAsset::new("image/jpeg", b"backdrop".to_vec()),
        ];
        let body = build_request(&inputs, "place the subject on the backdrop");

        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[0]["inlineData"]["data"], "c3ViamVjdA==");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[2]["text"], "place the subject on the backdrop");
    }

    #[test]
    fn request_without_inputs_is_text_only() {
        let body = build_request(&[], "a plain grey studio backdrop");
        let parts = body["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        assert!(body["generationConfig"]["responseModalities"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("IMAGE")));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let api = GenerationApi::new(
            "http://localhost:8080/v1beta/".into(),
            "key".into(),
            "image-model".into(),
        );
        assert_eq!(
            api.endpoint(),
            "http://localhost:8080/v1beta/models/image-model:generateContent"
        );
    }
}
