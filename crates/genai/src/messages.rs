//! Typed response model for `generateContent` calls.
//!
//! The service answers with a list of candidates, each holding content
//! parts that are either text or inline base64 data. A call is only
//! useful if some part carries an image; [`GenerationResponse::into_asset`]
//! enforces that and classifies every other shape as an [`AttemptError`].

use backdrop_core::asset::GeneratedAsset;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::AttemptError;

/// Finish reasons the service uses when it refuses to produce output.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "IMAGE_SAFETY",
    "PROHIBITED_CONTENT",
    "IMAGE_PROHIBITED_CONTENT",
    "BLOCKLIST",
    "SPII",
    "RECITATION",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
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

/// Base64-encoded binary payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl InlineData {
    pub fn encode(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

impl GenerationResponse {
    /// A response carrying a single inline image.
    pub fn image(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::from_parts(vec![Part {
            text: None,
            inline_data: Some(InlineData::encode(mime_type, bytes)),
        }])
    }

    /// A response carrying only text.
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_parts(vec![Part {
            text: Some(text.into()),
            inline_data: None,
        }])
    }

    /// A response refused at the prompt level.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            candidates: Vec::new(),
            prompt_feedback: Some(PromptFeedback {
                block_reason: Some(reason.into()),
            }),
        }
    }

    fn from_parts(parts: Vec<Part>) -> Self {
        Self {
            candidates: vec![Candidate {
                content: Some(Content { parts }),
                finish_reason: Some("STOP".into()),
            }],
            prompt_feedback: None,
        }
    }

    /// Extract the first generated image.
    pub fn into_asset(self) -> Result<GeneratedAsset, AttemptError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(AttemptError::PolicyBlocked(reason));
        }
        if self.candidates.is_empty() {
            return Err(AttemptError::EmptyResponse);
        }

        let mut saw_parts = false;
        let mut blocked = None;

        for candidate in self.candidates {
            if let Some(reason) = candidate
                .finish_reason
                .filter(|r| BLOCKED_FINISH_REASONS.contains(&r.as_str()))
            {
                if blocked.is_none() {
                    blocked = Some(reason);
                }
            }
            let Some(content) = candidate.content else {
                continue;
            };
            saw_parts |= !content.parts.is_empty();

            for part in content.parts {
                if let Some(inline) = part.inline_data {
                    let data = STANDARD
                        .decode(inline.data.as_bytes())
                        .map_err(|e| AttemptError::InvalidPayload(e.to_string()))?;
                    if data.is_empty() {
                        return Err(AttemptError::InvalidPayload("empty image data".into()));
                    }
                    return Ok(GeneratedAsset::new(inline.mime_type, data));
                }
                if let Some(text) = part.text {
                    tracing::debug!(text = %text, "Skipping text part in generation response");
                }
            }
        }

        match blocked {
            Some(reason) => Err(AttemptError::PolicyBlocked(reason)),
            None if !saw_parts => Err(AttemptError::EmptyResponse),
            None => Err(AttemptError::NoAsset),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
