//! LLM service for the student assistant
//!
//! Wraps the hosted Gemini `generateContent` endpoint. Callers assemble the
//! system instruction and conversation; this module only handles the wire
//! format and error mapping.

use crate::error::{PortalError, Result};
use crate::types::ChatRole;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for LLM service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Gemini API key
    pub api_key: String,

    /// Model to use (default: gemini-2.5-flash)
    pub model: String,

    /// API base URL, without the version path
    pub base_url: String,

    /// Sampling temperature for assistant replies
    pub chat_temperature: f64,

    /// Sampling temperature for document analysis
    pub analysis_temperature: f64,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            chat_temperature: 0.3,
            analysis_temperature: 0.1,
            timeout_secs: 60,
        }
    }
}

/// One part of a content turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64-encoded file sent alongside the prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// A conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    /// Single text turn for `role`
    pub fn text(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role: Some(role.as_str().to_string()),
            parts: vec![Part::Text { text: text.into() }],
        }
    }

    /// User turn carrying an inline document followed by a text prompt
    pub fn document(mime_type: impl Into<String>, base64_data: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role: Some(ChatRole::User.as_str().to_string()),
            parts: vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.into(),
                        data: base64_data.into(),
                    },
                },
                Part::Text {
                    text: prompt.into(),
                },
            ],
        }
    }
}

/// Generation request assembled by the caller
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: f64,
}

/// Text generation seam, implemented by [`LlmService`] and by test doubles
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply; an empty string means the model produced no text
    async fn generate(&self, request: GenerateRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Hosted LLM client
pub struct LlmService {
    config: LlmConfig,
    client: reqwest::Client,
}

impl LlmService {
    /// Create a new LLM service with custom config
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(PortalError::Config(
                "LLM API key not set (llm.api_key or GEMINI_API_KEY)".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for LlmService {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        debug!(
            "Calling {} with {} content turns",
            self.config.model,
            request.contents.len()
        );

        let body = GenerateContentRequest {
            contents: &request.contents,
            system_instruction: request.system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part::Text { text }],
            }),
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PortalError::LlmApi(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortalError::LlmApi(format!("Failed to parse response: {}", e)))?;

        Ok(api_response.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_key() {
        let result = LlmService::new(LlmConfig::default());
        assert!(matches!(result, Err(PortalError::Config(_))));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let service = LlmService::new(LlmConfig {
            api_key: "test".to_string(),
            base_url: "http://localhost:9999/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            service.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_request_wire_format() {
        let contents = vec![
            Content::text(ChatRole::User, "Xin chào"),
            Content::document("application/pdf", "QUJD", "Đọc tài liệu"),
        ];
        let body = GenerateContentRequest {
            contents: &contents,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::Text {
                    text: "system".to_string(),
                }],
            }),
            generation_config: GenerationConfig { temperature: 0.3 },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "Xin chào");
        assert_eq!(
            value["contents"][1]["parts"][0]["inlineData"]["mimeType"],
            "application/pdf"
        );
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "system");
        assert!(value["systemInstruction"].get("role").is_none());
        assert_eq!(value["generationConfig"]["temperature"], 0.3);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GenerateContentResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Xin " }, { "text": "chào" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text(), "Xin chào");

        let empty: GenerateContentResponse =
            serde_json::from_value(serde_json::json!({ "promptFeedback": {} })).unwrap();
        assert_eq!(empty.text(), "");
    }

    #[tokio::test]
    #[ignore] // Requires GEMINI_API_KEY
    async fn test_generate_live() {
        let service = LlmService::new(LlmConfig {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Default::default()
        })
        .unwrap();

        let reply = service
            .generate(GenerateRequest {
                system_instruction: Some("Trả lời ngắn gọn.".to_string()),
                contents: vec![Content::text(ChatRole::User, "1 + 1 = ?")],
                temperature: 0.0,
            })
            .await
            .unwrap();
        assert!(!reply.is_empty());
    }
}
