//! Student assistant
//!
//! Builds the LLM context for each chat turn: keyword retrieval over the
//! procedure knowledge base, the signed-in student's profile and the
//! conversation so far. The raw reply is handed back to the caller, which can
//! classify it with [`parse_reply`].

pub mod analyzer;
pub mod chat;
pub mod intent;
pub mod prompt;
pub mod reply;
pub mod retrieval;
pub mod suggestions;

pub use analyzer::{DocumentAnalyzer, DocumentUpload, ProcedureDraft};
pub use chat::{ChatOutcome, ChatSession};
pub use intent::detect_ticket_intent;
pub use prompt::{build_system_instruction, PromptContext};
pub use reply::{parse_reply, AssistantReply};
pub use retrieval::retrieve_context;
pub use suggestions::{suggestions, DEFAULT_SUGGESTION_COUNT};

use crate::services::{Content, GenerateRequest, TextGenerator};
use crate::types::{ChatMessage, Procedure, StudentProfile, User};
use chrono::Local;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Reply used when the model returns no text
pub const EMPTY_REPLY_FALLBACK: &str =
    "Xin lỗi, hiện tại tôi không thể phản hồi. Vui lòng thử lại sau.";

/// Reply used when the model cannot be reached
pub const CONNECTION_FALLBACK: &str =
    "Hệ thống đang gặp sự cố kết nối AI. Vui lòng kiểm tra lại cấu hình API Key hoặc thử lại sau.";

/// Chat assistant over a text generator
pub struct Assistant {
    llm: Option<Arc<dyn TextGenerator>>,
    organization: String,
    temperature: f64,
}

impl Assistant {
    /// `llm` is `None` when no API key is configured; every turn then gets
    /// the connection fallback.
    pub fn new(
        llm: Option<Arc<dyn TextGenerator>>,
        organization: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self {
            llm,
            organization: organization.into(),
            temperature,
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_some()
    }

    /// Answer `message` given the prior conversation.
    ///
    /// Never fails: transport and API errors turn into a fallback reply.
    pub async fn send_message(
        &self,
        message: &str,
        history: &[ChatMessage],
        knowledge_base: &[Procedure],
        user: &User,
        profile: Option<&StudentProfile>,
    ) -> String {
        let Some(llm) = &self.llm else {
            warn!("Assistant called without an LLM API key");
            return CONNECTION_FALLBACK.to_string();
        };

        let context = retrieve_context(message, knowledge_base);
        debug!(
            "Retrieved {} bytes of procedure context for {}",
            context.len(),
            user.id
        );

        let system_instruction = build_system_instruction(&PromptContext {
            organization: &self.organization,
            today: Local::now().date_naive(),
            user,
            profile,
            context: &context,
        });

        let mut contents: Vec<Content> = history
            .iter()
            .filter(|m| !m.is_welcome())
            .map(|m| Content::text(m.role, m.text.clone()))
            .collect();
        contents.push(Content::text(crate::types::ChatRole::User, message));

        let request = GenerateRequest {
            system_instruction: Some(system_instruction),
            contents,
            temperature: self.temperature,
        };

        match llm.generate(request).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => EMPTY_REPLY_FALLBACK.to_string(),
            Err(e) => {
                error!("Gemini API error: {}", e);
                CONNECTION_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::Result;
    use crate::services::{GenerateRequest, TextGenerator};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Generator returning queued replies and recording every request
    #[derive(Default)]
    pub struct ScriptedGenerator {
        pub replies: Mutex<Vec<Result<String>>>,
        pub requests: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedGenerator {
        pub fn replying(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, request: GenerateRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(String::new())
            } else {
                replies.remove(0)
            }
        }
    }
}
