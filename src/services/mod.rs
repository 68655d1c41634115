//! Services layer for studentdesk
//!
//! Provides the hosted LLM integration used by the assistant.

pub mod llm;

pub use llm::{Content, GenerateRequest, InlineData, LlmConfig, LlmService, Part, TextGenerator};
