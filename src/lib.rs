//! Studentdesk - student-services portal backend
//!
//! Serves a faculty office and its students:
//! - A procedure assistant grounded in the office's own knowledge base
//! - Ticket filing, review and status notifications
//! - Printable A4 exports filled from procedure templates
//! - Student records, login accounts and an activity log
//!
//! # Architecture
//!
//! - **Types**: Core records (Ticket, Procedure, StudentProfile, ...)
//! - **Storage**: Hosted REST store, with an in-memory backend for offline runs
//! - **Services**: Hosted LLM client
//! - **Assistant**: Retrieval, prompt assembly and reply parsing
//! - **Export**: `{{var}}` template filling and the built-in layout
//! - **API**: HTTP endpoints, sessions and live events
//!
//! # Example
//!
//! ```ignore
//! use studentdesk_core::{api::{ApiServer, ApiServerConfig, AppState}, MemoryStore, PortalConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PortalConfig::load(None)?;
//!     let state = AppState::new(Arc::new(MemoryStore::new()), None, &config);
//!     ApiServer::new(ApiServerConfig::default(), state).serve().await
//! }
//! ```

pub mod api;
pub mod assistant;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod services;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use assistant::{Assistant, ChatSession, DocumentAnalyzer};
pub use config::PortalConfig;
pub use error::{PortalError, Result};
pub use services::{LlmConfig, LlmService, TextGenerator};
pub use storage::{MemoryStore, PortalStore, RestStore};
pub use types::{
    ChatMessage, Procedure, Role, StudentProfile, Ticket, TicketDraft, TicketStatus, User,
};
