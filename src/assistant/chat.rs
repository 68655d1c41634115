//! Persistent chat conversations
//!
//! A [`ChatSession`] ties the assistant to the store: history is loaded per
//! user, each turn is saved, and ticket requests are intercepted before the
//! message reaches the LLM.

use super::{detect_ticket_intent, parse_reply, Assistant, AssistantReply};
use crate::error::{PortalError, Result};
use crate::storage::PortalStore;
use crate::types::{ChatMessage, ChatRole, Role, TicketDraft, User, WELCOME_MESSAGE_ID};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Greeting text for the assistant of `organization`
pub fn welcome_text(organization: &str) -> String {
    format!(
        "Xin chào! Tôi là trợ lý ảo AI của {}. Tôi có thể giúp gì cho bạn hôm nay?\n\n*Ví dụ: \"Làm sao để xin giấy xác nhận sinh viên?\", \"Thủ tục phúc khảo điểm thi\"*",
        organization
    )
}

/// Result of sending one chat message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatOutcome {
    /// The message asks for a ticket; nothing was sent or stored.
    /// Resend with intent detection disabled to ask the assistant instead.
    TicketIntent { draft: TicketDraft },
    /// The assistant answered
    #[serde(rename_all = "camelCase")]
    Reply {
        user_message: ChatMessage,
        reply: ChatMessage,
        /// Ticket proposal found in the reply, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        ticket_draft: Option<TicketDraft>,
    },
}

/// The greeting shown when a user has no history; never stored
pub fn welcome_message(organization: &str) -> ChatMessage {
    ChatMessage {
        id: WELCOME_MESSAGE_ID.to_string(),
        ..ChatMessage::new(ChatRole::Model, welcome_text(organization))
    }
}

/// Confirmation appended after a ticket is filed from the chat
pub fn ticket_created_text(title: &str, kind: &str) -> String {
    format!(
        "✅ **Đã tạo hồ sơ thành công!**\n\nTiêu đề: {}\nLoại: {}\n\nBạn có thể theo dõi trạng thái tại mục \"Hồ sơ của tôi\".",
        title, kind
    )
}

pub struct ChatSession {
    store: Arc<dyn PortalStore>,
    assistant: Arc<Assistant>,
}

impl ChatSession {
    pub fn new(store: Arc<dyn PortalStore>, assistant: Arc<Assistant>) -> Self {
        Self { store, assistant }
    }

    /// Stored conversation, or the welcome message when there is none
    pub async fn history(&self, user: &User) -> Result<Vec<ChatMessage>> {
        let history = self.store.chat_history(&user.id).await?;
        if history.is_empty() {
            return Ok(vec![welcome_message(self.assistant.organization())]);
        }
        Ok(history)
    }

    /// Send `text` for `user`.
    ///
    /// With `detect_intent` set, a recognised ticket request short-circuits
    /// into [`ChatOutcome::TicketIntent`].
    pub async fn send(&self, user: &User, text: &str, detect_intent: bool) -> Result<ChatOutcome> {
        if text.trim().is_empty() {
            return Err(PortalError::InvalidOperation(
                "message must not be empty".to_string(),
            ));
        }

        if detect_intent {
            if let Some(draft) = detect_ticket_intent(text) {
                debug!("Ticket intent detected for {}: {:?}", user.id, draft.title);
                return Ok(ChatOutcome::TicketIntent { draft });
            }
        }

        let history = self.store.chat_history(&user.id).await?;
        let user_message = ChatMessage::new(ChatRole::User, text);
        self.store.save_chat_message(&user.id, &user_message).await?;

        let knowledge_base = self.store.list_procedures().await?;
        let profile = match user.role {
            Role::Student => self.store.get_student(&user.id).await.unwrap_or_else(|e| {
                warn!("Could not load profile for {}: {}", user.id, e);
                None
            }),
            Role::Admin => None,
        };

        let text = self
            .assistant
            .send_message(text, &history, &knowledge_base, user, profile.as_ref())
            .await;

        let reply = ChatMessage::new(ChatRole::Model, text);
        self.store.save_chat_message(&user.id, &reply).await?;

        let ticket_draft = match parse_reply(&reply.text) {
            AssistantReply::TicketRequest { ticket_data, .. } => Some(ticket_data),
            AssistantReply::Text { .. } => None,
        };

        Ok(ChatOutcome::Reply {
            user_message,
            reply,
            ticket_draft,
        })
    }

    /// Delete the user's history and return the fresh welcome message
    pub async fn clear(&self, user: &User) -> Result<ChatMessage> {
        self.store.clear_chat_history(&user.id).await?;
        Ok(welcome_message(self.assistant.organization()))
    }

    /// Record the confirmation for a ticket filed from the chat
    pub async fn confirm_ticket(&self, user: &User, title: &str, kind: &str) -> Result<ChatMessage> {
        let message = ChatMessage::new(ChatRole::Model, ticket_created_text(title, kind));
        self.store.save_chat_message(&user.id, &message).await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::testing::ScriptedGenerator;
    use crate::storage::MemoryStore;

    fn student() -> User {
        User {
            id: "22004001".to_string(),
            name: "Nguyễn Văn A".to_string(),
            role: Role::Student,
            email: String::new(),
        }
    }

    fn session(replies: Vec<Result<String>>) -> (ChatSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedGenerator::replying(replies));
        let assistant = Arc::new(Assistant::new(Some(llm), "Khoa CNTT", 0.3));
        (ChatSession::new(store.clone(), assistant), store)
    }

    #[tokio::test]
    async fn test_empty_history_is_welcome() {
        let (chat, _) = session(vec![]);
        let history = chat.history(&student()).await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_welcome());
        assert_eq!(history[0].text, welcome_text("Khoa CNTT"));
    }

    #[tokio::test]
    async fn test_welcome_names_the_organization() {
        let assistant = Arc::new(Assistant::new(None, "Khoa Điện", 0.3));
        let chat = ChatSession::new(Arc::new(MemoryStore::new()), assistant);

        let welcome = chat.clear(&student()).await.unwrap();
        assert!(welcome.text.contains("trợ lý ảo AI của Khoa Điện."));
        assert!(!welcome.text.contains("CNTT"));
    }

    #[tokio::test]
    async fn test_intent_short_circuits() {
        let (chat, store) = session(vec![]);
        let outcome = chat
            .send(&student(), "Em muốn làm đơn bảo lưu", true)
            .await
            .unwrap();

        match outcome {
            ChatOutcome::TicketIntent { draft } => {
                assert_eq!(draft.title, "Xin bảo lưu kết quả");
            }
            other => panic!("expected intent, got {:?}", other),
        }
        assert!(store.chat_history("22004001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_persists_both_turns() {
        let (chat, store) = session(vec![Ok("Bạn cần nộp Mẫu 01.".to_string())]);
        let outcome = chat
            .send(&student(), "Em muốn làm đơn bảo lưu", false)
            .await
            .unwrap();

        match outcome {
            ChatOutcome::Reply {
                reply,
                ticket_draft,
                ..
            } => {
                assert_eq!(reply.text, "Bạn cần nộp Mẫu 01.");
                assert!(ticket_draft.is_none());
            }
            other => panic!("expected reply, got {:?}", other),
        }

        let stored = store.chat_history("22004001").await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, ChatRole::User);
        assert_eq!(stored[1].role, ChatRole::Model);
    }

    #[tokio::test]
    async fn test_reply_with_ticket_proposal() {
        let reply = "```json\n{\"isTicketRequest\": true, \"ticketData\": {\"title\": \"Xin bảng điểm\", \"type\": \"Đào tạo\", \"description\": \"HK1\"}, \"responseMessage\": \"OK\"}\n```";
        let (chat, _) = session(vec![Ok(reply.to_string())]);

        let outcome = chat.send(&student(), "bảng điểm HK1", true).await.unwrap();
        match outcome {
            ChatOutcome::Reply { ticket_draft, .. } => {
                assert_eq!(ticket_draft.unwrap().title, "Xin bảng điểm");
            }
            other => panic!("expected reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let (chat, _) = session(vec![]);
        assert!(matches!(
            chat.send(&student(), "   ", true).await,
            Err(PortalError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn test_clear_and_confirm() {
        let (chat, store) = session(vec![]);
        let user = student();

        let confirmation = chat
            .confirm_ticket(&user, "Xin bảng điểm", "Đào tạo")
            .await
            .unwrap();
        assert!(confirmation.text.contains("Tiêu đề: Xin bảng điểm\nLoại: Đào tạo"));
        assert_eq!(store.chat_history(&user.id).await.unwrap().len(), 1);

        let welcome = chat.clear(&user).await.unwrap();
        assert!(welcome.is_welcome());
        assert!(store.chat_history(&user.id).await.unwrap().is_empty());
    }
}
