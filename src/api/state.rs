//! Shared server state and the signed-in session registry

use super::events::EventBroadcaster;
use crate::assistant::{Assistant, ChatSession, DocumentAnalyzer};
use crate::config::{PortalConfig, PortalSettings};
use crate::export::DocumentStyle;
use crate::services::TextGenerator;
use crate::storage::{ActivityEntry, PortalStore};
use crate::types::User;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// A signed-in user
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user: User,
    pub created_at: DateTime<Utc>,
}

/// Bearer token to session map
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session for `user` and return its token
    pub async fn open(&self, user: User) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let session = Session {
            user,
            created_at: Utc::now(),
        };
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Close a session, returning it if it existed
    pub async fn close(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// State handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PortalStore>,
    pub sessions: Arc<SessionRegistry>,
    pub events: EventBroadcaster,
    pub assistant: Arc<Assistant>,
    pub chat: Arc<ChatSession>,
    /// `None` without an LLM API key
    pub analyzer: Option<Arc<DocumentAnalyzer>>,
    pub settings: Arc<PortalSettings>,
    pub style: Arc<DocumentStyle>,
    pub instance_id: String,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PortalStore>,
        llm: Option<Arc<dyn TextGenerator>>,
        config: &PortalConfig,
    ) -> Self {
        let settings = config.portal.clone();
        let assistant = Arc::new(Assistant::new(
            llm.clone(),
            settings.organization.clone(),
            config.llm.chat_temperature,
        ));
        let chat = Arc::new(ChatSession::new(store.clone(), assistant.clone()));
        let analyzer = llm.map(|llm| {
            Arc::new(DocumentAnalyzer::new(llm, config.llm.analysis_temperature))
        });
        let style = DocumentStyle::new(settings.city.clone(), &settings.organization);

        Self {
            store,
            sessions: Arc::new(SessionRegistry::new()),
            events: EventBroadcaster::new(config.server.event_capacity),
            assistant,
            chat,
            analyzer,
            settings: Arc::new(settings),
            style: Arc::new(style),
            instance_id: uuid::Uuid::new_v4().to_string()[..8].to_string(),
        }
    }

    /// Write an activity log entry; failures are only logged
    pub async fn log_activity(&self, entry: ActivityEntry) {
        if let Err(e) = self.store.log_activity(&entry).await {
            warn!("Failed to record activity {}: {}", entry.action, e);
        }
    }
}
