//! Storage layer for the studentdesk portal
//!
//! The portal's records live in a hosted relational store reached over its
//! REST interface ([`rest::RestStore`]). [`memory::MemoryStore`] implements the
//! same trait in-process for offline runs and tests.

pub mod memory;
pub mod rest;
pub mod rows;

use crate::error::Result;
use crate::types::{
    Account, ChatMessage, Notification, Procedure, Severity, StudentProfile, SystemLog, Ticket,
    TicketStatus, User,
};
use async_trait::async_trait;

pub use memory::MemoryStore;
pub use rest::RestStore;

/// Name recorded for activity without a signed-in user
pub const SYSTEM_USER_NAME: &str = "Hệ thống";

/// Number of activity log entries returned to the dashboard
pub const SYSTEM_LOG_LIMIT: usize = 50;

/// Storage backend trait defining all portal operations
#[async_trait]
pub trait PortalStore: Send + Sync {
    // === Accounts ===

    /// Look up the account matching both credentials; any failure is `None`
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>>;

    async fn list_accounts(&self) -> Result<Vec<Account>>;

    async fn add_account(&self, account: &Account) -> Result<()>;

    /// Update role, name and student id; the password only when non-empty
    async fn update_account(&self, account: &Account) -> Result<()>;

    async fn delete_account(&self, username: &str) -> Result<()>;

    // === Students ===

    async fn list_students(&self) -> Result<Vec<StudentProfile>>;

    async fn get_student(&self, id: &str) -> Result<Option<StudentProfile>>;

    async fn add_student(&self, student: &StudentProfile) -> Result<()>;

    /// Update every column except the student id
    async fn update_student(&self, student: &StudentProfile) -> Result<()>;

    async fn delete_student(&self, id: &str) -> Result<()>;

    // === Procedures ===

    async fn list_procedures(&self) -> Result<Vec<Procedure>>;

    async fn add_procedure(&self, procedure: &Procedure) -> Result<()>;

    async fn update_procedure(&self, procedure: &Procedure) -> Result<()>;

    async fn delete_procedure(&self, id: &str) -> Result<()>;

    // === Tickets ===

    /// All tickets, newest `date_created` first
    async fn list_tickets(&self) -> Result<Vec<Ticket>>;

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>>;

    async fn add_ticket(&self, ticket: &Ticket) -> Result<()>;

    /// Set the status; the rejection reason is only written when given
    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
        reason: Option<&str>,
    ) -> Result<()>;

    // === Notifications ===

    /// Newest first
    async fn list_notifications(&self) -> Result<Vec<Notification>>;

    async fn add_notification(&self, notification: &Notification) -> Result<()>;

    async fn mark_notification_read(&self, id: &str) -> Result<()>;

    /// Mark every unread notification as read
    async fn clear_notifications(&self) -> Result<()>;

    // === Chat history ===

    /// Oldest first
    async fn chat_history(&self, user_id: &str) -> Result<Vec<ChatMessage>>;

    async fn save_chat_message(&self, user_id: &str, message: &ChatMessage) -> Result<()>;

    async fn clear_chat_history(&self, user_id: &str) -> Result<()>;

    // === Activity log ===

    /// Latest `limit` entries, newest first
    async fn list_system_logs(&self, limit: usize) -> Result<Vec<SystemLog>>;

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()>;
}

/// Activity log entry to be written
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub action: String,
    pub details: String,
    pub user_id: Option<String>,
    pub user_name: String,
    pub kind: Severity,
}

impl ActivityEntry {
    pub fn new(action: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            details: details.into(),
            user_id: None,
            user_name: SYSTEM_USER_NAME.to_string(),
            kind: Severity::Info,
        }
    }

    /// Attribute the entry to `user`
    pub fn by(mut self, user: &User) -> Self {
        self.user_id = Some(user.id.clone());
        self.user_name = user.name.clone();
        self
    }

    pub fn with_kind(mut self, kind: Severity) -> Self {
        self.kind = kind;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_activity_entry_defaults_to_system_user() {
        let entry = ActivityEntry::new("ĐĂNG NHẬP", "details");
        assert_eq!(entry.user_name, SYSTEM_USER_NAME);
        assert_eq!(entry.user_id, None);
        assert_eq!(entry.kind, Severity::Info);
    }

    #[test]
    fn test_activity_entry_attribution() {
        let user = User {
            id: "admin".to_string(),
            name: "Quản trị viên".to_string(),
            role: Role::Admin,
            email: String::new(),
        };
        let entry = ActivityEntry::new("XÓA SINH VIÊN", "x")
            .by(&user)
            .with_kind(Severity::Warning);
        assert_eq!(entry.user_id.as_deref(), Some("admin"));
        assert_eq!(entry.user_name, "Quản trị viên");
        assert_eq!(entry.kind, Severity::Warning);
    }
}
