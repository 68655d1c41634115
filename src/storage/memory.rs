//! In-process store used when no hosted store is configured, and by tests

use crate::error::{PortalError, Result};
use crate::storage::{ActivityEntry, PortalStore, SYSTEM_LOG_LIMIT};
use crate::types::{
    Account, ChatMessage, Notification, Procedure, StudentProfile, SystemLog, Ticket,
    TicketStatus,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    accounts: Vec<Account>,
    students: Vec<StudentProfile>,
    procedures: Vec<Procedure>,
    tickets: Vec<Ticket>,
    notifications: Vec<Notification>,
    chat_logs: HashMap<String, Vec<ChatMessage>>,
    system_logs: Vec<SystemLog>,
}

/// Store keeping every table in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    next_log_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with procedures, handy for offline runs
    pub fn with_procedures(procedures: Vec<Procedure>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                procedures,
                ..Tables::default()
            }),
            next_log_id: AtomicU64::new(0),
        }
    }
}

fn missing(table: &str, key: &str) -> PortalError {
    PortalError::NotFound(format!("{} {}", table, key))
}

fn duplicate(table: &str, key: &str) -> PortalError {
    PortalError::AlreadyExists(format!("{} {}", table, key))
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>> {
        let tables = self.tables.read().await;
        let mut matches = tables
            .accounts
            .iter()
            .filter(|a| a.username == username && a.password.as_deref() == Some(password));

        match (matches.next(), matches.next()) {
            (Some(account), None) => Ok(Some(Account {
                password: None,
                ..account.clone()
            })),
            _ => Ok(None),
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.tables.read().await.accounts.clone())
    }

    async fn add_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.accounts.iter().any(|a| a.username == account.username) {
            return Err(duplicate("accounts", &account.username));
        }
        tables.accounts.push(account.clone());
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .accounts
            .iter_mut()
            .find(|a| a.username == account.username)
            .ok_or_else(|| missing("accounts", &account.username))?;

        existing.role = account.role;
        existing.full_name = account.full_name.clone();
        existing.student_id = account.student_id.clone();
        if let Some(password) = account.password.as_deref().filter(|p| !p.is_empty()) {
            existing.password = Some(password.to_string());
        }
        Ok(())
    }

    async fn delete_account(&self, username: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.accounts.len();
        tables.accounts.retain(|a| a.username != username);
        if tables.accounts.len() == before {
            return Err(missing("accounts", username));
        }
        Ok(())
    }

    async fn list_students(&self) -> Result<Vec<StudentProfile>> {
        Ok(self.tables.read().await.students.clone())
    }

    async fn get_student(&self, id: &str) -> Result<Option<StudentProfile>> {
        let tables = self.tables.read().await;
        Ok(tables.students.iter().find(|s| s.id == id).cloned())
    }

    async fn add_student(&self, student: &StudentProfile) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.students.iter().any(|s| s.id == student.id) {
            return Err(duplicate("students", &student.id));
        }
        tables.students.push(student.clone());
        Ok(())
    }

    async fn update_student(&self, student: &StudentProfile) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .students
            .iter_mut()
            .find(|s| s.id == student.id)
            .ok_or_else(|| missing("students", &student.id))?;
        *existing = student.clone();
        Ok(())
    }

    async fn delete_student(&self, id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.students.len();
        tables.students.retain(|s| s.id != id);
        if tables.students.len() == before {
            return Err(missing("students", id));
        }
        Ok(())
    }

    async fn list_procedures(&self) -> Result<Vec<Procedure>> {
        let tables = self.tables.read().await;
        Ok(tables
            .procedures
            .iter()
            .map(|p| Procedure {
                export_template: p.template().map(str::to_string),
                ..p.clone()
            })
            .collect())
    }

    async fn add_procedure(&self, procedure: &Procedure) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.procedures.iter().any(|p| p.id == procedure.id) {
            return Err(duplicate("procedures", &procedure.id));
        }
        tables.procedures.push(procedure.clone());
        Ok(())
    }

    async fn update_procedure(&self, procedure: &Procedure) -> Result<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .procedures
            .iter_mut()
            .find(|p| p.id == procedure.id)
            .ok_or_else(|| missing("procedures", &procedure.id))?;
        *existing = procedure.clone();
        Ok(())
    }

    async fn delete_procedure(&self, id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let before = tables.procedures.len();
        tables.procedures.retain(|p| p.id != id);
        if tables.procedures.len() == before {
            return Err(missing("procedures", id));
        }
        Ok(())
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let mut tickets = self.tables.read().await.tickets.clone();
        // Stable sort keeps insertion order among tickets created the same day
        tickets.sort_by(|a, b| b.date_created.cmp(&a.date_created));
        Ok(tickets)
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        let tables = self.tables.read().await;
        Ok(tables.tickets.iter().find(|t| t.id == id).cloned())
    }

    async fn add_ticket(&self, ticket: &Ticket) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.tickets.iter().any(|t| t.id == ticket.id) {
            return Err(duplicate("tickets", &ticket.id));
        }
        tables.tickets.insert(
            0,
            Ticket {
                rejection_reason: None,
                ..ticket.clone()
            },
        );
        Ok(())
    }

    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let ticket = tables
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| missing("tickets", id))?;

        ticket.status = status;
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            ticket.rejection_reason = Some(reason.to_string());
        }
        Ok(())
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications = self.tables.read().await.notifications.clone();
        notifications.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(notifications)
    }

    async fn add_notification(&self, notification: &Notification) -> Result<()> {
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        Ok(())
    }

    async fn mark_notification_read(&self, id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(n) = tables.notifications.iter_mut().find(|n| n.id == id) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn clear_notifications(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        for n in tables.notifications.iter_mut().filter(|n| !n.is_read) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn chat_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let tables = self.tables.read().await;
        let mut history = tables.chat_logs.get(user_id).cloned().unwrap_or_default();
        history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(history)
    }

    async fn save_chat_message(&self, user_id: &str, message: &ChatMessage) -> Result<()> {
        self.tables
            .write()
            .await
            .chat_logs
            .entry(user_id.to_string())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn clear_chat_history(&self, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Ok(());
        }
        self.tables.write().await.chat_logs.remove(user_id);
        Ok(())
    }

    async fn list_system_logs(&self, limit: usize) -> Result<Vec<SystemLog>> {
        let tables = self.tables.read().await;
        Ok(tables.system_logs.iter().rev().take(limit).cloned().collect())
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        let id = self.next_log_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut tables = self.tables.write().await;
        let logs = &mut tables.system_logs;
        logs.push(SystemLog {
            id: id.to_string(),
            action: entry.action.clone(),
            user_name: entry.user_name.clone(),
            details: entry.details.clone(),
            kind: entry.kind,
            timestamp: Utc::now().to_rfc3339(),
        });

        // Only the newest entries are ever listed
        if logs.len() > SYSTEM_LOG_LIMIT {
            let excess = logs.len() - SYSTEM_LOG_LIMIT;
            logs.drain(..excess);
        }
        Ok(())
    }
}
