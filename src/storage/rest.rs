//! Hosted store backend over the PostgREST interface
//!
//! Every table is reached at `<url>/rest/v1/<table>`. Filters use the
//! PostgREST operator syntax (`column=eq.value`), and write requests ask for
//! the affected rows back so that edits of missing records surface as
//! `NotFound`.

use crate::config::StoreConfig;
use crate::error::{PortalError, Result};
use crate::storage::rows::{
    self, AccountRow, AccountUpdate, ChatLogRow, NewChatLogRow, NewSystemLogRow, NotificationRow,
    ProcedureColumns, ProcedureRow, StudentColumns, StudentRow, SystemLogRow, TicketRow,
    TicketStatusUpdate,
};
use crate::storage::{ActivityEntry, PortalStore};
use crate::types::{
    Account, ChatMessage, Notification, Procedure, StudentProfile, SystemLog, Ticket,
    TicketStatus,
};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

/// Query parameters of one request
type Query = Vec<(&'static str, String)>;

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Hosted store client
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(PortalError::Config(
                "store.url and store.api_key must both be set".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.base_url, table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Map a non-success response to a store error
    async fn check(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
        Err(PortalError::store(
            body.code.unwrap_or_else(|| status.as_u16().to_string()),
            body.message.unwrap_or(text),
        ))
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, mut query: Query) -> Result<Vec<T>> {
        query.insert(0, ("select", "*".to_string()));
        debug!("GET {} {:?}", table, query);

        let response = self.request(Method::GET, table).query(&query).send().await?;
        let values = Self::check(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(rows::decode_rows(table, values))
    }

    async fn insert<T: Serialize + ?Sized>(&self, table: &str, rows: &T) -> Result<()> {
        debug!("POST {}", table);
        let response = self
            .request(Method::POST, table)
            .header("Prefer", "return=minimal")
            .json(rows)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// PATCH matching rows and return how many changed
    async fn update<T: Serialize + ?Sized>(&self, table: &str, query: Query, changes: &T) -> Result<usize> {
        debug!("PATCH {} {:?}", table, query);
        let response = self
            .request(Method::PATCH, table)
            .header("Prefer", "return=representation")
            .query(&query)
            .json(changes)
            .send()
            .await?;
        let affected = Self::check(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(affected.len())
    }

    /// DELETE matching rows and return how many went away
    async fn delete(&self, table: &str, query: Query) -> Result<usize> {
        debug!("DELETE {} {:?}", table, query);
        let response = self
            .request(Method::DELETE, table)
            .header("Prefer", "return=representation")
            .query(&query)
            .send()
            .await?;
        let affected = Self::check(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        Ok(affected.len())
    }

    /// Turn a list read failure into an empty list, as the portal screens expect
    fn tolerate<T>(table: &str, result: Result<Vec<T>>) -> Result<Vec<T>> {
        match result {
            Ok(rows) => Ok(rows),
            Err(e) => {
                error!("Error fetching {}: {}", table, e);
                Ok(Vec::new())
            }
        }
    }

    fn expect_one(table: &str, key: &str, affected: usize) -> Result<()> {
        if affected == 0 {
            return Err(PortalError::NotFound(format!("{} {}", table, key)));
        }
        Ok(())
    }
}

#[async_trait]
impl PortalStore for RestStore {
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Account>> {
        let result = self
            .select::<AccountRow>(
                rows::ACCOUNTS,
                vec![("username", eq(username)), ("password", eq(password))],
            )
            .await;

        match result {
            Ok(mut found) if found.len() == 1 => {
                let mut account = Account::from(found.remove(0));
                account.password = None;
                Ok(Some(account))
            }
            Ok(found) => {
                debug!("Authentication for {} matched {} rows", username, found.len());
                Ok(None)
            }
            Err(e) => {
                warn!("Auth error: {}", e);
                Ok(None)
            }
        }
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let result = self.select::<AccountRow>(rows::ACCOUNTS, vec![]).await;
        Ok(Self::tolerate(rows::ACCOUNTS, result)?
            .into_iter()
            .map(Account::from)
            .collect())
    }

    async fn add_account(&self, account: &Account) -> Result<()> {
        self.insert(rows::ACCOUNTS, &[AccountRow::from(account)]).await
    }

    async fn update_account(&self, account: &Account) -> Result<()> {
        let affected = self
            .update(
                rows::ACCOUNTS,
                vec![("username", eq(&account.username))],
                &AccountUpdate::from(account),
            )
            .await?;
        Self::expect_one(rows::ACCOUNTS, &account.username, affected)
    }

    async fn delete_account(&self, username: &str) -> Result<()> {
        let affected = self
            .delete(rows::ACCOUNTS, vec![("username", eq(username))])
            .await?;
        Self::expect_one(rows::ACCOUNTS, username, affected)
    }

    async fn list_students(&self) -> Result<Vec<StudentProfile>> {
        let result = self.select::<StudentRow>(rows::STUDENTS, vec![]).await;
        Ok(Self::tolerate(rows::STUDENTS, result)?
            .into_iter()
            .map(StudentProfile::from)
            .collect())
    }

    async fn get_student(&self, id: &str) -> Result<Option<StudentProfile>> {
        let mut found = self
            .select::<StudentRow>(rows::STUDENTS, vec![("id", eq(id))])
            .await?;
        Ok(found.pop().map(StudentProfile::from))
    }

    async fn add_student(&self, student: &StudentProfile) -> Result<()> {
        self.insert(rows::STUDENTS, &[StudentRow::from(student)])
            .await
            .inspect_err(|e| warn!("Add student error: {}", e))
    }

    async fn update_student(&self, student: &StudentProfile) -> Result<()> {
        let affected = self
            .update(
                rows::STUDENTS,
                vec![("id", eq(&student.id))],
                &StudentColumns::from(student),
            )
            .await
            .inspect_err(|e| warn!("Update student error: {}", e))?;
        Self::expect_one(rows::STUDENTS, &student.id, affected)
    }

    async fn delete_student(&self, id: &str) -> Result<()> {
        let affected = self
            .delete(rows::STUDENTS, vec![("id", eq(id))])
            .await
            .inspect_err(|e| warn!("Delete student error: {}", e))?;
        Self::expect_one(rows::STUDENTS, id, affected)
    }

    async fn list_procedures(&self) -> Result<Vec<Procedure>> {
        let result = self.select::<ProcedureRow>(rows::PROCEDURES, vec![]).await;
        Ok(Self::tolerate(rows::PROCEDURES, result)?
            .into_iter()
            .map(Procedure::from)
            .collect())
    }

    async fn add_procedure(&self, procedure: &Procedure) -> Result<()> {
        self.insert(rows::PROCEDURES, &[ProcedureRow::from(procedure)])
            .await
            .inspect_err(|e| warn!("Add procedure error: {}", e))
    }

    async fn update_procedure(&self, procedure: &Procedure) -> Result<()> {
        let affected = self
            .update(
                rows::PROCEDURES,
                vec![("id", eq(&procedure.id))],
                &ProcedureColumns::from(procedure),
            )
            .await
            .inspect_err(|e| warn!("Update procedure error: {}", e))?;
        Self::expect_one(rows::PROCEDURES, &procedure.id, affected)
    }

    async fn delete_procedure(&self, id: &str) -> Result<()> {
        let affected = self
            .delete(rows::PROCEDURES, vec![("id", eq(id))])
            .await
            .inspect_err(|e| warn!("Delete procedure error: {}", e))?;
        Self::expect_one(rows::PROCEDURES, id, affected)
    }

    async fn list_tickets(&self) -> Result<Vec<Ticket>> {
        let result = self
            .select::<TicketRow>(rows::TICKETS, vec![("order", "date_created.desc".to_string())])
            .await;
        Ok(Self::tolerate(rows::TICKETS, result)?
            .into_iter()
            .map(Ticket::from)
            .collect())
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        let mut found = self
            .select::<TicketRow>(rows::TICKETS, vec![("id", eq(id))])
            .await?;
        Ok(found.pop().map(Ticket::from))
    }

    async fn add_ticket(&self, ticket: &Ticket) -> Result<()> {
        self.insert(rows::TICKETS, &[TicketRow::from(ticket)]).await
    }

    async fn update_ticket_status(
        &self,
        id: &str,
        status: TicketStatus,
        reason: Option<&str>,
    ) -> Result<()> {
        let changes = TicketStatusUpdate {
            status,
            rejection_reason: reason.filter(|r| !r.is_empty()).map(str::to_string),
        };
        let affected = self
            .update(rows::TICKETS, vec![("id", eq(id))], &changes)
            .await?;
        Self::expect_one(rows::TICKETS, id, affected)
    }

    async fn list_notifications(&self) -> Result<Vec<Notification>> {
        // Notifications are best effort: failures read as "nothing new"
        let found = self
            .select::<NotificationRow>(
                rows::NOTIFICATIONS,
                vec![("order", "timestamp.desc".to_string())],
            )
            .await
            .unwrap_or_default();
        Ok(found.into_iter().map(Notification::from).collect())
    }

    async fn add_notification(&self, notification: &Notification) -> Result<()> {
        if let Err(e) = self
            .insert(rows::NOTIFICATIONS, &[NotificationRow::from(notification)])
            .await
        {
            error!("Error adding notification: {}", e);
        }
        Ok(())
    }

    async fn mark_notification_read(&self, id: &str) -> Result<()> {
        self.update(
            rows::NOTIFICATIONS,
            vec![("id", eq(id))],
            &serde_json::json!({ "is_read": true }),
        )
        .await?;
        Ok(())
    }

    async fn clear_notifications(&self) -> Result<()> {
        self.update(
            rows::NOTIFICATIONS,
            vec![("is_read", "neq.true".to_string())],
            &serde_json::json!({ "is_read": true }),
        )
        .await?;
        Ok(())
    }

    async fn chat_history(&self, user_id: &str) -> Result<Vec<ChatMessage>> {
        let result = self
            .select::<ChatLogRow>(
                rows::CHAT_LOGS,
                vec![
                    ("user_id", eq(user_id)),
                    ("order", "timestamp.asc".to_string()),
                ],
            )
            .await;
        Ok(Self::tolerate(rows::CHAT_LOGS, result)?
            .into_iter()
            .map(ChatMessage::from)
            .collect())
    }

    async fn save_chat_message(&self, user_id: &str, message: &ChatMessage) -> Result<()> {
        if let Err(e) = self
            .insert(rows::CHAT_LOGS, &[NewChatLogRow::new(user_id, message)])
            .await
        {
            error!("Error saving chat message: {}", e);
        }
        Ok(())
    }

    async fn clear_chat_history(&self, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Ok(());
        }
        self.delete(rows::CHAT_LOGS, vec![("user_id", eq(user_id))])
            .await
            .inspect_err(|e| error!("Error clearing chat history: {}", e))?;
        Ok(())
    }

    async fn list_system_logs(&self, limit: usize) -> Result<Vec<SystemLog>> {
        let result = self
            .select::<SystemLogRow>(
                rows::SYSTEM_LOGS,
                vec![
                    ("order", "timestamp.desc".to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await;

        match result {
            Ok(found) => Ok(found.into_iter().map(SystemLog::from).collect()),
            Err(e) if e.is_missing_relation() => {
                warn!("System logs table missing or schema cache not refreshed. Run the migration script.");
                Ok(Vec::new())
            }
            Err(e) => {
                error!("Error fetching system logs: {}", e);
                Ok(Vec::new())
            }
        }
    }

    async fn log_activity(&self, entry: &ActivityEntry) -> Result<()> {
        match self
            .insert(rows::SYSTEM_LOGS, &[NewSystemLogRow::from(entry)])
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_missing_relation() => {}
            Err(e) => error!("Error logging system activity: {}", e),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> StoreConfig {
        StoreConfig {
            url: "https://example.supabase.co/".to_string(),
            api_key: "anon".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_new_requires_configuration() {
        let result = RestStore::new(&StoreConfig::default());
        assert!(matches!(result, Err(PortalError::Config(_))));
    }

    #[test]
    fn test_base_url_normalized() {
        let store = RestStore::new(&configured()).unwrap();
        assert_eq!(store.base_url, "https://example.supabase.co/rest/v1");
    }

    #[test]
    fn test_eq_filter() {
        assert_eq!(eq("22004001"), "eq.22004001");
    }

    #[test]
    fn test_expect_one() {
        assert!(RestStore::expect_one("tickets", "1", 1).is_ok());
        assert!(matches!(
            RestStore::expect_one("tickets", "1", 0),
            Err(PortalError::NotFound(_))
        ));
    }

    #[test]
    fn test_tolerate_swallows_errors() {
        let failed: Result<Vec<u8>> = Err(PortalError::store("500", "boom"));
        assert!(RestStore::tolerate("students", failed).unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires STUDENTDESK__STORE__URL and STUDENTDESK__STORE__API_KEY
    async fn test_list_procedures_live() {
        let config = crate::config::PortalConfig::load(None).unwrap();
        let store = RestStore::new(&config.store).unwrap();
        let procedures = store.list_procedures().await.unwrap();
        for procedure in procedures {
            assert!(!procedure.id.is_empty());
        }
    }
}
