//! Core data types for the studentdesk portal
//!
//! These are the application-level records shared by the API, the assistant
//! and the export engine. They serialize with the camelCase field names the
//! portal clients use; the snake_case column mapping for the hosted store
//! lives in [`crate::storage::rows`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier of the UI-only greeting message, never sent to the LLM or stored
pub const WELCOME_MESSAGE_ID: &str = "welcome";

/// Portal role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Student using the assistant and filing tickets
    Student,
    /// Faculty office staff
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }

    /// Parse the stored role column, tolerating case differences
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Some(Role::Student),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Username, which doubles as the student id for students
    pub id: String,
    pub name: String,
    pub role: Role,
    pub email: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Login account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub username: String,
    /// Only present when creating or changing the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: Role,
    pub full_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "Nam")]
    Male,
    #[serde(rename = "Nữ")]
    Female,
    #[serde(rename = "Khác")]
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Nam",
            Gender::Female => "Nữ",
            Gender::Other => "Khác",
        }
    }
}

/// Enrollment status of a student
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[serde(rename = "Đang học")]
    Studying,
    #[serde(rename = "Bảo lưu")]
    Deferred,
    #[serde(rename = "Tốt nghiệp")]
    Graduated,
    #[serde(rename = "Thôi học")]
    Withdrawn,
}

impl StudentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudentStatus::Studying => "Đang học",
            StudentStatus::Deferred => "Bảo lưu",
            StudentStatus::Graduated => "Tốt nghiệp",
            StudentStatus::Withdrawn => "Thôi học",
        }
    }
}

/// Student record, keyed by student number (MSSV)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    // === Personal ===
    pub id: String,
    pub name: String,
    pub gender: Gender,
    /// Date of birth, `YYYY-MM-DD`
    pub dob: String,
    pub place_of_birth: String,
    /// Province or city
    pub address: String,
    pub identity_card: String,
    pub email: String,
    pub phone: String,
    pub status: StudentStatus,

    // === Class and major ===
    /// Class code, e.g. `1CTT22A1`
    pub class_id: String,
    pub class_name: String,
    /// Major code, e.g. `7480201`
    pub major_code: String,
    pub major_name: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

/// One turn of an assistant conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped now, with an id derived from the clock
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        let timestamp = Utc::now();
        Self {
            id: format!("{}-{}", timestamp.timestamp_millis(), role.as_str()),
            role,
            text: text.into(),
            timestamp,
        }
    }

    pub fn is_welcome(&self) -> bool {
        self.id == WELCOME_MESSAGE_ID
    }
}

/// Ticket workflow status; the serialized form is the label stored in the database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    #[serde(rename = "Chờ xử lý")]
    Pending,
    #[serde(rename = "Đang xử lý")]
    InProgress,
    #[serde(rename = "Hoàn thành")]
    Completed,
    #[serde(rename = "Từ chối")]
    Rejected,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Pending,
        TicketStatus::InProgress,
        TicketStatus::Completed,
        TicketStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "Chờ xử lý",
            TicketStatus::InProgress => "Đang xử lý",
            TicketStatus::Completed => "Hoàn thành",
            TicketStatus::Rejected => "Từ chối",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s.trim())
    }

    /// Whether staff may move a ticket from `self` to `next`.
    ///
    /// Pending tickets are accepted or rejected, tickets in progress are
    /// completed or cancelled, and closed tickets can only be reopened.
    pub fn can_transition_to(&self, next: TicketStatus) -> bool {
        use TicketStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Rejected)
                | (InProgress, Completed)
                | (InProgress, Rejected)
                | (Completed, InProgress)
                | (Rejected, InProgress)
        )
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VariableDataType {
    #[default]
    Text,
    Date,
    Number,
}

/// A fillable field of a procedure form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureVariable {
    /// Internal key, e.g. `course_code`; doubles as the template placeholder
    pub name: String,
    /// Display label, e.g. `Mã học phần`
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<VariableDataType>,
}

impl ProcedureVariable {
    pub fn is_date(&self) -> bool {
        self.data_type == Some(VariableDataType::Date)
    }
}

/// Filled-in form values keyed by variable name
pub type FormValues = BTreeMap<String, String>;

/// Student request handled by the faculty office
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub title: String,
    pub student_name: String,
    /// Absent for tickets filed by staff
    pub student_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: TicketStatus,
    /// `YYYY-MM-DD`
    pub date_created: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<ProcedureVariable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<FormValues>,
}

impl Ticket {
    /// Whether `user` may see this ticket
    pub fn is_visible_to(&self, user: &User) -> bool {
        user.is_admin() || self.student_id.as_deref() == Some(user.id.as_str())
    }
}

/// Ticket content proposed by a user or extracted by the assistant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<ProcedureVariable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_values: Option<FormValues>,
}

/// Administrative procedure; doubles as the assistant's knowledge base entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Procedure {
    pub id: String,
    pub title: String,
    /// Knowledge base content
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub required_forms: Vec<String>,
    #[serde(default)]
    pub variables: Vec<ProcedureVariable>,
    /// HTML template with `{{placeholder}}` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_template: Option<String>,
}

impl Procedure {
    /// The export template, if one is set and not blank
    pub fn template(&self) -> Option<&str> {
        self.export_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Severity shared by notifications and activity log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "info" => Some(Severity::Info),
            "success" => Some(Severity::Success),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Severity,
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, kind: Severity) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            message: message.into(),
            kind,
            is_read: false,
            timestamp: Utc::now(),
            ticket_id: None,
        }
    }
}

/// Entry of the administrator activity log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLog {
    pub id: String,
    pub action: String,
    pub user_name: String,
    pub details: String,
    #[serde(rename = "type")]
    pub kind: Severity,
    pub timestamp: String,
}
