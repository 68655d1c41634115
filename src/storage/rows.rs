//! Row shapes of the hosted store tables
//!
//! Column names are snake_case; application records use camelCase on the
//! wire. Every table gets a row type plus conversions in both directions, so
//! the mapping is written once and shared by all backends.

use crate::types::{
    Account, ChatMessage, ChatRole, FormValues, Gender, Notification, Procedure,
    ProcedureVariable, Role, Severity, StudentProfile, StudentStatus, SystemLog, Ticket,
    TicketStatus,
};
use crate::storage::{ActivityEntry, SYSTEM_USER_NAME};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

pub const ACCOUNTS: &str = "accounts";
pub const STUDENTS: &str = "students";
pub const PROCEDURES: &str = "procedures";
pub const TICKETS: &str = "tickets";
pub const NOTIFICATIONS: &str = "notifications";
pub const CHAT_LOGS: &str = "chat_logs";
pub const SYSTEM_LOGS: &str = "system_logs";

/// Render a generated key column (bigint or uuid) as a string
fn key_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Read a nullable column, mapping SQL `NULL` to the type's default
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode rows one at a time; rows that do not fit are logged and skipped
pub fn decode_rows<T: DeserializeOwned>(table: &str, values: Vec<Value>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<T>(value) {
            Ok(row) => Some(row),
            Err(e) => {
                warn!("Skipping unreadable {} row: {}", table, e);
                None
            }
        })
        .collect()
}

// === accounts ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub role: String,
    #[serde(default, deserialize_with = "nullable")]
    pub full_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
}

impl From<&Account> for AccountRow {
    fn from(account: &Account) -> Self {
        Self {
            username: account.username.clone(),
            password: account.password.clone(),
            role: account.role.as_str().to_string(),
            full_name: account.full_name.clone(),
            student_id: account.student_id.clone(),
        }
    }
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        let role = Role::parse(&row.role).unwrap_or_else(|| {
            warn!("Unknown role '{}' for account {}, treating as student", row.role, row.username);
            Role::Student
        });
        Self {
            username: row.username,
            password: row.password,
            role,
            full_name: row.full_name,
            student_id: row.student_id,
        }
    }
}

/// Columns written when an account is edited
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccountUpdate {
    pub role: String,
    pub full_name: String,
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl From<&Account> for AccountUpdate {
    fn from(account: &Account) -> Self {
        Self {
            role: account.role.as_str().to_string(),
            full_name: account.full_name.clone(),
            student_id: account.student_id.clone(),
            password: account.password.clone().filter(|p| !p.is_empty()),
        }
    }
}

// === students ===

/// Every student column except the key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentColumns {
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default, deserialize_with = "nullable")]
    pub dob: String,
    #[serde(default, deserialize_with = "nullable")]
    pub place_of_birth: String,
    #[serde(default, deserialize_with = "nullable")]
    pub address: String,
    #[serde(default, deserialize_with = "nullable")]
    pub identity_card: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub phone: String,
    #[serde(default)]
    pub status: Option<StudentStatus>,
    #[serde(default, deserialize_with = "nullable")]
    pub class_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub class_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub major_code: String,
    #[serde(default, deserialize_with = "nullable")]
    pub major_name: String,
    #[serde(default)]
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRow {
    pub id: String,
    #[serde(flatten)]
    pub columns: StudentColumns,
}

impl From<&StudentProfile> for StudentColumns {
    fn from(s: &StudentProfile) -> Self {
        Self {
            name: s.name.clone(),
            gender: Some(s.gender),
            dob: s.dob.clone(),
            place_of_birth: s.place_of_birth.clone(),
            address: s.address.clone(),
            identity_card: s.identity_card.clone(),
            email: s.email.clone(),
            phone: s.phone.clone(),
            status: Some(s.status),
            class_id: s.class_id.clone(),
            class_name: s.class_name.clone(),
            major_code: s.major_code.clone(),
            major_name: s.major_name.clone(),
            specialization: s.specialization.clone(),
        }
    }
}

impl From<&StudentProfile> for StudentRow {
    fn from(s: &StudentProfile) -> Self {
        Self {
            id: s.id.clone(),
            columns: s.into(),
        }
    }
}

impl From<StudentRow> for StudentProfile {
    fn from(row: StudentRow) -> Self {
        let c = row.columns;
        Self {
            id: row.id,
            name: c.name,
            gender: c.gender.unwrap_or(Gender::Other),
            dob: c.dob,
            place_of_birth: c.place_of_birth,
            address: c.address,
            identity_card: c.identity_card,
            email: c.email,
            phone: c.phone,
            status: c.status.unwrap_or(StudentStatus::Studying),
            class_id: c.class_id,
            class_name: c.class_name,
            major_code: c.major_code,
            major_name: c.major_name,
            specialization: c.specialization,
        }
    }
}

// === procedures ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureColumns {
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub content: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    #[serde(default)]
    pub required_forms: Option<Vec<String>>,
    #[serde(default)]
    pub variables: Option<Vec<ProcedureVariable>>,
    #[serde(default)]
    pub export_template: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcedureRow {
    pub id: String,
    #[serde(flatten)]
    pub columns: ProcedureColumns,
}

impl From<&Procedure> for ProcedureColumns {
    fn from(p: &Procedure) -> Self {
        Self {
            title: p.title.clone(),
            content: p.content.clone(),
            category: p.category.clone(),
            required_forms: Some(p.required_forms.clone()),
            variables: Some(p.variables.clone()),
            export_template: p.export_template.clone(),
        }
    }
}

impl From<&Procedure> for ProcedureRow {
    fn from(p: &Procedure) -> Self {
        Self {
            id: p.id.clone(),
            columns: p.into(),
        }
    }
}

impl From<ProcedureRow> for Procedure {
    fn from(row: ProcedureRow) -> Self {
        let c = row.columns;
        Self {
            id: row.id,
            title: c.title,
            content: c.content,
            category: c.category,
            required_forms: c.required_forms.unwrap_or_default(),
            variables: c.variables.unwrap_or_default(),
            export_template: c.export_template.filter(|t| !t.is_empty()),
        }
    }
}

// === tickets ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRow {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub student_name: String,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    pub status: TicketStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub date_created: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub variables: Option<Vec<ProcedureVariable>>,
    #[serde(default)]
    pub form_values: Option<FormValues>,
}

impl From<&Ticket> for TicketRow {
    fn from(t: &Ticket) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            student_name: t.student_name.clone(),
            student_id: t.student_id.clone(),
            kind: t.kind.clone(),
            status: t.status,
            date_created: t.date_created.clone(),
            description: t.description.clone(),
            // Rejection reasons are only set through status updates
            rejection_reason: None,
            variables: t.variables.clone(),
            form_values: t.form_values.clone(),
        }
    }
}

impl From<TicketRow> for Ticket {
    fn from(row: TicketRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            student_name: row.student_name,
            student_id: row.student_id,
            kind: row.kind,
            status: row.status,
            date_created: row.date_created,
            description: row.description,
            rejection_reason: row.rejection_reason,
            variables: row.variables,
            form_values: row.form_values,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketStatusUpdate {
    pub status: TicketStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

// === notifications ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(rename = "type", default, deserialize_with = "nullable")]
    pub kind: String,
    #[serde(default, deserialize_with = "nullable")]
    pub is_read: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ticket_id: Option<String>,
}

impl From<&Notification> for NotificationRow {
    fn from(n: &Notification) -> Self {
        Self {
            id: n.id.clone(),
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind.as_str().to_string(),
            is_read: n.is_read,
            timestamp: n.timestamp,
            ticket_id: n.ticket_id.clone(),
        }
    }
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            message: row.message,
            kind: Severity::parse(&row.kind).unwrap_or_default(),
            is_read: row.is_read,
            timestamp: row.timestamp,
            ticket_id: row.ticket_id,
        }
    }
}

// === chat_logs ===

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatLogRow {
    #[serde(default)]
    pub id: Value,
    pub role: ChatRole,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatLogRow> for ChatMessage {
    fn from(row: ChatLogRow) -> Self {
        Self {
            id: key_to_string(&row.id),
            role: row.role,
            text: row.message,
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatLogRow {
    pub user_id: String,
    pub role: ChatRole,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl NewChatLogRow {
    pub fn new(user_id: &str, message: &ChatMessage) -> Self {
        Self {
            user_id: user_id.to_string(),
            role: message.role,
            message: message.text.clone(),
            timestamp: message.timestamp,
        }
    }
}

// === system_logs ===

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemLogRow {
    #[serde(default)]
    pub id: Value,
    pub action: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub details: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub timestamp: String,
}

impl From<SystemLogRow> for SystemLog {
    fn from(row: SystemLogRow) -> Self {
        Self {
            id: key_to_string(&row.id),
            action: row.action,
            user_name: row
                .user_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| SYSTEM_USER_NAME.to_string()),
            details: row.details,
            kind: row
                .kind
                .as_deref()
                .and_then(Severity::parse)
                .unwrap_or_default(),
            timestamp: row.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSystemLogRow {
    pub action: String,
    pub user_id: Option<String>,
    pub user_name: String,
    pub details: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl From<&ActivityEntry> for NewSystemLogRow {
    fn from(entry: &ActivityEntry) -> Self {
        Self {
            action: entry.action.clone(),
            user_id: entry.user_id.clone(),
            user_name: entry.user_name.clone(),
            details: entry.details.clone(),
            kind: entry.kind.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_student() -> StudentProfile {
        StudentProfile {
            id: "22004001".to_string(),
            name: "Nguyễn Văn An".to_string(),
            gender: Gender::Male,
            dob: "2004-03-15".to_string(),
            place_of_birth: "Vĩnh Long".to_string(),
            address: "Vĩnh Long".to_string(),
            identity_card: "086204000111".to_string(),
            email: "an@st.vlute.edu.vn".to_string(),
            phone: "0901234567".to_string(),
            status: StudentStatus::Studying,
            class_id: "1CTT22A1".to_string(),
            class_name: "ĐH Công nghệ thông tin 2022".to_string(),
            major_code: "7480201".to_string(),
            major_name: "Công nghệ thông tin".to_string(),
            specialization: None,
        }
    }

    #[test]
    fn test_student_row_uses_snake_case_columns() {
        let row = StudentRow::from(&sample_student());
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(value["place_of_birth"], "Vĩnh Long");
        assert_eq!(value["identity_card"], "086204000111");
        assert_eq!(value["class_id"], "1CTT22A1");
        assert_eq!(value["gender"], "Nam");
        assert_eq!(value["status"], "Đang học");
        assert!(value.get("placeOfBirth").is_none());

        let back: StudentProfile = serde_json::from_value::<StudentRow>(value).unwrap().into();
        assert_eq!(back, sample_student());
    }

    #[test]
    fn test_student_update_columns_exclude_id() {
        let columns = StudentColumns::from(&sample_student());
        let value = serde_json::to_value(&columns).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["major_name"], "Công nghệ thông tin");
    }

    #[test]
    fn test_account_update_omits_empty_password() {
        let mut account = Account {
            username: "22004001".to_string(),
            password: Some(String::new()),
            role: Role::Student,
            full_name: "An".to_string(),
            student_id: Some("22004001".to_string()),
        };
        let value = serde_json::to_value(AccountUpdate::from(&account)).unwrap();
        assert!(value.get("password").is_none());
        assert_eq!(value["full_name"], "An");
        assert_eq!(value["role"], "STUDENT");

        account.password = Some("secret".to_string());
        let value = serde_json::to_value(AccountUpdate::from(&account)).unwrap();
        assert_eq!(value["password"], "secret");
    }

    #[test]
    fn test_procedure_row_null_columns_become_empty() {
        let row: ProcedureRow = serde_json::from_value(json!({
            "id": "p1",
            "title": "Phúc khảo điểm thi",
            "content": "Nộp đơn trong 7 ngày",
            "category": "Đào tạo",
            "required_forms": null,
            "variables": null,
            "export_template": ""
        }))
        .unwrap();
        let procedure = Procedure::from(row);
        assert!(procedure.required_forms.is_empty());
        assert!(procedure.variables.is_empty());
        assert_eq!(procedure.export_template, None);
    }

    #[test]
    fn test_ticket_row_mapping() {
        let row: TicketRow = serde_json::from_value(json!({
            "id": "1714550000000",
            "title": "Phúc khảo điểm thi",
            "student_name": "An",
            "student_id": null,
            "type": "Đào tạo",
            "status": "Từ chối",
            "date_created": "2024-05-01",
            "description": "d",
            "rejection_reason": "Quá hạn",
            "variables": [{"name": "course_code", "label": "Mã học phần", "required": true, "dataType": "text"}],
            "form_values": {"course_code": "CT101"}
        }))
        .unwrap();
        let ticket = Ticket::from(row);
        assert_eq!(ticket.status, TicketStatus::Rejected);
        assert_eq!(ticket.student_id, None);
        assert_eq!(ticket.rejection_reason.as_deref(), Some("Quá hạn"));
        assert_eq!(ticket.form_values.unwrap()["course_code"], "CT101");

        let insert = serde_json::to_value(TicketRow::from(&Ticket {
            rejection_reason: Some("ignored".to_string()),
            ..Ticket::from(serde_json::from_value::<TicketRow>(json!({
                "id": "2", "title": "t", "student_name": "n", "type": "x",
                "status": "Chờ xử lý", "date_created": "2024-05-02"
            }))
            .unwrap())
        }))
        .unwrap();
        assert!(insert.get("rejection_reason").is_none());
        assert_eq!(insert["date_created"], "2024-05-02");
    }

    #[test]
    fn test_ticket_rows_with_null_text_columns() {
        let values = vec![
            json!({
                "id": "1", "title": "Xin bảng điểm", "student_name": "An", "student_id": "22004001",
                "type": "Đào tạo", "status": "Chờ xử lý", "date_created": "2024-05-01",
                "description": "HK1"
            }),
            json!({
                "id": "2", "title": "Phúc khảo", "student_name": null, "student_id": null,
                "type": null, "status": "Hoàn thành", "date_created": "2024-05-02",
                "description": null, "variables": null, "form_values": null
            }),
        ];

        let tickets: Vec<Ticket> = decode_rows::<TicketRow>(TICKETS, values)
            .into_iter()
            .map(Ticket::from)
            .collect();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[1].description, "");
        assert_eq!(tickets[1].student_name, "");
        assert_eq!(tickets[1].kind, "");
        assert_eq!(tickets[1].status, TicketStatus::Completed);
    }

    #[test]
    fn test_student_row_with_null_columns() {
        let row: StudentRow = serde_json::from_value(json!({
            "id": "22004002",
            "name": "Trần Thị B",
            "gender": null,
            "dob": null,
            "place_of_birth": null,
            "address": null,
            "identity_card": null,
            "email": "b@st.vlute.edu.vn",
            "phone": null,
            "status": null,
            "class_id": "1CTT22A1",
            "class_name": null,
            "major_code": null,
            "major_name": null,
            "specialization": null
        }))
        .unwrap();
        let student = StudentProfile::from(row);
        assert_eq!(student.phone, "");
        assert_eq!(student.gender, Gender::Other);
        assert_eq!(student.status, StudentStatus::Studying);
        assert_eq!(student.class_id, "1CTT22A1");
    }

    #[test]
    fn test_decode_rows_skips_only_broken_rows() {
        let values = vec![
            json!({"id": 1, "action": "ĐĂNG NHẬP", "details": null, "timestamp": null}),
            json!({"id": 2, "details": "thiếu action"}),
            json!({"id": 3, "action": "ĐĂNG XUẤT", "details": "x", "timestamp": "2024-05-01T08:00:00Z"}),
        ];
        let logs: Vec<SystemLogRow> = decode_rows(SYSTEM_LOGS, values);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].details, "");
        assert_eq!(logs[1].action, "ĐĂNG XUẤT");
    }

    #[test]
    fn test_status_update_reason_optional() {
        let update = TicketStatusUpdate {
            status: TicketStatus::InProgress,
            rejection_reason: None,
        };
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"status": "Đang xử lý"}));
    }

    #[test]
    fn test_system_log_row_defaults() {
        let row: SystemLogRow = serde_json::from_value(json!({
            "id": 17,
            "action": "ĐĂNG NHẬP",
            "user_name": null,
            "details": "x",
            "type": null,
            "timestamp": "2024-05-01T08:00:00+00:00"
        }))
        .unwrap();
        let log = SystemLog::from(row);
        assert_eq!(log.id, "17");
        assert_eq!(log.user_name, SYSTEM_USER_NAME);
        assert_eq!(log.kind, Severity::Info);
    }

    #[test]
    fn test_chat_log_row_mapping() {
        let row: ChatLogRow = serde_json::from_value(json!({
            "id": "b7c1",
            "user_id": "22004001",
            "role": "model",
            "message": "Xin chào",
            "timestamp": "2024-05-01T08:00:00Z"
        }))
        .unwrap();
        let message = ChatMessage::from(row);
        assert_eq!(message.id, "b7c1");
        assert_eq!(message.role, ChatRole::Model);
        assert_eq!(message.text, "Xin chào");
    }
}
