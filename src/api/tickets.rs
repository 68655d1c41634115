//! Ticket endpoints

use super::auth::{AdminUser, CurrentUser};
use super::error::ApiResult;
use super::events::Event;
use super::state::AppState;
use crate::error::PortalError;
use crate::export::render_ticket_with;
use crate::storage::ActivityEntry;
use crate::types::{Notification, Severity, Ticket, TicketDraft, TicketStatus, User};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use chrono::{Local, Utc};
use serde::Deserialize;
use tracing::{error, info};

/// Title of the staff notice raised when a ticket is filed
pub(crate) const NEW_TICKET_NOTICE: &str = "Hồ sơ mới";

/// Title of the owner notice raised when a ticket changes status
pub(crate) const STATUS_NOTICE: &str = "Cập nhật hồ sơ";

/// Build a pending ticket for `user` from `draft`.
///
/// Staff-filed tickets carry no student id, since staff usernames are not
/// student records.
pub fn new_ticket(user: &User, draft: TicketDraft) -> Ticket {
    Ticket {
        id: Utc::now().timestamp_millis().to_string(),
        title: draft.title.trim().to_string(),
        student_name: user.name.clone(),
        student_id: (!user.is_admin()).then(|| user.id.clone()),
        kind: draft.kind,
        status: TicketStatus::Pending,
        date_created: Utc::now().format("%Y-%m-%d").to_string(),
        description: draft.description,
        rejection_reason: None,
        variables: draft.variables,
        form_values: draft.form_values,
    }
}

/// File a ticket for `user`, recording the outcome in the activity log
pub(crate) async fn file_ticket(state: &AppState, user: &User, draft: TicketDraft) -> ApiResult<Ticket> {
    if draft.title.trim().is_empty() {
        return Err(PortalError::InvalidOperation("ticket title is required".to_string()).into());
    }

    let ticket = new_ticket(user, draft);

    if let Err(e) = state.store.add_ticket(&ticket).await {
        error!("Failed to create ticket {}: {}", ticket.title, e);
        state
            .log_activity(
                ActivityEntry::new("LỖI TẠO HỒ SƠ", format!("Lỗi khi tạo hồ sơ: {}", ticket.title))
                    .by(user)
                    .with_kind(Severity::Error),
            )
            .await;
        return Err(e.into());
    }

    state
        .log_activity(
            ActivityEntry::new("TẠO HỒ SƠ", format!("Đã tạo hồ sơ mới: {}", ticket.title))
                .by(user)
                .with_kind(Severity::Success),
        )
        .await;

    let mut notification = Notification::new(
        NEW_TICKET_NOTICE,
        format!("{} đã gửi hồ sơ: {}", ticket.student_name, ticket.title),
        Severity::Info,
    );
    notification.ticket_id = Some(ticket.id.clone());
    notify(state, &notification).await;

    info!("Ticket {} created by {}", ticket.id, user.id);
    state.events.publish(Event::ticket_created(
        ticket.id.clone(),
        ticket.title.clone(),
        ticket.student_id.clone(),
    ));

    Ok(ticket)
}

pub(crate) async fn notify(state: &AppState, notification: &Notification) {
    if let Err(e) = state.store.add_notification(notification).await {
        error!("Error adding notification: {}", e);
        return;
    }
    state.events.publish(Event::notification_created(
        notification.id.clone(),
        notification.title.clone(),
        notification.kind,
    ));
}

async fn visible_ticket(state: &AppState, user: &User, id: &str) -> ApiResult<Ticket> {
    state
        .store
        .get_ticket(id)
        .await?
        .filter(|t| t.is_visible_to(user))
        .ok_or_else(|| PortalError::NotFound(format!("ticket {}", id)).into())
}

/// Admins see every ticket, students only their own
pub async fn list_tickets_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<Ticket>>> {
    let tickets = state
        .store
        .list_tickets()
        .await?
        .into_iter()
        .filter(|t| t.is_visible_to(&current.user))
        .collect();
    Ok(Json(tickets))
}

pub async fn get_ticket_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Ticket>> {
    Ok(Json(visible_ticket(&state, &current.user, &id).await?))
}

pub async fn create_ticket_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(draft): Json<TicketDraft>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let ticket = file_ticket(&state, &current.user, draft).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: TicketStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

fn status_notification(ticket: &Ticket, status: TicketStatus, reason: Option<&str>) -> Notification {
    let kind = match status {
        TicketStatus::Completed => Severity::Success,
        TicketStatus::Rejected => Severity::Warning,
        _ => Severity::Info,
    };
    let mut message = format!(
        "Hồ sơ \"{}\" đã chuyển sang trạng thái: {}",
        ticket.title, status
    );
    if let Some(reason) = reason {
        message.push_str(&format!(" (Lý do: {})", reason));
    }

    let mut notification = Notification::new(STATUS_NOTICE, message, kind);
    notification.ticket_id = Some(ticket.id.clone());
    notification
}

pub async fn update_status_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state
        .store
        .get_ticket(&id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("ticket {}", id)))?;

    if !ticket.status.can_transition_to(req.status) {
        return Err(PortalError::InvalidOperation(format!(
            "cannot move ticket from '{}' to '{}'",
            ticket.status, req.status
        ))
        .into());
    }

    let reason = req
        .rejection_reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if req.status == TicketStatus::Rejected && reason.is_none() {
        return Err(PortalError::InvalidOperation("Vui lòng nhập lý do từ chối.".to_string()).into());
    }

    state
        .store
        .update_ticket_status(&id, req.status, reason)
        .await?;

    let mut details = format!("Hồ sơ #{} chuyển sang trạng thái: {}", id, req.status);
    if let Some(reason) = reason {
        details.push_str(&format!(" (Lý do: {})", reason));
    }
    let kind = if req.status == TicketStatus::Rejected {
        Severity::Warning
    } else {
        Severity::Info
    };
    state
        .log_activity(
            ActivityEntry::new("CẬP NHẬT TRẠNG THÁI", details)
                .by(&admin)
                .with_kind(kind),
        )
        .await;

    notify(&state, &status_notification(&ticket, req.status, reason)).await;
    state
        .events
        .publish(Event::ticket_status_changed(id.clone(), req.status));

    let updated = state
        .store
        .get_ticket(&id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("ticket {}", id)))?;
    Ok(Json(updated))
}

/// Printable HTML document for a ticket
pub async fn export_ticket_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Html<String>> {
    let ticket = visible_ticket(&state, &current.user, &id).await?;
    let procedures = state.store.list_procedures().await?;
    let html = render_ticket_with(&ticket, &procedures, Local::now().date_naive(), &state.style);
    Ok(Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn user(role: Role) -> User {
        User {
            id: "22004001".to_string(),
            name: "Nguyễn Văn A".to_string(),
            role,
            email: String::new(),
        }
    }

    fn draft() -> TicketDraft {
        TicketDraft {
            title: "  Xin bảng điểm ".to_string(),
            kind: "Đào tạo".to_string(),
            description: "HK1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_ticket_for_student() {
        let ticket = new_ticket(&user(Role::Student), draft());
        assert_eq!(ticket.title, "Xin bảng điểm");
        assert_eq!(ticket.student_id.as_deref(), Some("22004001"));
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.date_created.len(), 10);
        assert!(ticket.id.parse::<i64>().is_ok());
    }

    #[test]
    fn test_new_ticket_for_admin_has_no_student_id() {
        let ticket = new_ticket(&user(Role::Admin), draft());
        assert_eq!(ticket.student_id, None);
        assert_eq!(ticket.student_name, "Nguyễn Văn A");
    }

    #[test]
    fn test_status_notification_text() {
        let ticket = new_ticket(&user(Role::Student), draft());
        let n = status_notification(&ticket, TicketStatus::Rejected, Some("Thiếu ảnh"));
        assert_eq!(n.kind, Severity::Warning);
        assert_eq!(
            n.message,
            "Hồ sơ \"Xin bảng điểm\" đã chuyển sang trạng thái: Từ chối (Lý do: Thiếu ảnh)"
        );
        assert_eq!(n.ticket_id.as_deref(), Some(ticket.id.as_str()));
    }
}
