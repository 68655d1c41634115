//! Notifications, the activity log and dashboard statistics

use super::auth::{AdminUser, CurrentUser};
use super::error::ApiResult;
use super::state::AppState;
use super::tickets::STATUS_NOTICE;
use crate::dashboard::DashboardStats;
use crate::error::PortalError;
use crate::storage::SYSTEM_LOG_LIMIT;
use crate::types::{Notification, SystemLog, User};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;

/// Notifications addressed to `user`.
///
/// Staff see every notice. Students see only the status updates of tickets
/// they own.
async fn notifications_for(state: &AppState, user: &User) -> ApiResult<Vec<Notification>> {
    let notifications = state.store.list_notifications().await?;
    if user.is_admin() {
        return Ok(notifications);
    }

    let own: HashSet<String> = state
        .store
        .list_tickets()
        .await?
        .into_iter()
        .filter(|t| t.is_visible_to(user))
        .map(|t| t.id)
        .collect();

    Ok(notifications
        .into_iter()
        .filter(|n| n.title == STATUS_NOTICE)
        .filter(|n| n.ticket_id.as_ref().is_some_and(|id| own.contains(id)))
        .collect())
}

pub async fn list_notifications_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(notifications_for(&state, &current.user).await?))
}

pub async fn mark_read_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !current.user.is_admin()
        && !notifications_for(&state, &current.user)
            .await?
            .iter()
            .any(|n| n.id == id)
    {
        return Err(PortalError::NotFound(format!("notification {}", id)).into());
    }

    state.store.mark_notification_read(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Mark every notification of the caller read
pub async fn clear_notifications_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<StatusCode> {
    if current.user.is_admin() {
        state.store.clear_notifications().await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    for notification in notifications_for(&state, &current.user)
        .await?
        .iter()
        .filter(|n| !n.is_read)
    {
        state.store.mark_notification_read(&notification.id).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

pub async fn system_logs_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<LogsQuery>,
) -> ApiResult<Json<Vec<SystemLog>>> {
    let limit = query.limit.unwrap_or(SYSTEM_LOG_LIMIT).min(SYSTEM_LOG_LIMIT);
    Ok(Json(state.store.list_system_logs(limit).await?))
}

/// Ticket statistics; dates follow the UTC `date_created` stamps
pub async fn dashboard_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<DashboardStats>> {
    let tickets = state.store.list_tickets().await?;
    Ok(Json(DashboardStats::from_tickets(
        &tickets,
        Utc::now().date_naive(),
    )))
}
