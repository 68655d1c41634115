//! Student records and login accounts

use super::auth::{AdminUser, CurrentUser};
use super::error::ApiResult;
use super::state::AppState;
use crate::error::PortalError;
use crate::storage::ActivityEntry;
use crate::types::{Account, Severity, StudentProfile};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

// === Students ===

pub async fn list_students_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<StudentProfile>>> {
    Ok(Json(state.store.list_students().await?))
}

/// Staff may read any profile, students only their own
pub async fn get_student_handler(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StudentProfile>> {
    if !current.user.is_admin() && current.user.id != id {
        return Err(PortalError::Forbidden("students may only view their own profile".to_string()).into());
    }

    let student = state
        .store
        .get_student(&id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("student {}", id)))?;
    Ok(Json(student))
}

pub async fn create_student_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(student): Json<StudentProfile>,
) -> ApiResult<(StatusCode, Json<StudentProfile>)> {
    if student.id.trim().is_empty() {
        return Err(PortalError::InvalidOperation("student id is required".to_string()).into());
    }

    state.store.add_student(&student).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "THÊM SINH VIÊN",
                format!("Đã thêm sinh viên: {} ({})", student.name, student.id),
            )
            .by(&admin),
        )
        .await;

    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn update_student_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    Json(mut student): Json<StudentProfile>,
) -> ApiResult<Json<StudentProfile>> {
    // The record key comes from the path
    student.id = id;

    state.store.update_student(&student).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "CẬP NHẬT SINH VIÊN",
                format!("Đã cập nhật sinh viên: {} ({})", student.name, student.id),
            )
            .by(&admin),
        )
        .await;

    Ok(Json(student))
}

pub async fn delete_student_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_student(&id).await?;
    state
        .log_activity(
            ActivityEntry::new("XÓA SINH VIÊN", format!("Đã xóa sinh viên MSSV: {}", id))
                .by(&admin)
                .with_kind(Severity::Warning),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

// === Accounts ===

/// Accounts without their passwords
pub async fn list_accounts_handler(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> ApiResult<Json<Vec<Account>>> {
    let accounts = state
        .store
        .list_accounts()
        .await?
        .into_iter()
        .map(|account| Account {
            password: None,
            ..account
        })
        .collect();
    Ok(Json(accounts))
}

pub async fn create_account_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(account): Json<Account>,
) -> ApiResult<(StatusCode, Json<Account>)> {
    if account.username.trim().is_empty() {
        return Err(PortalError::InvalidOperation("username is required".to_string()).into());
    }
    if account.password.as_deref().map_or(true, str::is_empty) {
        return Err(PortalError::InvalidOperation("password is required".to_string()).into());
    }

    state.store.add_account(&account).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "THÊM TÀI KHOẢN",
                format!("Đã thêm tài khoản: {}", account.username),
            )
            .by(&admin),
        )
        .await;

    Ok((
        StatusCode::CREATED,
        Json(Account {
            password: None,
            ..account
        }),
    ))
}

pub async fn update_account_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
    Json(mut account): Json<Account>,
) -> ApiResult<Json<Account>> {
    account.username = username;

    state.store.update_account(&account).await?;
    state
        .log_activity(
            ActivityEntry::new(
                "CẬP NHẬT TÀI KHOẢN",
                format!("Đã cập nhật tài khoản: {}", account.username),
            )
            .by(&admin),
        )
        .await;

    Ok(Json(Account {
        password: None,
        ..account
    }))
}

pub async fn delete_account_handler(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.delete_account(&username).await?;
    state
        .log_activity(
            ActivityEntry::new("XÓA TÀI KHOẢN", format!("Đã xóa tài khoản: {}", username))
                .by(&admin)
                .with_kind(Severity::Warning),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}
