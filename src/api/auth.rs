//! Sign-in, sign-out and the request extractors for signed-in users

use super::error::{ApiError, ApiResult};
use super::state::AppState;
use crate::error::PortalError;
use crate::storage::ActivityEntry;
use crate::types::{Role, Severity, User};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Signed-in user of the current request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Signed-in administrator of the current request
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| PortalError::Unauthorized("missing bearer token".to_string()))?;

        let session = state
            .sessions
            .get(token)
            .await
            .ok_or_else(|| PortalError::Unauthorized("unknown or expired session".to_string()))?;

        Ok(CurrentUser {
            user: session.user,
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { user, .. } = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(PortalError::Forbidden("administrator role required".to_string()).into());
        }
        Ok(AdminUser(user))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Resolve credentials to a user: the built-in administrator first, then
/// the account table
async fn resolve_user(state: &AppState, username: &str, password: &str) -> Option<User> {
    let admin = &state.settings.builtin_admin;
    if admin.enabled && username == admin.username && password == admin.password {
        return Some(User {
            id: admin.username.clone(),
            name: admin.display_name.clone(),
            role: Role::Admin,
            email: admin.email.clone(),
        });
    }

    let account = state.store.authenticate(username, password).await.ok()??;
    Some(User {
        id: account.username.clone(),
        name: account.full_name,
        role: account.role,
        email: format!("{}@{}", account.username, state.settings.student_email_domain),
    })
}

pub async fn login_handler(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let username = req.username.trim();
    let user = resolve_user(&state, username, &req.password)
        .await
        .ok_or_else(|| PortalError::Unauthorized("invalid username or password".to_string()))?;

    let details = if user.is_admin() && user.id == state.settings.builtin_admin.username {
        "Admin đăng nhập vào hệ thống".to_string()
    } else {
        format!("Người dùng {} đã đăng nhập", user.name)
    };
    state
        .log_activity(
            ActivityEntry::new("ĐĂNG NHẬP", details)
                .by(&user)
                .with_kind(Severity::Success),
        )
        .await;

    info!("{} signed in as {}", user.id, user.role);
    let token = state.sessions.open(user.clone()).await;
    Ok(Json(LoginResponse { token, user }))
}

pub async fn logout_handler(
    State(state): State<AppState>,
    current: CurrentUser,
) -> StatusCode {
    state.sessions.close(&current.token).await;
    state
        .log_activity(
            ActivityEntry::new(
                "ĐĂNG XUẤT",
                format!("Người dùng {} đã đăng xuất", current.user.name),
            )
            .by(&current.user),
        )
        .await;
    StatusCode::NO_CONTENT
}

pub async fn me_handler(current: CurrentUser) -> Json<User> {
    Json(current.user)
}
