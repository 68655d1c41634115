//! Mapping of portal errors to HTTP responses

use crate::error::PortalError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

/// Error returned by request handlers
#[derive(Debug)]
pub struct ApiError(pub PortalError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl<E: Into<PortalError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            PortalError::NotFound(_) => StatusCode::NOT_FOUND,
            PortalError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PortalError::Forbidden(_) => StatusCode::FORBIDDEN,
            PortalError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            PortalError::AlreadyExists(_) => StatusCode::CONFLICT,
            PortalError::Store { .. } | PortalError::LlmApi(_) | PortalError::Http(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            warn!("Request rejected: {}", self.0);
        }

        // LLM failures already carry a user-facing message
        let message = match &self.0 {
            PortalError::LlmApi(message) => message.clone(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
